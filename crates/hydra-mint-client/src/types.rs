/// Result of submitting one transaction to the Head
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The Head reported `TxValid`
    Accepted { tx_id: Option<String> },
    /// The Head reported `TxInvalid`, or refused the `NewTx` command
    Rejected { reason: String },
    /// Fire-and-forget: the command left the client, no verdict awaited
    Sent,
    /// No verdict before the confirmation deadline
    TimedOut,
}

impl SubmitOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmitOutcome::Accepted { .. })
    }
}

/// Verdicts collected by a drain after fire-and-forget submissions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainTally {
    pub valid: usize,
    pub invalid: usize,
}

impl DrainTally {
    pub fn total(&self) -> usize {
        self.valid + self.invalid
    }
}

use async_trait::async_trait;
use hydra_mint_batch_tx::{BuildRequest, BuilderError, BuilderResult, TxBuilder};
use hydra_mint_sdk::TxEnvelope;
use std::sync::Mutex;

/// One call made against the builder
#[derive(Debug, Clone, PartialEq)]
pub enum BuilderCall {
    Build(BuildRequest),
    Sign(String),
    Identify(String),
    Submit(String),
}

/// Deterministic builder that records every call
///
/// The n-th built transaction (1-based) gets the 64-hex id `{n:064x}`, which
/// doubles as its CBOR payload so a scripted node can echo it back.
#[derive(Default)]
pub struct RecordingBuilder {
    calls: Mutex<Vec<BuilderCall>>,
    fail_build_at: Option<usize>,
    fail_sign_at: Option<usize>,
}

impl RecordingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the n-th build call (1-based) fail
    pub fn failing_build_at(mut self, nth: usize) -> Self {
        self.fail_build_at = Some(nth);
        self
    }

    /// Make the n-th sign call (1-based) fail
    pub fn failing_sign_at(mut self, nth: usize) -> Self {
        self.fail_sign_at = Some(nth);
        self
    }

    pub fn calls(&self) -> Vec<BuilderCall> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    pub fn build_requests(&self) -> Vec<BuildRequest> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                BuilderCall::Build(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    pub fn submitted(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                BuilderCall::Submit(cbor) => Some(cbor),
                _ => None,
            })
            .collect()
    }

    /// Record `call` and return how many calls of the same kind were made so far
    fn record(&self, call: BuilderCall) -> usize {
        let Ok(mut calls) = self.calls.lock() else {
            return 0;
        };
        let kind = std::mem::discriminant(&call);
        calls.push(call);
        calls
            .iter()
            .filter(|c| std::mem::discriminant(*c) == kind)
            .count()
    }
}

pub fn tx_id_for(nth: usize) -> String {
    format!("{nth:064x}")
}

#[async_trait]
impl TxBuilder for RecordingBuilder {
    async fn build(&self, request: &BuildRequest) -> BuilderResult<TxEnvelope> {
        let nth = self.record(BuilderCall::Build(request.clone()));
        if self.fail_build_at == Some(nth) {
            return Err(BuilderError::ToolFailed {
                command: "transaction build-raw".to_string(),
                status: "exit status: 1".to_string(),
                stderr: "scripted build failure".to_string(),
            });
        }
        Ok(TxEnvelope {
            kind: "Unwitnessed Tx ConwayEra".to_string(),
            description: "Ledger Cddl Format".to_string(),
            cbor_hex: tx_id_for(nth),
        })
    }

    async fn sign(&self, raw: &TxEnvelope) -> BuilderResult<TxEnvelope> {
        let nth = self.record(BuilderCall::Sign(raw.cbor_hex.clone()));
        if self.fail_sign_at == Some(nth) {
            return Err(BuilderError::ToolFailed {
                command: "transaction sign".to_string(),
                status: "exit status: 1".to_string(),
                stderr: "scripted sign failure".to_string(),
            });
        }
        Ok(TxEnvelope {
            kind: "Witnessed Tx ConwayEra".to_string(),
            description: "Ledger Cddl Format".to_string(),
            cbor_hex: raw.cbor_hex.clone(),
        })
    }

    async fn identify(&self, signed: &TxEnvelope) -> BuilderResult<String> {
        self.record(BuilderCall::Identify(signed.cbor_hex.clone()));
        Ok(signed.cbor_hex.clone())
    }

    async fn submit_to_base_ledger(&self, signed: &TxEnvelope) -> BuilderResult<()> {
        self.record(BuilderCall::Submit(signed.cbor_hex.clone()));
        Ok(())
    }
}

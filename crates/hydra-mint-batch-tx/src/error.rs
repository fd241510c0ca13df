use hydra_mint_client::ClientError;
use hydra_mint_sdk::AllocationError;
use thiserror::Error;

pub type BuilderResult<T> = Result<T, BuilderError>;
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Failures of the external transaction tool
#[derive(Error, Debug)]
pub enum BuilderError {
    #[error("Failed to launch {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}: {stderr}")]
    ToolFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed transaction envelope: {0}")]
    Envelope(#[from] serde_json::Error),

    #[error("No transaction id in tool output: {0:?}")]
    NoTxId(String),

    #[error("Builder configuration error: {0}")]
    Config(String),
}

/// Reasons a mint run stops before its last batch
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Head holds no asset-free coin to use as fuel")]
    NoFunds,

    #[error("Checkpoint does not match the requested run: {0}")]
    RunMismatch(String),

    #[error("Fuel exhausted at batch {batch}: {available} lovelace available, {required} needed")]
    FuelExhausted {
        batch: u64,
        available: u64,
        required: u64,
    },

    #[error("Batch {batch}: build failed: {source}")]
    Build { batch: u64, source: BuilderError },

    #[error("Batch {batch}: signing failed: {source}")]
    Sign { batch: u64, source: BuilderError },

    #[error("Batch {batch}: transaction id unavailable: {source}")]
    Identity { batch: u64, source: BuilderError },

    #[error("Batch {batch} not accepted, chain broken: {reason}")]
    ChainBroken { batch: u64, reason: String },

    #[error("Batch {batch}: Head client error: {source}")]
    Client { batch: u64, source: ClientError },

    #[error("Failed to read the Head coin set: {0}")]
    Snapshot(#[source] ClientError),

    #[error("Output allocation failed: {0}")]
    Allocation(#[from] AllocationError),

    #[error("Invalid mint configuration: {0}")]
    Config(String),
}

impl PipelineError {
    /// Batch at which the run stopped, when the stop is batch-scoped
    pub fn batch(&self) -> Option<u64> {
        match self {
            PipelineError::FuelExhausted { batch, .. }
            | PipelineError::Build { batch, .. }
            | PipelineError::Sign { batch, .. }
            | PipelineError::Identity { batch, .. }
            | PipelineError::ChainBroken { batch, .. }
            | PipelineError::Client { batch, .. } => Some(*batch),
            _ => None,
        }
    }
}

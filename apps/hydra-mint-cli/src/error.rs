use hydra_mint_batch_tx::{BuilderError, CommitError, PipelineError};
use hydra_mint_client::ClientError;
use thiserror::Error;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Head client error: {0}")]
    Client(#[from] ClientError),

    #[error("Transaction builder error: {0}")]
    Builder(#[from] BuilderError),

    #[error("Funding failed: {0}")]
    Commit(#[from] CommitError),

    #[error("Mint run stopped: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Command execution failed: {0}")]
    CommandExecution(String),
}

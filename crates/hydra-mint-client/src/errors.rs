use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Not connected to the Hydra API")]
    NotConnected,

    #[error("Transport closed by the remote end")]
    TransportClosed,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Timed out waiting for {expected}")]
    LifecycleTimeout { expected: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Indexer error: {0}")]
    Indexer(String),
}

impl ClientError {
    /// Whether the caller may retry the operation that produced this error
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Connection(_))
    }
}

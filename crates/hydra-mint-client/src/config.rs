use crate::errors::{ClientError, ClientResult};
use std::time::Duration;
use url::Url;

pub const DEFAULT_API_URL: &str = "ws://localhost:4001";

/// Connection and timing settings for a Head session
#[derive(Debug, Clone, PartialEq)]
pub struct HeadClientConfig {
    /// WebSocket URL of the Head API
    pub api_url: String,
    /// Upper bound for a single read inside a wait loop
    pub read_timeout: Duration,
    /// Deadline for lifecycle events (Init, Close, Fanout, Abort)
    pub event_timeout: Duration,
    /// Deadline for `TxValid`/`TxInvalid` after a submission
    pub confirm_timeout: Duration,
}

impl Default for HeadClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            read_timeout: Duration::from_secs(5),
            event_timeout: Duration::from_secs(30),
            confirm_timeout: Duration::from_secs(10),
        }
    }
}

impl HeadClientConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            ..Default::default()
        }
    }

    /// HTTP base URL of the side channel, derived from the WebSocket URL
    pub fn http_url(&self) -> ClientResult<Url> {
        derive_http_url(&self.api_url)
    }
}

/// `ws://` becomes `http://`, `wss://` becomes `https://`; path and query are dropped
pub fn derive_http_url(api_url: &str) -> ClientResult<Url> {
    let mut url =
        Url::parse(api_url).map_err(|e| ClientError::InvalidUrl(format!("{api_url}: {e}")))?;

    let scheme = match url.scheme() {
        "ws" => "http",
        "wss" => "https",
        "http" | "https" => url.scheme(),
        other => {
            return Err(ClientError::InvalidUrl(format!(
                "{api_url}: unsupported scheme {other}"
            )))
        }
    }
    .to_string();

    url.set_scheme(&scheme)
        .map_err(|_| ClientError::InvalidUrl(format!("{api_url}: cannot use scheme {scheme}")))?;
    url.set_path("");
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

pub mod fund;
pub mod lifecycle;
pub mod mint;
pub mod status;

use crate::error::CliResult;
use backoff::{future::retry, ExponentialBackoff};
use hydra_mint_client::{HeadClient, HeadClientConfig};
use std::time::Duration;
use tracing::warn;

/// Connect to the Head, retrying refused connections with exponential backoff
pub async fn connect_with_retry(config: &HeadClientConfig) -> CliResult<HeadClient> {
    let backoff = ExponentialBackoff {
        initial_interval: Duration::from_millis(500),
        max_interval: Duration::from_secs(10),
        max_elapsed_time: Some(Duration::from_secs(60)),
        multiplier: 2.0,
        ..Default::default()
    };

    let client = retry(backoff, || {
        let config = config.clone();

        async move {
            let mut client = HeadClient::new(config).map_err(backoff::Error::Permanent)?;
            match client.connect().await {
                Ok(()) => Ok(client),
                Err(e) if e.is_retryable() => {
                    warn!("Connect to {} failed, retrying: {}", client.config().api_url, e);
                    Err(backoff::Error::Transient {
                        err: e,
                        retry_after: None,
                    })
                }
                Err(e) => Err(backoff::Error::Permanent(e)),
            }
        }
    })
    .await?;

    Ok(client)
}

/*!
# Head Session Client

One participant's view of a Head: a persistent command/event channel plus the
HTTP side channel of the same node.

Every wait is deadline-bounded. Inside a wait each read is additionally
capped by `read_timeout`, so high-frequency unrelated events (snapshot
confirmations, peer chatter) are discarded without ever blocking past the
overall deadline.

## Failure semantics

- Connection and transport failures are returned as [`ClientError`] and are
  fatal for the session. Nothing here retries.
- A wait that runs out of time is `Ok(None)`, not an error.
- `CommandFailed` is surfaced as `Ok(false)` from lifecycle operations and as
  [`SubmitOutcome::Rejected`] from submissions.
- Lifecycle operations escalate a missing confirmation to
  [`ClientError::LifecycleTimeout`], leaving the Head in its last observed
  state for the caller to re-check.
*/

use crate::{
    config::HeadClientConfig,
    errors::{ClientError, ClientResult},
    protocol::{ClientInput, HeadEvent, HeadStatus},
    query::{normalize_snapshot, HttpQueryApi, QueryApi},
    transport::{Connector, Transport, WsConnector},
    types::{DrainTally, SubmitOutcome},
};
use hydra_mint_sdk::{Coin, TxEnvelope, UtxoSet};
use std::{sync::Arc, time::Duration};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

pub struct HeadClient {
    config: HeadClientConfig,
    connector: Arc<dyn Connector>,
    query: Arc<dyn QueryApi>,
    transport: Option<Box<dyn Transport>>,
    observed_status: HeadStatus,
}

impl HeadClient {
    /// Client over WebSocket and HTTP, with the side-channel URL derived from `api_url`
    pub fn new(config: HeadClientConfig) -> ClientResult<Self> {
        let query = HttpQueryApi::new(config.http_url()?);
        Ok(Self::with_parts(
            config,
            Arc::new(WsConnector),
            Arc::new(query),
        ))
    }

    pub fn with_parts(
        config: HeadClientConfig,
        connector: Arc<dyn Connector>,
        query: Arc<dyn QueryApi>,
    ) -> Self {
        Self {
            config,
            connector,
            query,
            transport: None,
            observed_status: HeadStatus::Unknown,
        }
    }

    pub fn config(&self) -> &HeadClientConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    /// Lifecycle state implied by the last lifecycle event read
    pub fn observed_status(&self) -> HeadStatus {
        self.observed_status
    }

    // ================================================================================================
    // Channel
    // ================================================================================================

    pub async fn connect(&mut self) -> ClientResult<()> {
        info!("Connecting to Hydra API at {}", self.config.api_url);
        let transport = self.connector.connect(&self.config.api_url).await?;
        self.transport = Some(transport);
        Ok(())
    }

    pub async fn disconnect(&mut self) -> ClientResult<()> {
        match self.transport.take() {
            Some(mut transport) => transport.close().await,
            None => Ok(()),
        }
    }

    pub async fn send_command(&mut self, command: &ClientInput) -> ClientResult<()> {
        let transport = self.transport.as_mut().ok_or(ClientError::NotConnected)?;
        let text = serde_json::to_string(command)?;
        debug!("-> {}", command.tag());
        transport.send_text(text).await
    }

    /// Next event; suspends until one arrives or the remote end closes
    pub async fn receive_event(&mut self) -> ClientResult<HeadEvent> {
        let transport = self.transport.as_mut().ok_or(ClientError::NotConnected)?;
        let text = transport
            .recv_text()
            .await?
            .ok_or(ClientError::TransportClosed)?;

        let event = HeadEvent::from_json(&text)?;
        debug!("<- {}", event.tag());
        if let Some(status) = HeadStatus::after(&event) {
            self.observed_status = status;
        }
        Ok(event)
    }

    /// First event tagged `tag` within `timeout`; `None` once the deadline passes
    pub async fn wait_for_event(
        &mut self,
        tag: &str,
        timeout: Duration,
    ) -> ClientResult<Option<HeadEvent>> {
        self.wait_for(timeout, |event| event.tag() == tag).await
    }

    /// First event accepted by `matches` within `timeout`, discarding the rest
    pub async fn wait_for<F>(
        &mut self,
        timeout: Duration,
        mut matches: F,
    ) -> ClientResult<Option<HeadEvent>>
    where
        F: FnMut(&HeadEvent) -> bool,
    {
        let deadline = Instant::now() + timeout;
        loop {
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            let read_for = self.config.read_timeout.min(deadline - now);

            match tokio::time::timeout(read_for, self.receive_event()).await {
                Ok(Ok(event)) if matches(&event) => return Ok(Some(event)),
                Ok(Ok(event)) => debug!("Skipping {}", event.tag()),
                Ok(Err(ClientError::Json(e))) => warn!("Skipping undecodable message: {}", e),
                Ok(Err(e)) => return Err(e),
                Err(_) => continue,
            }
        }
    }

    /// Consume the unsolicited `Greetings` sent on connect
    pub async fn await_greetings(&mut self) -> ClientResult<Option<HeadStatus>> {
        let timeout = self.config.event_timeout;
        Ok(self
            .wait_for_event("Greetings", timeout)
            .await?
            .and_then(|event| HeadStatus::after(&event)))
    }

    // ================================================================================================
    // Transactions
    // ================================================================================================

    /// Send `NewTx`; with `await_confirmation` wait for the Head's verdict
    ///
    /// When `tx_id` is known, `TxValid`/`TxInvalid` events naming another
    /// transaction are skipped.
    pub async fn submit_transaction(
        &mut self,
        tx: &TxEnvelope,
        tx_id: Option<&str>,
        await_confirmation: bool,
    ) -> ClientResult<SubmitOutcome> {
        self.send_command(&ClientInput::new_tx(tx)?).await?;
        if !await_confirmation {
            return Ok(SubmitOutcome::Sent);
        }

        let timeout = self.config.confirm_timeout;
        let verdict = self
            .wait_for(timeout, |event| match event {
                HeadEvent::TxValid { .. } | HeadEvent::TxInvalid { .. } => {
                    match (tx_id, event.tx_id()) {
                        (Some(expected), Some(seen)) => expected == seen,
                        _ => true,
                    }
                }
                HeadEvent::CommandFailed { .. } => event.failed_command() == Some("NewTx"),
                _ => false,
            })
            .await?;

        Ok(match verdict {
            Some(event @ HeadEvent::TxValid { .. }) => SubmitOutcome::Accepted {
                tx_id: event.tx_id().or(tx_id).map(str::to_string),
            },
            Some(HeadEvent::TxInvalid {
                validation_error, ..
            }) => SubmitOutcome::Rejected {
                reason: validation_error.reason,
            },
            Some(_) => SubmitOutcome::Rejected {
                reason: "CommandFailed".to_string(),
            },
            None => {
                warn!("No verdict for transaction within {:?}", timeout);
                SubmitOutcome::TimedOut
            }
        })
    }

    /// Tally `TxValid`/`TxInvalid` until `expected` verdicts or the deadline
    pub async fn drain_events(
        &mut self,
        expected: usize,
        timeout: Duration,
    ) -> ClientResult<DrainTally> {
        let mut tally = DrainTally::default();
        let deadline = Instant::now() + timeout;

        while tally.total() < expected {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let event = self
                .wait_for(remaining, |event| {
                    matches!(event, HeadEvent::TxValid { .. } | HeadEvent::TxInvalid { .. })
                })
                .await?;
            match event {
                Some(HeadEvent::TxValid { .. }) => tally.valid += 1,
                Some(_) => tally.invalid += 1,
                None => {
                    warn!(
                        "Drain stopped with {}/{} verdicts",
                        tally.total(),
                        expected
                    );
                    break;
                }
            }
        }
        Ok(tally)
    }

    // ================================================================================================
    // Lifecycle
    // ================================================================================================

    pub async fn init_head(&mut self) -> ClientResult<bool> {
        self.run_lifecycle(ClientInput::Init, "HeadIsInitializing")
            .await
    }

    pub async fn abort_head(&mut self) -> ClientResult<bool> {
        self.run_lifecycle(ClientInput::Abort, "HeadIsAborted").await
    }

    pub async fn close_head(&mut self) -> ClientResult<bool> {
        self.run_lifecycle(ClientInput::Close, "HeadIsClosed").await
    }

    /// Only succeeds once the contestation period has passed
    pub async fn fanout_head(&mut self) -> ClientResult<bool> {
        self.run_lifecycle(ClientInput::Fanout, "HeadIsFinalized")
            .await
    }

    async fn run_lifecycle(&mut self, command: ClientInput, expected: &str) -> ClientResult<bool> {
        self.send_command(&command).await?;

        let command_tag = command.tag();
        let timeout = self.config.event_timeout;
        let outcome = self
            .wait_for(timeout, |event| {
                event.tag() == expected || event.failed_command() == Some(command_tag)
            })
            .await?;

        match outcome {
            Some(HeadEvent::CommandFailed { client_input }) => {
                error!("{} rejected by the Head: {}", command_tag, client_input);
                Ok(false)
            }
            Some(_) => {
                info!("{} confirmed by {}", command_tag, expected);
                Ok(true)
            }
            None => {
                error!(
                    "No {} within {:?}; last observed status {}",
                    expected, timeout, self.observed_status
                );
                Err(ClientError::LifecycleTimeout {
                    expected: expected.to_string(),
                })
            }
        }
    }

    // ================================================================================================
    // Side channel
    // ================================================================================================

    /// Draft commit transaction for `coin`, or `None` when the node refuses
    pub async fn build_commit_draft(&self, coin: &Coin) -> ClientResult<Option<String>> {
        let request: UtxoSet = std::iter::once(coin.clone()).collect();
        self.query.draft_commit(&request).await
    }

    /// Confirmed coin set, whatever snapshot shape the node returns
    pub async fn read_coin_snapshot(&self) -> ClientResult<UtxoSet> {
        let doc = self.query.snapshot().await?;
        normalize_snapshot(&doc)
    }
}

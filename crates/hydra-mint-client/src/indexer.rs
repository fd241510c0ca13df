/*!
# Chain Indexer Client

Discovers spendable base-ledger coins before the Head is funded, through an
Ogmios JSON-RPC endpoint (`queryLedgerState/utxo`).
*/

use crate::{
    errors::{ClientError, ClientResult},
    transport::{Connector, Transport, WsConnector},
};
use hydra_mint_sdk::{Coin, TxIn, TxOut, Value};
use serde::Deserialize;
use serde_json::json;
use std::{sync::Arc, time::Duration};
use tokio::time::Instant;
use tracing::{debug, info};

pub const DEFAULT_INDEXER_URL: &str = "ws://localhost:1337";

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    id: serde_json::Value,
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct TransactionRef {
    id: String,
}

/// One coin as reported by the indexer
#[derive(Debug, Deserialize)]
struct IndexerCoin {
    transaction: TransactionRef,
    index: u32,
    address: String,
    value: Value,
    #[serde(default)]
    datum: Option<serde_json::Value>,
    #[serde(rename = "datumHash", default)]
    datum_hash: Option<String>,
    #[serde(default)]
    script: Option<serde_json::Value>,
}

impl From<IndexerCoin> for Coin {
    fn from(coin: IndexerCoin) -> Self {
        let mut output = TxOut::new(coin.address, coin.value);
        output.datum_hash = coin.datum_hash;
        output.inline_datum = coin.datum;
        output.reference_script = coin.script;
        Coin::new(TxIn::new(coin.transaction.id, coin.index), output)
    }
}

pub struct IndexerClient {
    url: String,
    connector: Arc<dyn Connector>,
    transport: Option<Box<dyn Transport>>,
    request_timeout: Duration,
    next_id: u64,
}

impl IndexerClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_connector(url, Arc::new(WsConnector))
    }

    pub fn with_connector(url: impl Into<String>, connector: Arc<dyn Connector>) -> Self {
        Self {
            url: url.into(),
            connector,
            transport: None,
            request_timeout: Duration::from_secs(30),
            next_id: 0,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub async fn connect(&mut self) -> ClientResult<()> {
        info!("Connecting to chain indexer at {}", self.url);
        self.transport = Some(self.connector.connect(&self.url).await?);
        Ok(())
    }

    pub async fn disconnect(&mut self) -> ClientResult<()> {
        match self.transport.take() {
            Some(mut transport) => transport.close().await,
            None => Ok(()),
        }
    }

    /// Spendable coins held by `address`
    pub async fn query_utxo(&mut self, address: &str) -> ClientResult<Vec<Coin>> {
        let result = self
            .request(
                "queryLedgerState/utxo",
                json!({ "addresses": [address] }),
            )
            .await?;

        let coins: Vec<IndexerCoin> = serde_json::from_value(result)?;
        debug!("Indexer returned {} coin(s) for {}", coins.len(), address);
        Ok(coins.into_iter().map(Coin::from).collect())
    }

    async fn request(
        &mut self,
        method: &str,
        params: serde_json::Value,
    ) -> ClientResult<serde_json::Value> {
        self.next_id += 1;
        let id = json!(self.next_id);
        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": id,
        });

        let timeout = self.request_timeout;
        let transport = self.transport.as_mut().ok_or(ClientError::NotConnected)?;
        transport.send_text(body.to_string()).await?;

        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let text = tokio::time::timeout(remaining, transport.recv_text())
                .await
                .map_err(|_| ClientError::Indexer(format!("{method}: no response within {timeout:?}")))??
                .ok_or(ClientError::TransportClosed)?;

            let response: RpcResponse = serde_json::from_str(&text)?;
            if response.id != id {
                debug!("Ignoring indexer response for request {}", response.id);
                continue;
            }
            if let Some(error) = response.error {
                return Err(ClientError::Indexer(format!("{method}: {error}")));
            }
            return Ok(response.result.unwrap_or(serde_json::Value::Null));
        }
    }
}

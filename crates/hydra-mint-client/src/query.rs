/*!
# HTTP Side Channel

Request/response queries that sit next to the persistent event channel:
commit drafting (`POST /commit`) and the confirmed coin set
(`GET /snapshot`).

## Snapshot Shapes

Node versions disagree on where the coin set lives in the snapshot body.
[`normalize_snapshot`] tries an ordered list of extractors and takes the
first that matches:

1. `{ "utxo": {...} }`
2. `{ "initialUTxO": {...} }`
3. `{ "snapshot": { "utxo": {...} } }`

A body matching none of them is treated as an empty coin set.
*/

use crate::errors::ClientResult;
use async_trait::async_trait;
use hydra_mint_sdk::UtxoSet;
use serde::Deserialize;
use tracing::{debug, error, warn};
use url::Url;

/// Request/response queries against the Head node
#[async_trait]
pub trait QueryApi: Send + Sync {
    /// Draft transaction committing `coins`, or `None` when the node refuses
    async fn draft_commit(&self, coins: &UtxoSet) -> ClientResult<Option<String>>;

    /// Raw snapshot document
    async fn snapshot(&self) -> ClientResult<serde_json::Value>;
}

#[derive(Deserialize)]
struct DraftResponse {
    #[serde(rename = "cborHex")]
    cbor_hex: String,
}

pub struct HttpQueryApi {
    base_url: Url,
    http: reqwest::Client,
}

impl HttpQueryApi {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            http: reqwest::Client::new(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url.as_str().trim_end_matches('/'))
    }
}

#[async_trait]
impl QueryApi for HttpQueryApi {
    async fn draft_commit(&self, coins: &UtxoSet) -> ClientResult<Option<String>> {
        let url = self.endpoint("commit");
        debug!("POST {} with {} coin(s)", url, coins.len());

        let response = self.http.post(&url).json(coins).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Commit draft refused ({}): {}", status, body);
            return Ok(None);
        }

        let draft: DraftResponse = response.json().await?;
        Ok(Some(draft.cbor_hex))
    }

    async fn snapshot(&self) -> ClientResult<serde_json::Value> {
        let url = self.endpoint("snapshot");
        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!("Snapshot query returned {}", status);
            return Ok(serde_json::Value::Null);
        }
        Ok(response.json().await?)
    }
}

// ================================================================================================
// Snapshot normalization
// ================================================================================================

pub type SnapshotExtractor = fn(&serde_json::Value) -> Option<&serde_json::Value>;

fn top_level_utxo(doc: &serde_json::Value) -> Option<&serde_json::Value> {
    doc.get("utxo")
}

fn initial_utxo(doc: &serde_json::Value) -> Option<&serde_json::Value> {
    doc.get("initialUTxO")
}

fn nested_snapshot_utxo(doc: &serde_json::Value) -> Option<&serde_json::Value> {
    doc.get("snapshot").and_then(|snapshot| snapshot.get("utxo"))
}

pub const SNAPSHOT_EXTRACTORS: &[SnapshotExtractor] =
    &[top_level_utxo, initial_utxo, nested_snapshot_utxo];

pub fn normalize_snapshot(doc: &serde_json::Value) -> ClientResult<UtxoSet> {
    normalize_snapshot_with(doc, SNAPSHOT_EXTRACTORS)
}

pub fn normalize_snapshot_with(
    doc: &serde_json::Value,
    extractors: &[SnapshotExtractor],
) -> ClientResult<UtxoSet> {
    match extractors
        .iter()
        .find_map(|extract| extract(doc).filter(|utxo| utxo.is_object()))
    {
        Some(utxo) => Ok(serde_json::from_value(utxo.clone())?),
        None => {
            debug!("Snapshot has no recognized coin set, treating as empty");
            Ok(UtxoSet::new())
        }
    }
}

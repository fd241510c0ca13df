use async_trait::async_trait;
use hydra_mint_client::{ClientResult, QueryApi};
use hydra_mint_sdk::{Coin, UtxoSet};
use serde_json::{json, Value};
use std::sync::Mutex;

/// Side channel serving a fixed snapshot document and a fixed commit draft
#[derive(Default)]
pub struct StaticQueryApi {
    snapshot: Mutex<Value>,
    draft: Option<String>,
    commit_requests: Mutex<Vec<UtxoSet>>,
}

impl StaticQueryApi {
    /// Snapshot in the `{ "utxo": ... }` shape holding `coins`
    pub fn with_coins(coins: &[Coin]) -> Self {
        let set: UtxoSet = coins.iter().cloned().collect();
        Self::with_snapshot(json!({ "utxo": set }))
    }

    pub fn with_snapshot(snapshot: Value) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
            ..Default::default()
        }
    }

    pub fn with_draft(mut self, cbor_hex: impl Into<String>) -> Self {
        self.draft = Some(cbor_hex.into());
        self
    }

    pub fn set_snapshot(&self, snapshot: Value) {
        if let Ok(mut current) = self.snapshot.lock() {
            *current = snapshot;
        }
    }

    pub fn commit_requests(&self) -> Vec<UtxoSet> {
        self.commit_requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl QueryApi for StaticQueryApi {
    async fn draft_commit(&self, coins: &UtxoSet) -> ClientResult<Option<String>> {
        if let Ok(mut requests) = self.commit_requests.lock() {
            requests.push(coins.clone());
        }
        Ok(self.draft.clone())
    }

    async fn snapshot(&self) -> ClientResult<Value> {
        Ok(self
            .snapshot
            .lock()
            .map(|snapshot| snapshot.clone())
            .unwrap_or_default())
    }
}

use hydra_mint_client::ChannelPeer;
use serde_json::{json, Value};
use std::{
    collections::{HashSet, VecDeque},
    sync::{Arc, Mutex},
};
use tokio::task::JoinHandle;
use tracing::debug;

/// How the node answers one `NewTx`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Valid,
    Invalid(String),
    /// No answer at all
    Silent,
}

/// Scripted stand-in for a Hydra node on the other end of a channel transport
///
/// Lifecycle commands are confirmed with their usual event unless listed as
/// rejected, in which case the node answers `CommandFailed`. `NewTx` verdicts
/// are taken from the script in order; once it runs out every transaction is
/// valid.
#[derive(Debug, Clone, Default)]
pub struct MockHeadNode {
    greeting: Option<String>,
    verdicts: VecDeque<Verdict>,
    rejected: HashSet<String>,
    noise: usize,
}

impl MockHeadNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send `Greetings` with this head status as soon as the client connects
    pub fn with_greeting(mut self, head_status: &str) -> Self {
        self.greeting = Some(head_status.to_string());
        self
    }

    pub fn with_verdicts(mut self, verdicts: impl IntoIterator<Item = Verdict>) -> Self {
        self.verdicts = verdicts.into_iter().collect();
        self
    }

    /// Answer this command tag with `CommandFailed`
    pub fn rejecting(mut self, command: &str) -> Self {
        self.rejected.insert(command.to_string());
        self
    }

    /// Unrelated `SnapshotConfirmed` events sent ahead of every answer
    pub fn with_noise(mut self, events: usize) -> Self {
        self.noise = events;
        self
    }

    pub fn spawn(self, peer: ChannelPeer) -> MockNodeHandle {
        let commands = Arc::new(Mutex::new(Vec::new()));
        let task = tokio::spawn(self.serve(peer, commands.clone()));
        MockNodeHandle { commands, task }
    }

    async fn serve(mut self, mut peer: ChannelPeer, commands: Arc<Mutex<Vec<Value>>>) {
        if let Some(status) = &self.greeting {
            peer.push_event(json!({"tag": "Greetings", "headStatus": status}));
        }

        while let Some(command) = peer.next_command().await {
            if let Ok(mut seen) = commands.lock() {
                seen.push(command.clone());
            }
            let tag = command["tag"].as_str().unwrap_or_default().to_string();
            debug!("mock node received {}", tag);

            for _ in 0..self.noise {
                peer.push_event(json!({"tag": "SnapshotConfirmed", "snapshot": {}}));
            }

            if self.rejected.contains(&tag) {
                peer.push_event(json!({"tag": "CommandFailed", "clientInput": command}));
                continue;
            }

            let reply = match tag.as_str() {
                "NewTx" => self.answer_new_tx(&command),
                "Init" => Some(json!({"tag": "HeadIsInitializing", "headId": "mock-head"})),
                "Abort" => Some(json!({"tag": "HeadIsAborted", "headId": "mock-head"})),
                "Close" => Some(json!({
                    "tag": "HeadIsClosed",
                    "headId": "mock-head",
                    "contestationDeadline": "2026-01-01T00:00:00Z"
                })),
                "Fanout" => Some(json!({"tag": "HeadIsFinalized", "headId": "mock-head", "utxo": {}})),
                _ => None,
            };
            if let Some(reply) = reply {
                if !peer.push_event(reply) {
                    break;
                }
            }
        }
    }

    fn answer_new_tx(&mut self, command: &Value) -> Option<Value> {
        let tx_id = command["transaction"]["cborHex"].clone();
        match self.verdicts.pop_front().unwrap_or(Verdict::Valid) {
            Verdict::Valid => Some(json!({"tag": "TxValid", "transactionId": tx_id})),
            Verdict::Invalid(reason) => Some(json!({
                "tag": "TxInvalid",
                "transaction": {"txId": tx_id},
                "validationError": {"reason": reason}
            })),
            Verdict::Silent => None,
        }
    }
}

/// Access to what a running mock node has received
pub struct MockNodeHandle {
    commands: Arc<Mutex<Vec<Value>>>,
    task: JoinHandle<()>,
}

impl MockNodeHandle {
    pub fn commands(&self) -> Vec<Value> {
        self.commands
            .lock()
            .map(|commands| commands.clone())
            .unwrap_or_default()
    }

    pub fn command_tags(&self) -> Vec<String> {
        self.commands()
            .iter()
            .filter_map(|command| command["tag"].as_str().map(str::to_string))
            .collect()
    }

    /// CBOR payloads of every `NewTx` received, in order
    pub fn submitted(&self) -> Vec<String> {
        self.commands()
            .iter()
            .filter(|command| command["tag"] == "NewTx")
            .filter_map(|command| command["transaction"]["cborHex"].as_str().map(str::to_string))
            .collect()
    }
}

impl Drop for MockNodeHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

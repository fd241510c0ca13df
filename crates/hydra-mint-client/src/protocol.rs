/*!
# Head API Vocabulary

Commands sent to the Head over the persistent channel and the events it
pushes back. Every message is a JSON object discriminated by its `tag`
field.

Events the client does not model are kept as [`HeadEvent::Unrecognized`]
with their raw payload, so newer node versions never break a session.
*/

use hydra_mint_sdk::{TxEnvelope, UtxoSet};
use serde::{Deserialize, Serialize};
use std::fmt;

// ================================================================================================
// Commands
// ================================================================================================

/// A command sent to the Head
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "tag")]
pub enum ClientInput {
    Init,
    Abort,
    NewTx { transaction: serde_json::Value },
    Close,
    Fanout,
}

impl ClientInput {
    pub fn new_tx(tx: &TxEnvelope) -> serde_json::Result<Self> {
        Ok(ClientInput::NewTx {
            transaction: serde_json::to_value(tx)?,
        })
    }

    pub fn tag(&self) -> &'static str {
        match self {
            ClientInput::Init => "Init",
            ClientInput::Abort => "Abort",
            ClientInput::NewTx { .. } => "NewTx",
            ClientInput::Close => "Close",
            ClientInput::Fanout => "Fanout",
        }
    }
}

// ================================================================================================
// Head Status
// ================================================================================================

/// Lifecycle state of the Head as last reported by the node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HeadStatus {
    Idle,
    Initializing,
    Open,
    Closed,
    FanoutPossible,
    Final,
    #[default]
    #[serde(other)]
    Unknown,
}

impl HeadStatus {
    /// Status implied by a lifecycle event, if any
    pub fn after(event: &HeadEvent) -> Option<HeadStatus> {
        match event {
            HeadEvent::Greetings { head_status, .. } => Some(*head_status),
            HeadEvent::HeadIsInitializing { .. } => Some(HeadStatus::Initializing),
            HeadEvent::HeadIsOpen { .. } => Some(HeadStatus::Open),
            HeadEvent::HeadIsClosed { .. } => Some(HeadStatus::Closed),
            HeadEvent::ReadyToFanout { .. } => Some(HeadStatus::FanoutPossible),
            HeadEvent::HeadIsFinalized { .. } => Some(HeadStatus::Final),
            HeadEvent::HeadIsAborted { .. } => Some(HeadStatus::Idle),
            _ => None,
        }
    }
}

impl fmt::Display for HeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HeadStatus::Idle => "Idle",
            HeadStatus::Initializing => "Initializing",
            HeadStatus::Open => "Open",
            HeadStatus::Closed => "Closed",
            HeadStatus::FanoutPossible => "FanoutPossible",
            HeadStatus::Final => "Final",
            HeadStatus::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

// ================================================================================================
// Events
// ================================================================================================

/// Validation failure attached to `TxInvalid`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ValidationError {
    #[serde(default)]
    pub reason: String,
}

/// An event pushed by the Head
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "tag")]
pub enum HeadEvent {
    Greetings {
        #[serde(rename = "headStatus", default)]
        head_status: HeadStatus,
        #[serde(rename = "hydraNodeVersion", default)]
        node_version: Option<String>,
    },
    HeadIsInitializing {
        #[serde(rename = "headId", default)]
        head_id: Option<String>,
    },
    Committed {
        #[serde(default)]
        utxo: Option<serde_json::Value>,
    },
    HeadIsOpen {
        #[serde(rename = "headId", default)]
        head_id: Option<String>,
        #[serde(default)]
        utxo: UtxoSet,
    },
    HeadIsClosed {
        #[serde(rename = "headId", default)]
        head_id: Option<String>,
        #[serde(rename = "contestationDeadline", default)]
        contestation_deadline: Option<String>,
    },
    ReadyToFanout {
        #[serde(rename = "headId", default)]
        head_id: Option<String>,
    },
    HeadIsFinalized {
        #[serde(rename = "headId", default)]
        head_id: Option<String>,
        #[serde(default)]
        utxo: Option<serde_json::Value>,
    },
    HeadIsAborted {
        #[serde(rename = "headId", default)]
        head_id: Option<String>,
    },
    CommandFailed {
        #[serde(rename = "clientInput", default)]
        client_input: serde_json::Value,
    },
    TxValid {
        #[serde(rename = "transactionId", default)]
        transaction_id: Option<String>,
        #[serde(default)]
        transaction: Option<serde_json::Value>,
    },
    TxInvalid {
        #[serde(default)]
        transaction: Option<serde_json::Value>,
        #[serde(rename = "validationError", default)]
        validation_error: ValidationError,
    },
    SnapshotConfirmed {
        #[serde(default)]
        snapshot: Option<serde_json::Value>,
    },
    PostTxOnChainFailed {
        #[serde(rename = "postTxError", default)]
        post_tx_error: serde_json::Value,
    },
    #[serde(skip)]
    Unrecognized {
        tag: String,
        payload: serde_json::Value,
    },
}

impl HeadEvent {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        Ok(Self::from_value(value))
    }

    /// Decode a JSON message; unknown or malformed events become `Unrecognized`
    pub fn from_value(value: serde_json::Value) -> Self {
        match serde_json::from_value::<HeadEvent>(value.clone()) {
            Ok(event) => event,
            Err(_) => HeadEvent::Unrecognized {
                tag: value
                    .get("tag")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                payload: value,
            },
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            HeadEvent::Greetings { .. } => "Greetings",
            HeadEvent::HeadIsInitializing { .. } => "HeadIsInitializing",
            HeadEvent::Committed { .. } => "Committed",
            HeadEvent::HeadIsOpen { .. } => "HeadIsOpen",
            HeadEvent::HeadIsClosed { .. } => "HeadIsClosed",
            HeadEvent::ReadyToFanout { .. } => "ReadyToFanout",
            HeadEvent::HeadIsFinalized { .. } => "HeadIsFinalized",
            HeadEvent::HeadIsAborted { .. } => "HeadIsAborted",
            HeadEvent::CommandFailed { .. } => "CommandFailed",
            HeadEvent::TxValid { .. } => "TxValid",
            HeadEvent::TxInvalid { .. } => "TxInvalid",
            HeadEvent::SnapshotConfirmed { .. } => "SnapshotConfirmed",
            HeadEvent::PostTxOnChainFailed { .. } => "PostTxOnChainFailed",
            HeadEvent::Unrecognized { tag, .. } => tag,
        }
    }

    /// Tag of the command a `CommandFailed` event refers to
    pub fn failed_command(&self) -> Option<&str> {
        match self {
            HeadEvent::CommandFailed { client_input } => client_input
                .get("tag")
                .and_then(serde_json::Value::as_str),
            _ => None,
        }
    }

    /// Transaction id carried by `TxValid` / `TxInvalid`
    pub fn tx_id(&self) -> Option<&str> {
        let (explicit, transaction) = match self {
            HeadEvent::TxValid {
                transaction_id,
                transaction,
            } => (transaction_id.as_deref(), transaction.as_ref()),
            HeadEvent::TxInvalid { transaction, .. } => (None, transaction.as_ref()),
            _ => return None,
        };
        explicit.or_else(|| {
            transaction
                .and_then(|tx| tx.get("txId"))
                .and_then(serde_json::Value::as_str)
        })
    }
}

/*!
# Hydra Mint Client

Session client for a Hydra Head node: the persistent command/event channel,
its deadline-bounded wait primitives, the lifecycle commands and the HTTP side
channel of the same node. Also hosts the chain-indexer client used to find
base-ledger coins before the Head is funded.

## Architecture

[`HeadClient`] owns one [`Transport`] (WebSocket in production, an in-memory
channel in tests) and one [`QueryApi`] (HTTP in production). It is driven by a
single task; nothing in it is shared or retried.

```text
HeadClient ── Transport (ws)   ── commands / events
           └─ QueryApi  (http) ── POST /commit, GET /snapshot
```
*/

pub mod client;
pub mod config;
pub mod errors;
pub mod indexer;
pub mod protocol;
pub mod query;
pub mod transport;
pub mod types;

pub use client::HeadClient;
pub use config::{derive_http_url, HeadClientConfig, DEFAULT_API_URL};
pub use errors::{ClientError, ClientResult};
pub use indexer::{IndexerClient, DEFAULT_INDEXER_URL};
pub use protocol::{ClientInput, HeadEvent, HeadStatus, ValidationError};
pub use query::{
    normalize_snapshot, normalize_snapshot_with, HttpQueryApi, QueryApi, SnapshotExtractor,
    SNAPSHOT_EXTRACTORS,
};
pub use transport::{
    ChannelConnector, ChannelPeer, ChannelTransport, Connector, Transport, WsConnector,
    WsTransport,
};
pub use types::{DrainTally, SubmitOutcome};

/*!
# Hydra Mint Batch Transactions

Chained batch minting over an open Hydra Head. Every batch transaction spends
the fuel output of the previous one, so a long run never has to wait for a
fresh coin query between steps.

## Quick Start

```rust,no_run
use hydra_mint_batch_tx::{
    CardanoCliBuilder, CardanoCliConfig, ChainedMintPipeline, MintConfig, MintRun,
};
use hydra_mint_client::{HeadClient, HeadClientConfig};
use std::sync::Arc;

# async fn example() -> Result<(), Box<dyn std::error::Error>> {
let mut client = HeadClient::new(HeadClientConfig::new("ws://localhost:4001"))?;
client.connect().await?;
client.await_greetings().await?;

let builder = CardanoCliBuilder::new(CardanoCliConfig::default())?;
let config = MintConfig::with_policy("b7d525b149829894aa5fa73087d7758c2163c55520c8715652cb8515");
let pipeline = ChainedMintPipeline::new(config, Arc::new(builder))?;

let report = pipeline.run(&mut client, &MintRun::new("HydraNFT", 1_000, 50)).await;
println!("{}/{} batches accepted", report.completed_batches, report.total_batches);
# Ok(())
# }
```

## Turbo Mode

For very large runs, [`TurboDriver`] builds and signs every batch first and
then submits them back to back:

```rust,no_run
# use hydra_mint_batch_tx::{ChainedMintPipeline, MintRun, TurboDriver};
# use hydra_mint_client::HeadClient;
# async fn example(pipeline: ChainedMintPipeline, mut client: HeadClient) {
let report = TurboDriver::new(&pipeline)
    .run(&mut client, &MintRun::new("HydraNFT", 10_000, 100))
    .await;
if let Some(stop) = &report.stop {
    eprintln!("stopped: {stop}; resume from {:?}", report.checkpoint);
}
# }
```
*/

mod builder;
mod cardano_cli;
mod commit;
mod config;
mod error;
mod pipeline;
mod turbo;

pub use builder::{BuildRequest, TxBuilder};
pub use cardano_cli::{extract_tx_id, format_assets, format_tx_out, CardanoCliBuilder};
pub use commit::{commit_funds, CommitError, CommitReceipt, CommitResult};
pub use config::{CardanoCliConfig, MintConfig};
pub use error::{BuilderError, BuilderResult, PipelineError, PipelineResult};
pub use pipeline::{BuiltBatch, ChainedMintPipeline, Checkpoint, MintReport, MintRun};
pub use turbo::{BuildPhase, TurboDriver};

/*!
# Chained Batch Minting Pipeline

Mints `count` uniquely named assets, `batch_size` per transaction, spending
only coins the pipeline itself produced after the first batch.

Each batch transaction has exactly one input (the current fuel coin) and
produces:

- one or more asset outputs carrying the minted assets and the batch's
  lovelace reserve, chunked by `max_assets_per_output`;
- one fuel output right after them, carrying what is left for the next batch.

The fuel output index therefore equals the number of asset outputs, which is
1 whenever a batch fits in a single output. Because every output is known
before submission, batch `b + 1` can reference batch `b`'s fuel without
querying the Head again.

## Pipeline State

The state threaded from batch to batch is a [`Checkpoint`]. It only advances
after the Head accepts a batch, is serialisable, and is the only thing needed
to resume an interrupted run. It records the [`MintRun`] it belongs to, so a
resume with a different prefix, count or batch size is refused instead of
minting the wrong names.

## Single-Name Mode

[`ChainedMintPipeline::mint_quantity`] mints `quantity` units of one asset
name in a single transaction shaped like a one-asset batch.
*/

use crate::{
    builder::{BuildRequest, TxBuilder},
    config::MintConfig,
    error::{PipelineError, PipelineResult},
};
use hydra_mint_client::{HeadClient, SubmitOutcome};
use hydra_mint_sdk::{
    allocate_asset_outputs, asset_names, batch_ranges, nft_metadata, AssetId, Coin, OutputSpec,
    TxEnvelope, TxIn,
};
use serde::{Deserialize, Serialize};
use std::{
    ops::Range,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{debug, error, info, warn};

// ================================================================================================
// Run description and state
// ================================================================================================

/// What to mint: `{prefix}_{i}` for `i` in `[0, count)`, `batch_size` per transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintRun {
    pub prefix: String,
    pub count: u64,
    pub batch_size: u64,
}

impl MintRun {
    pub fn new(prefix: impl Into<String>, count: u64, batch_size: u64) -> Self {
        Self {
            prefix: prefix.into(),
            count,
            batch_size,
        }
    }

    pub fn batch_ranges(&self) -> PipelineResult<Vec<Range<u64>>> {
        Ok(batch_ranges(self.count, self.batch_size)?)
    }
}

/// Last confirmed position of the fuel chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub previous_tx_id: String,
    pub previous_output_index: u32,
    pub remaining_fuel: u64,
    /// Owner of the fuel coin and of every minted output
    pub address: String,
    /// Index of the next batch to run
    pub next_batch: u64,
    /// Run this chain is minting; absent until a run adopts the checkpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run: Option<MintRun>,
}

impl Checkpoint {
    /// Start of a run funded by `coin`
    pub fn from_coin(coin: &Coin) -> Self {
        Self {
            previous_tx_id: coin.input.tx_id.clone(),
            previous_output_index: coin.input.index,
            remaining_fuel: coin.lovelace(),
            address: coin.address().to_string(),
            next_batch: 0,
            run: None,
        }
    }

    pub fn for_run(mut self, run: &MintRun) -> Self {
        self.run = Some(run.clone());
        self
    }

    /// This checkpoint adopted by `run`, if it can continue it
    ///
    /// A checkpoint tagged with another run is refused, as is one that is
    /// already past the last of `run`'s `total_batches`.
    pub fn resuming(&self, run: &MintRun, total_batches: u64) -> PipelineResult<Checkpoint> {
        if let Some(saved) = &self.run {
            if saved != run {
                return Err(PipelineError::RunMismatch(format!(
                    "saved for {} assets `{}_*` in batches of {}, asked for {} assets `{}_*` in batches of {}",
                    saved.count, saved.prefix, saved.batch_size, run.count, run.prefix, run.batch_size
                )));
            }
        }
        if self.next_batch > total_batches {
            return Err(PipelineError::RunMismatch(format!(
                "next batch {} is past the run's {} batch(es)",
                self.next_batch + 1,
                total_batches
            )));
        }
        Ok(self.clone().for_run(run))
    }

    pub fn fuel_input(&self) -> TxIn {
        TxIn::new(self.previous_tx_id.clone(), self.previous_output_index)
    }

    pub fn load(path: &Path) -> std::io::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(std::io::Error::other)
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let text = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, text)
    }
}

/// A built and signed batch, not yet submitted
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltBatch {
    pub index: u64,
    pub asset_names: Vec<String>,
    pub signed: TxEnvelope,
    pub tx_id: String,
    pub fee: u64,
    pub reserve: u64,
    /// State before this batch: the fuel coin it spends
    pub consumed: Checkpoint,
    /// State once this batch is accepted
    pub next: Checkpoint,
}

/// Outcome of a run: progress plus the reason it stopped, if it did
#[derive(Debug)]
pub struct MintReport {
    pub total_batches: u64,
    /// Batches accepted during this run
    pub completed_batches: u64,
    /// Last confirmed state; `None` if no fuel coin was ever selected
    pub checkpoint: Option<Checkpoint>,
    pub stop: Option<PipelineError>,
}

impl MintReport {
    pub(crate) fn new(total_batches: u64, checkpoint: Option<Checkpoint>) -> Self {
        Self {
            total_batches,
            completed_batches: 0,
            checkpoint,
            stop: None,
        }
    }

    pub(crate) fn stopped(total_batches: u64, checkpoint: Option<Checkpoint>, stop: PipelineError) -> Self {
        Self {
            stop: Some(stop),
            ..Self::new(total_batches, checkpoint)
        }
    }

    pub fn is_complete(&self) -> bool {
        self.stop.is_none()
    }
}

// ================================================================================================
// Pipeline
// ================================================================================================

pub struct ChainedMintPipeline {
    config: MintConfig,
    builder: Arc<dyn TxBuilder>,
    checkpoint_path: Option<PathBuf>,
}

impl ChainedMintPipeline {
    pub fn new(config: MintConfig, builder: Arc<dyn TxBuilder>) -> PipelineResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            builder,
            checkpoint_path: None,
        })
    }

    /// Persist the checkpoint to `path` after every accepted batch
    pub fn with_checkpoint_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.checkpoint_path = Some(path.into());
        self
    }

    pub fn config(&self) -> &MintConfig {
        &self.config
    }

    /// Fund the run from the Head's highest-value asset-free coin and mint every batch
    pub async fn run(&self, client: &mut HeadClient, run: &MintRun) -> MintReport {
        let ranges = match run.batch_ranges() {
            Ok(ranges) => ranges,
            Err(e) => return MintReport::stopped(0, None, e),
        };
        let total = ranges.len() as u64;

        let start = match self.select_fuel(client).await {
            Ok(checkpoint) => checkpoint.for_run(run),
            Err(e) => {
                error!("Cannot start mint run: {}", e);
                return MintReport::stopped(total, None, e);
            }
        };

        info!(
            "Minting {} assets in {} batch(es) from fuel {} ({} lovelace)",
            run.count,
            total,
            start.fuel_input(),
            start.remaining_fuel
        );
        self.drive(client, run, &ranges, start).await
    }

    /// Continue a run from a saved checkpoint, without reading the Head's coin set
    pub async fn resume(
        &self,
        client: &mut HeadClient,
        run: &MintRun,
        checkpoint: Checkpoint,
    ) -> MintReport {
        let ranges = match run.batch_ranges() {
            Ok(ranges) => ranges,
            Err(e) => return MintReport::stopped(0, Some(checkpoint), e),
        };
        let total = ranges.len() as u64;
        let checkpoint = match checkpoint.resuming(run, total) {
            Ok(adopted) => adopted,
            Err(e) => {
                error!("Cannot resume mint run: {}", e);
                return MintReport::stopped(total, Some(checkpoint), e);
            }
        };

        info!(
            "Resuming at batch {}/{} from fuel {} ({} lovelace)",
            checkpoint.next_batch + 1,
            total,
            checkpoint.fuel_input(),
            checkpoint.remaining_fuel
        );
        self.drive(client, run, &ranges, checkpoint).await
    }

    pub(crate) async fn select_fuel(&self, client: &HeadClient) -> PipelineResult<Checkpoint> {
        let coins = client
            .read_coin_snapshot()
            .await
            .map_err(PipelineError::Snapshot)?;
        let coin = coins
            .largest_pure_lovelace()
            .ok_or(PipelineError::NoFunds)?;
        debug!("Selected fuel coin {} of {} in the Head", coin.input, coins.len());
        Ok(Checkpoint::from_coin(&coin))
    }

    async fn drive(
        &self,
        client: &mut HeadClient,
        run: &MintRun,
        ranges: &[Range<u64>],
        start: Checkpoint,
    ) -> MintReport {
        let mut report = MintReport::new(ranges.len() as u64, Some(start.clone()));
        let mut checkpoint = start;

        while let Some(range) = ranges.get(checkpoint.next_batch as usize) {
            let batch = checkpoint.next_batch;
            info!(
                "Batch {}/{}: assets {}..{}",
                batch + 1,
                ranges.len(),
                range.start,
                range.end
            );

            let built = match self
                .build_batch(&checkpoint, &run.prefix, range.clone())
                .await
            {
                Ok(built) => built,
                Err(e) => {
                    error!("Batch {} stopped the run: {}", batch + 1, e);
                    report.stop = Some(e);
                    break;
                }
            };

            if let Err(e) = submit_batch(client, &built).await {
                error!("Batch {} stopped the run: {}", batch + 1, e);
                report.stop = Some(e);
                break;
            }

            checkpoint = built.next;
            report.completed_batches += 1;
            report.checkpoint = Some(checkpoint.clone());
            self.persist(&checkpoint);
        }

        if report.is_complete() {
            info!(
                "Mint run finished: {} batch(es) accepted",
                report.completed_batches
            );
        }
        report
    }

    /// Mint `quantity` units of `name` in one transaction funded like a run
    pub async fn mint_quantity(
        &self,
        client: &mut HeadClient,
        name: &str,
        quantity: u64,
    ) -> MintReport {
        if quantity == 0 {
            return MintReport::stopped(
                1,
                None,
                PipelineError::Config("quantity must be greater than zero".to_string()),
            );
        }

        let start = match self.select_fuel(client).await {
            Ok(checkpoint) => checkpoint,
            Err(e) => {
                error!("Cannot mint {}: {}", name, e);
                return MintReport::stopped(1, None, e);
            }
        };
        info!(
            "Minting {} of {} from fuel {} ({} lovelace)",
            quantity,
            name,
            start.fuel_input(),
            start.remaining_fuel
        );

        let mut report = MintReport::new(1, Some(start.clone()));
        let outcome = match self.build_minting(&start, vec![name.to_string()], quantity).await {
            Ok(built) => submit_batch(client, &built).await.map(|()| built.next),
            Err(e) => Err(e),
        };
        match outcome {
            Ok(next) => {
                report.completed_batches = 1;
                report.checkpoint = Some(next);
            }
            Err(e) => {
                error!("Minting {} failed: {}", name, e);
                report.stop = Some(e);
            }
        }
        report
    }

    /// Build, sign and identify the batch that spends `checkpoint`'s fuel
    pub async fn build_batch(
        &self,
        checkpoint: &Checkpoint,
        prefix: &str,
        range: Range<u64>,
    ) -> PipelineResult<BuiltBatch> {
        self.build_minting(checkpoint, asset_names(prefix, range), 1)
            .await
    }

    async fn build_minting(
        &self,
        checkpoint: &Checkpoint,
        names: Vec<String>,
        quantity: u64,
    ) -> PipelineResult<BuiltBatch> {
        let batch = checkpoint.next_batch;
        let asset_count = names.len() as u64;

        let fee = self.config.fee_for(asset_count)?;
        let reserve = self.config.reserve_for(asset_count)?;
        let required = fee
            .checked_add(reserve)
            .and_then(|sum| sum.checked_add(self.config.fuel_floor))
            .ok_or_else(|| {
                PipelineError::Config(format!(
                    "fee, reserve and fuel floor for {asset_count} assets overflow u64"
                ))
            })?;
        if checkpoint.remaining_fuel < required {
            return Err(PipelineError::FuelExhausted {
                batch,
                available: checkpoint.remaining_fuel,
                required,
            });
        }
        let remaining_fuel = checkpoint.remaining_fuel - fee - reserve;

        let assets: Vec<AssetId> = names
            .iter()
            .map(|name| AssetId::new(self.config.policy_id.clone(), name.clone()))
            .collect();
        let mut outputs = allocate_asset_outputs(
            &checkpoint.address,
            &assets,
            reserve,
            self.config.max_assets_per_output,
        )?;
        for output in &mut outputs {
            for (_, units) in &mut output.assets {
                *units = quantity;
            }
        }
        let fuel_index = outputs.len() as u32;
        outputs.push(OutputSpec::lovelace_only(
            checkpoint.address.clone(),
            remaining_fuel,
        ));

        let request = BuildRequest {
            inputs: vec![checkpoint.fuel_input()],
            outputs,
            mint: assets.into_iter().map(|asset| (asset, quantity)).collect(),
            fee,
            metadata: Some(nft_metadata(
                &self.config.policy_id,
                &names,
                &self.config.image_uri,
            )),
        };

        let raw = self
            .builder
            .build(&request)
            .await
            .map_err(|source| PipelineError::Build { batch, source })?;
        let signed = self
            .builder
            .sign(&raw)
            .await
            .map_err(|source| PipelineError::Sign { batch, source })?;
        let tx_id = self
            .builder
            .identify(&signed)
            .await
            .map_err(|source| PipelineError::Identity { batch, source })?;

        debug!(
            "Batch {} built as {} (fee {}, reserve {}, fuel {} -> {})",
            batch + 1,
            tx_id,
            fee,
            reserve,
            checkpoint.remaining_fuel,
            remaining_fuel
        );

        let next = Checkpoint {
            previous_tx_id: tx_id.clone(),
            previous_output_index: fuel_index,
            remaining_fuel,
            address: checkpoint.address.clone(),
            next_batch: batch + 1,
            run: checkpoint.run.clone(),
        };

        Ok(BuiltBatch {
            index: batch,
            asset_names: names,
            signed,
            tx_id,
            fee,
            reserve,
            consumed: checkpoint.clone(),
            next,
        })
    }

    pub(crate) fn persist(&self, checkpoint: &Checkpoint) {
        if let Some(path) = &self.checkpoint_path {
            if let Err(e) = checkpoint.save(path) {
                warn!("Failed to write checkpoint {}: {}", path.display(), e);
            }
        }
    }
}

/// Submit one batch and wait for the Head's verdict
pub(crate) async fn submit_batch(client: &mut HeadClient, built: &BuiltBatch) -> PipelineResult<()> {
    let batch = built.index;
    let outcome = client
        .submit_transaction(&built.signed, Some(&built.tx_id), true)
        .await
        .map_err(|source| PipelineError::Client { batch, source })?;

    match outcome {
        SubmitOutcome::Accepted { .. } => {
            info!("Batch {} accepted ({})", batch + 1, built.tx_id);
            Ok(())
        }
        SubmitOutcome::Rejected { reason } => Err(PipelineError::ChainBroken { batch, reason }),
        SubmitOutcome::TimedOut | SubmitOutcome::Sent => Err(PipelineError::ChainBroken {
            batch,
            reason: "no verdict from the Head before the deadline".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BuilderError, BuilderResult};
    use async_trait::async_trait;
    use hydra_mint_sdk::{TxOut, Value};
    use std::sync::Mutex;

    const POLICY: &str = "b7d525b149829894aa5fa73087d7758c2163c55520c8715652cb8515";

    /// Names transactions after the fuel lovelace they leave
    #[derive(Default)]
    struct EchoBuilder {
        requests: Mutex<Vec<BuildRequest>>,
        fail_identify: bool,
    }

    #[async_trait]
    impl TxBuilder for EchoBuilder {
        async fn build(&self, request: &BuildRequest) -> BuilderResult<TxEnvelope> {
            self.requests.lock().unwrap().push(request.clone());
            let fuel = request.outputs.last().map(|o| o.lovelace).unwrap_or_default();
            Ok(TxEnvelope::signed(format!("{fuel:x}")))
        }

        async fn sign(&self, raw: &TxEnvelope) -> BuilderResult<TxEnvelope> {
            Ok(raw.clone())
        }

        async fn identify(&self, signed: &TxEnvelope) -> BuilderResult<String> {
            if self.fail_identify {
                return Err(BuilderError::NoTxId(String::new()));
            }
            Ok(format!("{:0>64}", signed.cbor_hex))
        }

        async fn submit_to_base_ledger(&self, _signed: &TxEnvelope) -> BuilderResult<()> {
            Ok(())
        }
    }

    fn start(fuel: u64) -> Checkpoint {
        Checkpoint::from_coin(&Coin::new(
            TxIn::new("aa".repeat(32), 0),
            TxOut::new("addr_test1me", Value::lovelace(fuel)),
        ))
    }

    fn pipeline(builder: Arc<EchoBuilder>) -> ChainedMintPipeline {
        ChainedMintPipeline::new(MintConfig::with_policy(POLICY), builder).unwrap()
    }

    #[test]
    fn test_pipeline_rejects_bad_config() {
        let result = ChainedMintPipeline::new(MintConfig::default(), Arc::new(EchoBuilder::default()));
        assert!(matches!(result, Err(PipelineError::Config(_))));
    }

    #[tokio::test]
    async fn test_build_batch_single_output() {
        let builder = Arc::new(EchoBuilder::default());
        let pipeline = pipeline(builder.clone());

        let built = pipeline
            .build_batch(&start(100_000_000), "Hydra", 0..50)
            .await
            .unwrap();

        assert_eq!(built.fee, 1_700_000);
        assert_eq!(built.reserve, 2_500_000);
        assert_eq!(built.next.remaining_fuel, 100_000_000 - 1_700_000 - 2_500_000);
        assert_eq!(built.next.previous_output_index, 1);
        assert_eq!(built.next.previous_tx_id, built.tx_id);
        assert_eq!(built.next.next_batch, 1);
        assert_eq!(built.asset_names.first().map(String::as_str), Some("Hydra_0"));

        let requests = builder.requests.lock().unwrap();
        let request = &requests[0];
        assert_eq!(request.inputs, vec![TxIn::new("aa".repeat(32), 0)]);
        assert_eq!(request.outputs.len(), 2);
        assert_eq!(request.outputs[0].lovelace, 2_500_000);
        assert_eq!(request.outputs[0].assets.len(), 50);
        assert!(request.outputs[1].assets.is_empty());
        assert_eq!(request.mint.len(), 50);
        assert_eq!(request.fee, 1_700_000);
        let metadata = request.metadata.as_ref().unwrap();
        assert_eq!(metadata["721"][POLICY]["Hydra_49"]["name"], "Hydra_49");
    }

    #[tokio::test]
    async fn test_build_batch_fragments_large_batches() {
        let builder = Arc::new(EchoBuilder::default());
        let pipeline = pipeline(builder.clone());

        let built = pipeline
            .build_batch(&start(100_000_000), "Big", 0..200)
            .await
            .unwrap();

        // 200 assets at 80 per output -> 3 asset outputs, fuel at index 3
        assert_eq!(built.next.previous_output_index, 3);
        let requests = builder.requests.lock().unwrap();
        let outputs = &requests[0].outputs;
        assert_eq!(outputs.len(), 4);
        let reserve = 1_500_000 + 20_000 * 200;
        assert_eq!(outputs[..3].iter().map(|o| o.lovelace).sum::<u64>(), reserve);
        assert_eq!(outputs[2].lovelace, reserve / 3 + reserve % 3);
    }

    #[tokio::test]
    async fn test_build_batch_fuel_floor() {
        let builder = Arc::new(EchoBuilder::default());
        let pipeline = pipeline(builder.clone());

        // one asset needs 230_000 + 1_520_000 + 2_000_000 floor
        let exact = 230_000 + 1_520_000 + 2_000_000;
        assert!(pipeline.build_batch(&start(exact), "F", 0..1).await.is_ok());

        let result = pipeline.build_batch(&start(exact - 1), "F", 0..1).await;
        assert!(matches!(
            result,
            Err(PipelineError::FuelExhausted { batch: 0, available, required })
                if available == exact - 1 && required == exact
        ));
        assert_eq!(builder.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_build_batch_identity_failure() {
        let builder = Arc::new(EchoBuilder {
            fail_identify: true,
            ..Default::default()
        });
        let pipeline = pipeline(builder);

        let mut checkpoint = start(50_000_000);
        checkpoint.next_batch = 4;
        let result = pipeline.build_batch(&checkpoint, "I", 400..410).await;
        assert!(matches!(result, Err(PipelineError::Identity { batch: 4, .. })));
    }

    #[test]
    fn test_checkpoint_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkpoint.json");

        let checkpoint = Checkpoint {
            previous_tx_id: "ab".repeat(32),
            previous_output_index: 1,
            remaining_fuel: 42_000_000,
            address: "addr_test1me".to_string(),
            next_batch: 7,
            run: Some(MintRun::new("Hydra", 100, 10)),
        };
        checkpoint.save(&path).unwrap();
        assert_eq!(Checkpoint::load(&path).unwrap(), checkpoint);
        assert_eq!(checkpoint.fuel_input().to_string(), format!("{}#1", "ab".repeat(32)));

        // files written without a run still load
        std::fs::write(
            &path,
            r#"{"previous_tx_id":"ab","previous_output_index":0,"remaining_fuel":5,"address":"addr_test1me","next_batch":2}"#,
        )
        .unwrap();
        assert_eq!(Checkpoint::load(&path).unwrap().run, None);
    }

    #[test]
    fn test_checkpoint_resuming() {
        let run = MintRun::new("Hydra", 100, 10);
        let tagged = start(10_000_000).for_run(&run);
        assert_eq!(tagged.resuming(&run, 10).unwrap(), tagged);

        for other in [
            MintRun::new("Hydra", 100, 50),
            MintRun::new("Other", 100, 10),
            MintRun::new("Hydra", 200, 10),
        ] {
            assert!(matches!(
                tagged.resuming(&other, 10),
                Err(PipelineError::RunMismatch(_))
            ));
        }

        let mut untagged = start(10_000_000);
        untagged.next_batch = 10;
        assert_eq!(untagged.resuming(&run, 10).unwrap().run, Some(run.clone()));
        untagged.next_batch = 11;
        assert!(matches!(
            untagged.resuming(&run, 10),
            Err(PipelineError::RunMismatch(_))
        ));
    }

    #[tokio::test]
    async fn test_build_batch_overflowing_config() {
        let builder = Arc::new(EchoBuilder::default());
        let config = MintConfig {
            fuel_floor: u64::MAX,
            ..MintConfig::with_policy(POLICY)
        };
        let pipeline = ChainedMintPipeline::new(config, builder.clone()).unwrap();

        let result = pipeline.build_batch(&start(u64::MAX), "O", 0..10).await;
        assert!(matches!(result, Err(PipelineError::Config(_))));
        assert!(builder.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_build_batch_carries_run_forward() {
        let pipeline = pipeline(Arc::new(EchoBuilder::default()));
        let run = MintRun::new("Hydra", 20, 10);

        let built = pipeline
            .build_batch(&start(100_000_000).for_run(&run), "Hydra", 0..10)
            .await
            .unwrap();
        assert_eq!(built.next.run, Some(run));
    }

    #[test]
    fn test_mint_run_ranges() {
        let run = MintRun::new("X", 10, 4);
        assert_eq!(run.batch_ranges().unwrap(), vec![0..4, 4..8, 8..10]);
        assert!(matches!(
            MintRun::new("X", 10, 0).batch_ranges(),
            Err(PipelineError::Allocation(_))
        ));
    }
}

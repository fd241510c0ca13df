use super::connect_with_retry;
use crate::{
    config::OperatorConfig,
    error::{CliError, CliResult},
};
use clap::Args;
use hydra_mint_batch_tx::{
    CardanoCliBuilder, ChainedMintPipeline, Checkpoint, MintReport, MintRun, TurboDriver,
};
use hydra_mint_client::HeadClientConfig;
use std::{path::PathBuf, sync::Arc};

/// Shape of a mint run
#[derive(Args, Debug, Clone)]
pub struct MintArgs {
    /// Total number of assets to mint
    #[arg(short = 'n', long)]
    pub count: u64,

    /// Assets minted per transaction
    #[arg(short, long, default_value = "50")]
    pub batch_size: u64,

    /// Asset names are `<prefix>_<index>`
    #[arg(short, long, default_value = "HydraNFT")]
    pub prefix: String,

    /// Minting policy id; overrides the configuration file
    #[arg(long)]
    pub policy_id: Option<String>,
}

impl MintArgs {
    fn run(&self) -> MintRun {
        MintRun::new(self.prefix.clone(), self.count, self.batch_size)
    }
}

fn build_pipeline(
    operator: &OperatorConfig,
    policy_id: Option<&String>,
) -> CliResult<ChainedMintPipeline> {
    let mut config = operator.mint.clone();
    if let Some(policy_id) = policy_id {
        config.policy_id = policy_id.clone();
    }
    let builder = Arc::new(CardanoCliBuilder::new(operator.builder.clone())?);
    Ok(ChainedMintPipeline::new(config, builder)?)
}

pub async fn execute(
    head: HeadClientConfig,
    operator: &OperatorConfig,
    args: MintArgs,
    turbo: bool,
    checkpoint: Option<PathBuf>,
) -> CliResult<()> {
    let run = args.run();
    println!(
        "🚀 Minting {} asset(s) in batches of {} ({} mode)",
        run.count,
        run.batch_size,
        if turbo { "turbo" } else { "chained" }
    );

    let mut pipeline = build_pipeline(operator, args.policy_id.as_ref())?;
    if let Some(path) = checkpoint {
        println!("💾 Checkpoint file: {}", path.display());
        pipeline = pipeline.with_checkpoint_file(path);
    }

    let mut client = connect_with_retry(&head).await?;
    if let Some(status) = client.await_greetings().await? {
        println!("📋 Head status: {}", status);
    }

    let report = if turbo {
        TurboDriver::new(&pipeline).run(&mut client, &run).await
    } else {
        pipeline.run(&mut client, &run).await
    };
    client.disconnect().await?;

    finish(report)
}

/// Mint `quantity` units of a single asset name in one transaction
pub async fn execute_quantity(
    head: HeadClientConfig,
    operator: &OperatorConfig,
    name: String,
    quantity: u64,
    policy_id: Option<String>,
) -> CliResult<()> {
    println!("🪙 Minting {} of {}", quantity, name);
    let pipeline = build_pipeline(operator, policy_id.as_ref())?;

    let mut client = connect_with_retry(&head).await?;
    if let Some(status) = client.await_greetings().await? {
        println!("📋 Head status: {}", status);
    }

    let report = pipeline.mint_quantity(&mut client, &name, quantity).await;
    client.disconnect().await?;

    finish(report)
}

/// Continue the run recorded in `checkpoint_path`
pub async fn resume(
    head: HeadClientConfig,
    operator: &OperatorConfig,
    checkpoint_path: PathBuf,
    policy_id: Option<String>,
    turbo: bool,
) -> CliResult<()> {
    let checkpoint = Checkpoint::load(&checkpoint_path)?;
    let run = checkpoint.run.clone().ok_or_else(|| {
        CliError::InvalidConfig(format!(
            "checkpoint {} does not record which run it belongs to",
            checkpoint_path.display()
        ))
    })?;
    println!(
        "🔁 Resuming {} asset(s) `{}_*` in batches of {} at batch {} from {} ({} lovelace of fuel)",
        run.count,
        run.prefix,
        run.batch_size,
        checkpoint.next_batch + 1,
        checkpoint.fuel_input(),
        checkpoint.remaining_fuel
    );

    let pipeline =
        build_pipeline(operator, policy_id.as_ref())?.with_checkpoint_file(checkpoint_path);

    let mut client = connect_with_retry(&head).await?;
    if let Some(status) = client.await_greetings().await? {
        println!("📋 Head status: {}", status);
    }

    let report = if turbo {
        TurboDriver::new(&pipeline)
            .run_from(&mut client, &run, checkpoint)
            .await
    } else {
        pipeline.resume(&mut client, &run, checkpoint).await
    };
    client.disconnect().await?;

    finish(report)
}

fn finish(report: MintReport) -> CliResult<()> {
    println!("\n📊 Summary:");
    println!(
        "  - {}/{} batch(es) accepted",
        report.completed_batches, report.total_batches
    );
    if let Some(checkpoint) = &report.checkpoint {
        println!(
            "  - Fuel: {} ({} lovelace)",
            checkpoint.fuel_input(),
            checkpoint.remaining_fuel
        );
        println!("  - Next batch: {}", checkpoint.next_batch + 1);
    }

    match report.stop {
        None => {
            println!("\n🎉 Mint run completed successfully!");
            Ok(())
        }
        Some(stop) => {
            if let Some(batch) = stop.batch() {
                println!("\n❌ Stopped at batch {}", batch + 1);
            }
            Err(stop.into())
        }
    }
}

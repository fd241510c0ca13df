use clap::{Parser, Subcommand};
use hydra_mint_client::{HeadClientConfig, DEFAULT_API_URL, DEFAULT_INDEXER_URL};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod error;

use commands::{lifecycle::LifecycleStep, mint::MintArgs};
use config::OperatorConfig;
use error::CliResult;

#[derive(Parser)]
#[command(name = "hydra-mint")]
#[command(about = "Hydra Mint CLI - Chained NFT batch minting inside a Hydra Head")]
#[command(version)]
struct Cli {
    /// Hydra node WebSocket API
    #[arg(long, global = true, env = "HYDRA_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Operator configuration file (YAML) with mint, builder and funding sections
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report the Head status and the size of its confirmed coin set
    Status,

    /// Initialize a new Head
    Init,

    /// Commit a base-ledger coin into the initializing Head
    Fund {
        /// Address holding the coins to commit
        address: String,

        /// Where the fee change goes (defaults to the funding address)
        #[arg(long)]
        change_address: Option<String>,

        /// Chain indexer (Ogmios) WebSocket API
        #[arg(long, env = "OGMIOS_API_URL", default_value = DEFAULT_INDEXER_URL)]
        indexer_url: String,
    },

    /// Abort a Head that has not opened yet
    Abort,

    /// Close the open Head
    Close,

    /// Distribute the closed Head's coins back to the base ledger
    Fanout,

    /// Mint a run of NFTs in chained batches
    Mint {
        #[command(flatten)]
        run: MintArgs,

        /// Build and sign every batch before submitting any
        #[arg(long)]
        turbo: bool,

        /// Write the checkpoint here after every accepted batch
        #[arg(long)]
        checkpoint: Option<PathBuf>,
    },

    /// Continue an interrupted mint run from its checkpoint file
    Resume {
        /// Checkpoint file written by a previous run; updated as batches land
        #[arg(long)]
        checkpoint: PathBuf,

        /// Build and sign every remaining batch before submitting any
        #[arg(long)]
        turbo: bool,

        /// Minting policy id; overrides the configuration file
        #[arg(long)]
        policy_id: Option<String>,
    },

    /// Mint several units of one asset name in a single transaction
    MintQuantity {
        /// Asset name, minted as-is
        #[arg(short, long, default_value = "HydraNFT")]
        name: String,

        /// Units to mint
        #[arg(short, long, default_value = "1")]
        quantity: u64,

        /// Minting policy id; overrides the configuration file
        #[arg(long)]
        policy_id: Option<String>,
    },
}

#[tokio::main]
async fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let operator = OperatorConfig::load(cli.config.as_deref())?;
    let head = HeadClientConfig::new(cli.api_url);

    match cli.command {
        Commands::Status => commands::status::execute(head).await,

        Commands::Init => commands::lifecycle::execute(head, LifecycleStep::Init).await,
        Commands::Abort => commands::lifecycle::execute(head, LifecycleStep::Abort).await,
        Commands::Close => commands::lifecycle::execute(head, LifecycleStep::Close).await,
        Commands::Fanout => commands::lifecycle::execute(head, LifecycleStep::Fanout).await,

        Commands::Fund {
            address,
            change_address,
            indexer_url,
        } => commands::fund::execute(head, &operator, indexer_url, address, change_address).await,

        Commands::Mint {
            run,
            turbo,
            checkpoint,
        } => commands::mint::execute(head, &operator, run, turbo, checkpoint).await,

        Commands::Resume {
            checkpoint,
            turbo,
            policy_id,
        } => commands::mint::resume(head, &operator, checkpoint, policy_id, turbo).await,

        Commands::MintQuantity {
            name,
            quantity,
            policy_id,
        } => commands::mint::execute_quantity(head, &operator, name, quantity, policy_id).await,
    }
}

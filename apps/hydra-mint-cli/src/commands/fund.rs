use crate::{
    config::OperatorConfig,
    error::{CliError, CliResult},
};
use hydra_mint_batch_tx::{commit_funds, CardanoCliBuilder};
use hydra_mint_client::{HeadClient, HeadClientConfig, IndexerClient};

pub async fn execute(
    head: HeadClientConfig,
    operator: &OperatorConfig,
    indexer_url: String,
    address: String,
    change_address: Option<String>,
) -> CliResult<()> {
    println!("💰 Funding Hydra Head at {}", head.api_url);
    println!("Address: {}", address);
    println!("Indexer: {}", indexer_url);

    // Step 1: Base-ledger coins at the funding address
    println!("\n🔎 Querying coins...");
    let mut indexer = IndexerClient::new(indexer_url);
    indexer.connect().await?;
    let coins = indexer.query_utxo(&address).await?;
    indexer.disconnect().await?;

    if coins.is_empty() {
        return Err(CliError::CommandExecution(format!(
            "No coins found at {}",
            address
        )));
    }
    println!("✅ Found {} coin(s)", coins.len());
    for coin in &coins {
        println!("  🪙 {}: {} lovelace", coin.input, coin.lovelace());
    }

    // Step 2: Draft, balance, sign and submit the commit
    println!("\n🏗️  Committing into the Head...");
    let client = HeadClient::new(head)?;
    let builder = CardanoCliBuilder::new(operator.builder.clone())?;
    let change_address = change_address.as_deref().unwrap_or(&address);

    let receipt = commit_funds(&client, &builder, &coins, change_address, &operator.funding).await?;

    println!("\n🎉 Commit transaction submitted!");
    println!("📊 Summary:");
    println!(
        "  - Committed {} ({} lovelace)",
        receipt.selection.commit.input,
        receipt.selection.commit.lovelace()
    );
    println!(
        "  - Fee paid from {} ({} lovelace)",
        receipt.selection.fee.input,
        receipt.selection.fee.lovelace()
    );
    println!("  - Change to {}", change_address);

    Ok(())
}

use super::connect_with_retry;
use crate::error::CliResult;
use hydra_mint_client::HeadClientConfig;

pub async fn execute(head: HeadClientConfig) -> CliResult<()> {
    println!("🔍 Probing Hydra Head at {}", head.api_url);
    let mut client = connect_with_retry(&head).await?;

    match client.await_greetings().await? {
        Some(status) => println!("✅ Head status: {}", status),
        None => println!(
            "⚠️  No greeting from the node, last observed status: {}",
            client.observed_status()
        ),
    }

    let coins = client.read_coin_snapshot().await?;
    println!(
        "📦 Confirmed snapshot: {} coin(s), {} lovelace, {} native asset(s)",
        coins.len(),
        coins.total_lovelace(),
        coins.asset_count()
    );
    if let Some(largest) = coins.largest() {
        println!("💰 Largest coin: {} ({} lovelace)", largest.input, largest.lovelace());
    }
    match coins.largest_pure_lovelace() {
        Some(fuel) => println!("⛽ Fuel candidate: {} ({} lovelace)", fuel.input, fuel.lovelace()),
        None => println!("⚠️  No asset-free coin to fund a mint run"),
    }

    client.disconnect().await?;
    Ok(())
}

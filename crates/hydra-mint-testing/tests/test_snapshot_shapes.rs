use hydra_mint_sdk::UtxoSet;
use hydra_mint_testing::{test_coin, MockHeadNode, RecordingBuilder, StaticQueryApi, TestFixture};
use serde_json::json;

/// Test the three snapshot shapes a node may return read as the same coin set
///
/// Should test:
/// - Serve `{utxo}`, `{initialUTxO}` and `{snapshot: {utxo}}` in turn
/// - Verify read_coin_snapshot returns identical sets
/// - Verify an unrecognized shape reads as an empty set
#[tokio::test]
async fn test_snapshot_shapes_normalize_to_same_set() {
    let coins: UtxoSet = [test_coin(1, 0, 5_000_000), test_coin(2, 4, 7_500_000)]
        .into_iter()
        .collect();
    let utxo = serde_json::to_value(&coins).unwrap();

    let test = TestFixture::start(
        MockHeadNode::new(),
        StaticQueryApi::with_snapshot(json!({ "utxo": utxo })),
        RecordingBuilder::new(),
    )
    .await;
    let plain = test.client.read_coin_snapshot().await.unwrap();
    assert_eq!(plain, coins);

    test.query.set_snapshot(json!({ "initialUTxO": utxo }));
    assert_eq!(test.client.read_coin_snapshot().await.unwrap(), coins);

    test.query
        .set_snapshot(json!({ "snapshot": { "number": 7, "utxo": utxo } }));
    assert_eq!(test.client.read_coin_snapshot().await.unwrap(), coins);

    test.query.set_snapshot(json!({ "tag": "Unknown" }));
    assert!(test.client.read_coin_snapshot().await.unwrap().is_empty());
}

/// Test a snapshot with a malformed coin key → error, not an empty Head
#[tokio::test]
async fn test_malformed_snapshot_key_is_an_error() {
    let bad = json!({
        "utxo": { "not-an-input": { "address": "addr_test1x", "value": { "lovelace": 1 } } }
    });
    let test = TestFixture::start(
        MockHeadNode::new(),
        StaticQueryApi::with_snapshot(bad),
        RecordingBuilder::new(),
    )
    .await;

    assert!(test.client.read_coin_snapshot().await.is_err());
}

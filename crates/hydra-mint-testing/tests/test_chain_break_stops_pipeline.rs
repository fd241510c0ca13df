use hydra_mint_batch_tx::{MintRun, PipelineError};
use hydra_mint_client::HeadClientConfig;
use hydra_mint_sdk::TxIn;
use hydra_mint_testing::{
    test_coin, tx_id_for, MockHeadNode, RecordingBuilder, StaticQueryApi, TestFixture, Verdict,
    MOCK_HEAD_URL,
};
use std::time::Duration;

/// Test a rejected batch in the middle of a run → ChainBroken
///
/// Should test:
/// - Fund the Head with a single fuel coin
/// - Script the node to accept batch 1 and reject batch 2
/// - Verify the run stops at batch 2 with the node's reason
/// - Verify batch 3 is never built or submitted
/// - Verify the checkpoint still points at batch 1's fuel output
#[tokio::test]
async fn test_chain_break_stops_pipeline() {
    let node = MockHeadNode::new().with_verdicts([
        Verdict::Valid,
        Verdict::Invalid("BadInputsUTxO".to_string()),
    ]);
    let query = StaticQueryApi::with_coins(&[test_coin(1, 0, 100_000_000)]);
    let mut test = TestFixture::start(node, query, RecordingBuilder::new()).await;

    let pipeline = test.pipeline();
    let report = pipeline
        .run(&mut test.client, &MintRun::new("HydraNFT", 30, 10))
        .await;

    assert_eq!(report.total_batches, 3);
    assert_eq!(report.completed_batches, 1);
    assert!(!report.is_complete());
    match &report.stop {
        Some(PipelineError::ChainBroken { batch, reason }) => {
            assert_eq!(*batch, 1);
            assert_eq!(reason, "BadInputsUTxO");
        }
        other => panic!("Expected ChainBroken at batch 1, got {other:?}"),
    }

    assert_eq!(test.builder.build_requests().len(), 2);
    assert_eq!(test.node.submitted(), vec![tx_id_for(1), tx_id_for(2)]);

    let checkpoint = report.checkpoint.expect("checkpoint after batch 1");
    assert_eq!(checkpoint.fuel_input(), TxIn::new(tx_id_for(1), 1));
    assert_eq!(checkpoint.next_batch, 1);
}

/// Test a batch the node never answers → ChainBroken after the confirm timeout
///
/// Should test:
/// - Script the node to stay silent on the first batch
/// - Verify the run stops at batch 1 without building batch 2
#[tokio::test(start_paused = true)]
async fn test_silent_node_breaks_chain() {
    let node = MockHeadNode::new().with_verdicts([Verdict::Silent]);
    let query = StaticQueryApi::with_coins(&[test_coin(1, 0, 100_000_000)]);
    let config = HeadClientConfig {
        confirm_timeout: Duration::from_secs(2),
        ..HeadClientConfig::new(MOCK_HEAD_URL)
    };
    let mut test =
        TestFixture::start_with_config(node, query, RecordingBuilder::new(), config).await;

    let pipeline = test.pipeline();
    let report = pipeline
        .run(&mut test.client, &MintRun::new("HydraNFT", 20, 10))
        .await;

    assert_eq!(report.completed_batches, 0);
    assert!(matches!(
        report.stop,
        Some(PipelineError::ChainBroken { batch: 0, .. })
    ));
    assert_eq!(test.builder.build_requests().len(), 1);
}

/// Test a signing failure mid-run → Sign error, nothing after it submitted
///
/// Should test:
/// - Make the second sign call fail
/// - Verify batch 1 is accepted and batch 2 never reaches the node
#[tokio::test]
async fn test_sign_failure_stops_pipeline() {
    let query = StaticQueryApi::with_coins(&[test_coin(1, 0, 100_000_000)]);
    let builder = RecordingBuilder::new().failing_sign_at(2);
    let mut test = TestFixture::start(MockHeadNode::new(), query, builder).await;

    let pipeline = test.pipeline();
    let report = pipeline
        .run(&mut test.client, &MintRun::new("HydraNFT", 30, 10))
        .await;

    assert_eq!(report.completed_batches, 1);
    assert!(matches!(report.stop, Some(PipelineError::Sign { batch: 1, .. })));
    assert_eq!(test.node.submitted(), vec![tx_id_for(1)]);
}

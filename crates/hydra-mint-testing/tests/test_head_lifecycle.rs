use hydra_mint_client::HeadStatus;
use hydra_mint_testing::{MockHeadNode, RecordingBuilder, StaticQueryApi, TestFixture};
use std::time::Duration;

/// Test driving a Head from Idle to Final
///
/// Should test:
/// - Read the status from the Greetings sent on connect
/// - Init, Close and Fanout, each confirmed by its event
/// - Verify unrelated events in between are skipped
/// - Verify the observed status follows every transition
#[tokio::test]
async fn test_head_lifecycle_happy_path() {
    let node = MockHeadNode::new().with_greeting("Idle").with_noise(3);
    let mut test = TestFixture::start(node, StaticQueryApi::default(), RecordingBuilder::new()).await;

    assert_eq!(test.client.await_greetings().await.unwrap(), Some(HeadStatus::Idle));
    assert_eq!(test.client.observed_status(), HeadStatus::Idle);

    assert!(test.client.init_head().await.unwrap());
    assert_eq!(test.client.observed_status(), HeadStatus::Initializing);

    assert!(test.client.close_head().await.unwrap());
    assert_eq!(test.client.observed_status(), HeadStatus::Closed);

    assert!(test.client.fanout_head().await.unwrap());
    assert_eq!(test.client.observed_status(), HeadStatus::Final);

    assert_eq!(test.node.command_tags(), vec!["Init", "Close", "Fanout"]);
}

/// Test aborting an initializing Head returns it to Idle
///
/// Should test:
/// - Init, then Abort before any commit
/// - Verify the observed status is Idle again
#[tokio::test]
async fn test_abort_returns_head_to_idle() {
    let node = MockHeadNode::new().with_greeting("Idle");
    let mut test = TestFixture::start(node, StaticQueryApi::default(), RecordingBuilder::new()).await;

    assert!(test.client.init_head().await.unwrap());
    assert!(test.client.abort_head().await.unwrap());
    assert_eq!(test.client.observed_status(), HeadStatus::Idle);
}

/// Test a command the node refuses → CommandFailed, reported as `false`
///
/// Should test:
/// - Open with the node in the Open state and rejecting Fanout
/// - Verify fanout_head returns false without an error
/// - Verify the observed status is unchanged
#[tokio::test]
async fn test_rejected_command_returns_false() {
    let node = MockHeadNode::new()
        .with_greeting("Open")
        .rejecting("Fanout");
    let mut test = TestFixture::start(node, StaticQueryApi::default(), RecordingBuilder::new()).await;

    assert_eq!(test.client.await_greetings().await.unwrap(), Some(HeadStatus::Open));
    assert!(!test.client.fanout_head().await.unwrap());
    assert_eq!(test.client.observed_status(), HeadStatus::Open);
}

/// Test waiting for an event that never comes → None at the deadline
///
/// Should test:
/// - Connect to a node sending only its greeting
/// - Verify wait_for_event returns None rather than an error
/// - Verify the greeting consumed on the way still updates the status
#[tokio::test(start_paused = true)]
async fn test_wait_for_missing_event_times_out() {
    let node = MockHeadNode::new().with_greeting("Initializing");
    let mut test = TestFixture::start(node, StaticQueryApi::default(), RecordingBuilder::new()).await;

    let event = test
        .client
        .wait_for_event("HeadIsOpen", Duration::from_secs(12))
        .await
        .unwrap();
    assert!(event.is_none());
    assert_eq!(test.client.observed_status(), HeadStatus::Initializing);
}

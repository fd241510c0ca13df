use ciborium::value::{Integer, Value};
use hydra_mint_batch_tx::{commit_funds, CommitError};
use hydra_mint_sdk::FundingPolicy;
use hydra_mint_testing::{
    test_coin, BuilderCall, MockHeadNode, RecordingBuilder, StaticQueryApi, TestFixture,
};

const CHANGE_ADDRESS_HEX: &str = "60a1b2c3d4e5f60718293a4b5c6d7e8f90a1b2c3d4e5f60718293a4b5c";

fn int(n: u64) -> Value {
    Value::Integer(Integer::from(n))
}

/// Unbalanced commit draft spending `commit_tx#0` into the Head script
fn commit_draft(commit_tx: &[u8]) -> String {
    let input = Value::Array(vec![Value::Bytes(commit_tx.to_vec()), int(0)]);
    let script_output = Value::Array(vec![Value::Bytes(vec![0x70; 29]), int(20_000_000)]);
    let body = Value::Map(vec![
        (int(0), Value::Tag(258, Box::new(Value::Array(vec![input])))),
        (int(1), Value::Array(vec![script_output])),
        (int(2), int(0)),
    ]);
    let tx = Value::Array(vec![body, Value::Map(vec![]), Value::Bool(true), Value::Null]);

    let mut bytes = Vec::new();
    ciborium::ser::into_writer(&tx, &mut bytes).unwrap();
    hex::encode(bytes)
}

fn body_entry(tx: &Value, key: u64) -> Value {
    let body = tx.as_array().unwrap()[0].as_map().unwrap();
    body.iter()
        .find(|(k, _)| k.as_integer() == Some(Integer::from(key)))
        .map(|(_, v)| v.clone())
        .unwrap()
}

/// Test moving a base-ledger coin into the Head
///
/// Should test:
/// - Offer a dust coin, a mid-sized coin and a large coin
/// - Verify the mid-sized coin is committed and the large one pays the fee
/// - Verify the draft is balanced with the fee input, collateral and change
/// - Verify the balanced transaction is signed and submitted on the base ledger
#[tokio::test]
async fn test_commit_funds_balances_signs_and_submits() {
    let dust = test_coin(1, 0, 3_000_000);
    let commit = test_coin(2, 0, 20_000_000);
    let fee = test_coin(3, 1, 60_000_000);

    let query = StaticQueryApi::default().with_draft(commit_draft(&[0x02; 32]));
    let test = TestFixture::start(MockHeadNode::new(), query, RecordingBuilder::new()).await;

    let policy = FundingPolicy::default();
    let receipt = commit_funds(
        &test.client,
        test.builder.as_ref(),
        &[dust, commit.clone(), fee.clone()],
        CHANGE_ADDRESS_HEX,
        &policy,
    )
    .await
    .unwrap();

    assert_eq!(receipt.selection.commit, commit);
    assert_eq!(receipt.selection.fee, fee);

    let requests = test.query.commit_requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].get(&commit.input).is_some());
    assert_eq!(requests[0].len(), 1);

    let bytes = hex::decode(&receipt.signed.cbor_hex).unwrap();
    let tx: Value = ciborium::de::from_reader(bytes.as_slice()).unwrap();

    let fee_input = Value::Array(vec![Value::Bytes(vec![0x03; 32]), int(1)]);
    match body_entry(&tx, 0) {
        Value::Tag(258, inputs) => assert_eq!(inputs.as_array().unwrap()[1], fee_input),
        other => panic!("Expected tagged inputs, got {other:?}"),
    }
    match body_entry(&tx, 13) {
        Value::Tag(258, collateral) => {
            assert_eq!(*collateral, Value::Array(vec![fee_input.clone()]))
        }
        other => panic!("Expected tagged collateral, got {other:?}"),
    }
    let outputs = body_entry(&tx, 1);
    assert_eq!(
        outputs.as_array().unwrap()[1],
        Value::Array(vec![
            Value::Bytes(hex::decode(CHANGE_ADDRESS_HEX).unwrap()),
            int(60_000_000 - policy.fixed_fee),
        ])
    );
    assert_eq!(body_entry(&tx, 2), int(policy.fixed_fee));

    let calls = test.builder.calls();
    assert_eq!(calls.len(), 2);
    assert!(matches!(&calls[0], BuilderCall::Sign(cbor) if *cbor == receipt.signed.cbor_hex));
    assert_eq!(test.builder.submitted(), vec![receipt.signed.cbor_hex.clone()]);
}

/// Test a node that refuses to draft the commit → DraftRefused, nothing signed
#[tokio::test]
async fn test_commit_funds_draft_refused() {
    let test = TestFixture::start(
        MockHeadNode::new(),
        StaticQueryApi::default(),
        RecordingBuilder::new(),
    )
    .await;

    let result = commit_funds(
        &test.client,
        test.builder.as_ref(),
        &[test_coin(2, 0, 20_000_000), test_coin(3, 1, 60_000_000)],
        CHANGE_ADDRESS_HEX,
        &FundingPolicy::default(),
    )
    .await;

    assert!(matches!(result, Err(CommitError::DraftRefused)));
    assert!(test.builder.calls().is_empty());
}

/// Test a holder with a single usable coin → selection error before any request
#[tokio::test]
async fn test_commit_funds_needs_a_fee_coin() {
    let test = TestFixture::start(
        MockHeadNode::new(),
        StaticQueryApi::default(),
        RecordingBuilder::new(),
    )
    .await;

    let result = commit_funds(
        &test.client,
        test.builder.as_ref(),
        &[test_coin(1, 0, 1_000_000), test_coin(2, 0, 20_000_000)],
        CHANGE_ADDRESS_HEX,
        &FundingPolicy::default(),
    )
    .await;

    assert!(matches!(result, Err(CommitError::Selection(_))));
    assert!(test.query.commit_requests().is_empty());
}

/*!
# Commit Funding

Coin selection and balancing for the one-off funding step that moves a
base-ledger coin into the Head.

## Selection Policy

- Coins below the dust floor are ignored.
- The **commit coin** is the smallest coin inside the commit range; if none
  fits, the smallest coin overall. Small commits keep the larger coins on the
  base ledger as fuel for the Head's own L1 transactions.
- The **fee coin** is the smallest other coin at or above the dust floor.

## Balancing

The Head node drafts a commit transaction with no fee. Balancing appends the
fee coin as an input, optionally sets it as collateral, sends the change back
to the holder and sets a fixed fee. A draft that already carries a fee is
returned untouched.

The fee is a fixed constant, not derived from the transaction size.
*/

use crate::ledger::{Coin, TxIn};
use ciborium::value::{Integer, Value};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Transaction body map keys
const BODY_INPUTS: u64 = 0;
const BODY_OUTPUTS: u64 = 1;
const BODY_FEE: u64 = 2;
const BODY_COLLATERAL: u64 = 13;

/// CBOR tag for sets (Conway)
const SET_TAG: u64 = 258;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FundingError {
    #[error("No coin available to commit")]
    NoCommitCandidate,

    #[error("No separate fee coin at or above {dust_floor} lovelace")]
    NoFeeCoin { dust_floor: u64 },

    #[error(
        "Insufficient funds for fee and minimum output: fee coin {available}, fee {fee}, min output {min_output}"
    )]
    InsufficientFunds {
        available: u64,
        fee: u64,
        min_output: u64,
    },

    #[error("CBOR error: {0}")]
    Cbor(String),

    #[error("Invalid address: {0}")]
    Address(String),

    #[error("Malformed draft transaction: {0}")]
    MalformedDraft(String),
}

pub type FundingResult<T> = Result<T, FundingError>;

/// Thresholds for selecting and balancing a commit, in lovelace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FundingPolicy {
    /// Coins below this value are never selected
    pub dust_floor: u64,
    /// Preferred commit range, inclusive
    pub commit_min: u64,
    pub commit_max: u64,
    /// Fee set on the balanced commit transaction
    pub fixed_fee: u64,
    /// Smallest change output the ledger accepts
    pub min_output: u64,
}

impl Default for FundingPolicy {
    fn default() -> Self {
        Self {
            dust_floor: 5_000_000,
            commit_min: 10_000_000,
            commit_max: 150_000_000,
            fixed_fee: 300_000,
            min_output: 1_000_000,
        }
    }
}

/// Coins chosen for a funding event
#[derive(Debug, Clone, PartialEq)]
pub struct FundingSelection {
    pub commit: Coin,
    pub fee: Coin,
}

/// Choose the commit coin and the fee coin from the holder's base-ledger coins
pub fn select_funding_coins(
    coins: &[Coin],
    policy: &FundingPolicy,
) -> FundingResult<FundingSelection> {
    let mut candidates: Vec<&Coin> = coins
        .iter()
        .filter(|coin| coin.lovelace() >= policy.dust_floor)
        .collect();
    candidates.sort_by(|a, b| {
        a.lovelace()
            .cmp(&b.lovelace())
            .then_with(|| a.input.cmp(&b.input))
    });

    let commit = candidates
        .iter()
        .find(|coin| (policy.commit_min..=policy.commit_max).contains(&coin.lovelace()))
        .or_else(|| candidates.first())
        .ok_or(FundingError::NoCommitCandidate)?;

    let fee = candidates
        .iter()
        .find(|coin| coin.input != commit.input)
        .ok_or(FundingError::NoFeeCoin {
            dust_floor: policy.dust_floor,
        })?;

    debug!(
        "Selected commit coin {} ({} lovelace) and fee coin {} ({} lovelace)",
        commit.input,
        commit.lovelace(),
        fee.input,
        fee.lovelace()
    );

    Ok(FundingSelection {
        commit: (*commit).clone(),
        fee: (*fee).clone(),
    })
}

/// Balance a drafted commit transaction
///
/// # Arguments
///
/// * `draft_cbor_hex` - the draft returned by the Head node
/// * `fee_coin` - coin paying the fee; appended as an input
/// * `collateral` - optional coin set as the sole collateral input
/// * `change_address` - bech32 (or hex) address receiving the change
/// * `policy` - fixed fee and minimum output
///
/// # Errors
///
/// * `InsufficientFunds` - if `fee_coin - fixed_fee` is below `min_output`
pub fn balance_commit_tx(
    draft_cbor_hex: &str,
    fee_coin: &Coin,
    collateral: Option<&Coin>,
    change_address: &str,
    policy: &FundingPolicy,
) -> FundingResult<String> {
    let mut tx = decode_tx(draft_cbor_hex)?;
    let body = tx_body_mut(&mut tx)?;

    let current_fee = body_fee(body)?;
    if current_fee > 0 {
        debug!("Draft already balanced (fee {}), leaving it unchanged", current_fee);
        return Ok(draft_cbor_hex.to_string());
    }

    let available = fee_coin.lovelace();
    let change = available
        .checked_sub(policy.fixed_fee)
        .filter(|change| *change >= policy.min_output)
        .ok_or(FundingError::InsufficientFunds {
            available,
            fee: policy.fixed_fee,
            min_output: policy.min_output,
        })?;

    let inputs_tagged = push_input(body, &fee_coin.input)?;
    if let Some(collateral) = collateral {
        let collateral_set = wrap_set(vec![encode_input(&collateral.input)?], inputs_tagged);
        set_body_entry(body, BODY_COLLATERAL, collateral_set);
    }

    let address = decode_address(change_address)?;
    outputs_mut(body)?.push(Value::Array(vec![
        Value::Bytes(address),
        Value::Integer(Integer::from(change)),
    ]));
    set_body_entry(body, BODY_FEE, Value::Integer(Integer::from(policy.fixed_fee)));

    info!(
        "Balanced commit transaction: fee {} lovelace, change {} lovelace",
        policy.fixed_fee, change
    );

    encode_tx(&tx)
}

// ================================================================================================
// CBOR helpers
// ================================================================================================

fn decode_tx(cbor_hex: &str) -> FundingResult<Value> {
    let bytes = hex::decode(cbor_hex.trim())
        .map_err(|e| FundingError::Cbor(format!("invalid hex: {}", e)))?;
    ciborium::de::from_reader(bytes.as_slice()).map_err(|e| FundingError::Cbor(e.to_string()))
}

fn encode_tx(tx: &Value) -> FundingResult<String> {
    let mut bytes = Vec::new();
    ciborium::ser::into_writer(tx, &mut bytes).map_err(|e| FundingError::Cbor(e.to_string()))?;
    Ok(hex::encode(bytes))
}

fn tx_body_mut(tx: &mut Value) -> FundingResult<&mut Vec<(Value, Value)>> {
    tx.as_array_mut()
        .and_then(|parts| parts.first_mut())
        .and_then(Value::as_map_mut)
        .ok_or_else(|| FundingError::MalformedDraft("transaction body is not a map".to_string()))
}

fn body_entry_mut(body: &mut [(Value, Value)], key: u64) -> Option<&mut Value> {
    body.iter_mut()
        .find(|(k, _)| k.as_integer() == Some(Integer::from(key)))
        .map(|(_, v)| v)
}

fn set_body_entry(body: &mut Vec<(Value, Value)>, key: u64, value: Value) {
    match body_entry_mut(body, key) {
        Some(existing) => *existing = value,
        None => body.push((Value::Integer(Integer::from(key)), value)),
    }
}

fn body_fee(body: &mut [(Value, Value)]) -> FundingResult<u64> {
    match body_entry_mut(body, BODY_FEE) {
        None => Ok(0),
        Some(value) => value
            .as_integer()
            .and_then(|fee| u64::try_from(fee).ok())
            .ok_or_else(|| FundingError::MalformedDraft("fee is not an unsigned integer".into())),
    }
}

/// Append an input; returns whether the input set uses the Conway set tag
fn push_input(body: &mut Vec<(Value, Value)>, input: &TxIn) -> FundingResult<bool> {
    let encoded = encode_input(input)?;
    let inputs = body_entry_mut(body, BODY_INPUTS)
        .ok_or_else(|| FundingError::MalformedDraft("missing inputs".to_string()))?;

    match inputs {
        Value::Array(items) => {
            items.push(encoded);
            Ok(false)
        }
        Value::Tag(SET_TAG, inner) => match &mut **inner {
            Value::Array(items) => {
                items.push(encoded);
                Ok(true)
            }
            _ => Err(FundingError::MalformedDraft("tagged inputs are not an array".into())),
        },
        _ => Err(FundingError::MalformedDraft("inputs are not an array".into())),
    }
}

fn outputs_mut(body: &mut [(Value, Value)]) -> FundingResult<&mut Vec<Value>> {
    body_entry_mut(body, BODY_OUTPUTS)
        .and_then(Value::as_array_mut)
        .ok_or_else(|| FundingError::MalformedDraft("outputs are not an array".to_string()))
}

fn encode_input(input: &TxIn) -> FundingResult<Value> {
    let tx_id = hex::decode(&input.tx_id)
        .map_err(|e| FundingError::MalformedDraft(format!("tx id {}: {}", input.tx_id, e)))?;
    Ok(Value::Array(vec![
        Value::Bytes(tx_id),
        Value::Integer(Integer::from(input.index)),
    ]))
}

fn wrap_set(items: Vec<Value>, tagged: bool) -> Value {
    if tagged {
        Value::Tag(SET_TAG, Box::new(Value::Array(items)))
    } else {
        Value::Array(items)
    }
}

/// Raw address bytes from a bech32 address, or from hex as a fallback
fn decode_address(address: &str) -> FundingResult<Vec<u8>> {
    match bech32::decode(address) {
        Ok((_, bytes)) => Ok(bytes),
        Err(bech32_err) => hex::decode(address)
            .map_err(|_| FundingError::Address(format!("{}: {}", address, bech32_err))),
    }
}

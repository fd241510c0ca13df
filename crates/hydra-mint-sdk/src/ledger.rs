/*!
# Ledger Data Model

Coins as the Head node and the chain indexer report them. Both speak JSON,
but with slightly different value shapes:

- Head: `{"lovelace": 10000000, "<policy>": {"<name hex>": 1}}` or a bare integer
- Indexer: `{"ada": {"lovelace": 10000000}, "<policy>": {"<name hex>": 1}}`

Both normalize into [`Value`].
*/

use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Invalid coin reference (expected <txId>#<index>): {0}")]
    InvalidCoinRef(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Reference to a transaction output: `(transactionId, outputIndex)`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TxIn {
    pub tx_id: String,
    pub index: u32,
}

impl TxIn {
    pub fn new(tx_id: impl Into<String>, index: u32) -> Self {
        Self {
            tx_id: tx_id.into(),
            index,
        }
    }
}

impl fmt::Display for TxIn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.tx_id, self.index)
    }
}

impl FromStr for TxIn {
    type Err = LedgerError;

    fn from_str(s: &str) -> LedgerResult<Self> {
        let (tx_id, index) = s
            .split_once('#')
            .ok_or_else(|| LedgerError::InvalidCoinRef(s.to_string()))?;
        if tx_id.is_empty() {
            return Err(LedgerError::InvalidCoinRef(s.to_string()));
        }
        let index = index
            .parse::<u32>()
            .map_err(|_| LedgerError::InvalidCoinRef(s.to_string()))?;
        Ok(Self::new(tx_id, index))
    }
}

impl Serialize for TxIn {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TxIn {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// A single native asset under a minting policy
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssetId {
    pub policy_id: String,
    /// Human-readable asset name (hex-encoded on the wire)
    pub name: String,
}

impl AssetId {
    pub fn new(policy_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            policy_id: policy_id.into(),
            name: name.into(),
        }
    }

    pub fn name_hex(&self) -> String {
        hex::encode(self.name.as_bytes())
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.policy_id, self.name_hex())
    }
}

/// Base-currency amount plus an optional multi-asset bundle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Value {
    pub lovelace: u64,
    /// policy id -> asset name (hex) -> quantity
    pub assets: BTreeMap<String, BTreeMap<String, u64>>,
}

impl Value {
    pub fn lovelace(lovelace: u64) -> Self {
        Self {
            lovelace,
            assets: BTreeMap::new(),
        }
    }

    pub fn is_pure_lovelace(&self) -> bool {
        self.assets.values().all(|names| names.is_empty())
    }

    pub fn asset_count(&self) -> usize {
        self.assets.values().map(|names| names.len()).sum()
    }

    pub fn add_asset(&mut self, asset: &AssetId, quantity: u64) {
        *self
            .assets
            .entry(asset.policy_id.clone())
            .or_default()
            .entry(asset.name_hex())
            .or_default() += quantity;
    }

    fn from_json_map(map: BTreeMap<String, serde_json::Value>) -> LedgerResult<Self> {
        let mut value = Value::default();
        for (key, entry) in map {
            match key.as_str() {
                "lovelace" => value.lovelace = json_u64(&entry)?,
                "ada" => {
                    value.lovelace = entry
                        .get("lovelace")
                        .map(json_u64)
                        .transpose()?
                        .unwrap_or(0)
                }
                policy => {
                    let names = entry.as_object().ok_or_else(|| {
                        LedgerError::InvalidValue(format!("policy {policy} is not an object"))
                    })?;
                    let mut quantities = BTreeMap::new();
                    for (name, quantity) in names {
                        quantities.insert(name.clone(), json_u64(quantity)?);
                    }
                    value.assets.insert(policy.to_string(), quantities);
                }
            }
        }
        Ok(value)
    }
}

fn json_u64(value: &serde_json::Value) -> LedgerResult<u64> {
    value
        .as_u64()
        .ok_or_else(|| LedgerError::InvalidValue(format!("expected unsigned integer, got {value}")))
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1 + self.assets.len()))?;
        map.serialize_entry("lovelace", &self.lovelace)?;
        for (policy, names) in &self.assets {
            map.serialize_entry(policy, names)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Coin(u64),
            Bundle(BTreeMap<String, serde_json::Value>),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Coin(lovelace) => Ok(Value::lovelace(lovelace)),
            Repr::Bundle(map) => Value::from_json_map(map).map_err(de::Error::custom),
        }
    }
}

/// Output body: owner, value and optional datum/script attachments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxOut {
    pub address: String,
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datum: Option<serde_json::Value>,
    #[serde(
        default,
        rename = "datumhash",
        alias = "datumHash",
        skip_serializing_if = "Option::is_none"
    )]
    pub datum_hash: Option<String>,
    #[serde(
        default,
        rename = "inlineDatum",
        skip_serializing_if = "Option::is_none"
    )]
    pub inline_datum: Option<serde_json::Value>,
    #[serde(
        default,
        rename = "referenceScript",
        alias = "script",
        skip_serializing_if = "Option::is_none"
    )]
    pub reference_script: Option<serde_json::Value>,
}

impl TxOut {
    pub fn new(address: impl Into<String>, value: Value) -> Self {
        Self {
            address: address.into(),
            value,
            datum: None,
            datum_hash: None,
            inline_datum: None,
            reference_script: None,
        }
    }
}

/// An unspent output together with its reference
#[derive(Debug, Clone, PartialEq)]
pub struct Coin {
    pub input: TxIn,
    pub output: TxOut,
}

impl Coin {
    pub fn new(input: TxIn, output: TxOut) -> Self {
        Self { input, output }
    }

    pub fn lovelace(&self) -> u64 {
        self.output.value.lovelace
    }

    pub fn address(&self) -> &str {
        &self.output.address
    }
}

/// Coin set keyed by `"<txId>#<index>"`, the shape used by the Head API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UtxoSet(BTreeMap<TxIn, TxOut>);

impl UtxoSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn insert(&mut self, coin: Coin) {
        self.0.insert(coin.input, coin.output);
    }

    pub fn get(&self, input: &TxIn) -> Option<&TxOut> {
        self.0.get(input)
    }

    pub fn coins(&self) -> impl Iterator<Item = Coin> + '_ {
        self.0
            .iter()
            .map(|(input, output)| Coin::new(input.clone(), output.clone()))
    }

    /// Highest-lovelace coin; ties resolve to the lowest reference
    pub fn largest(&self) -> Option<Coin> {
        highest_lovelace(self.coins())
    }

    /// Highest-lovelace coin carrying no native assets
    pub fn largest_pure_lovelace(&self) -> Option<Coin> {
        highest_lovelace(self.coins().filter(|coin| coin.output.value.is_pure_lovelace()))
    }

    /// Native assets held across all coins, counted per distinct name
    pub fn asset_count(&self) -> usize {
        self.0.values().map(|out| out.value.asset_count()).sum()
    }

    pub fn total_lovelace(&self) -> u64 {
        self.0.values().map(|out| out.value.lovelace).sum()
    }
}

fn highest_lovelace(coins: impl Iterator<Item = Coin>) -> Option<Coin> {
    coins.fold(None, |best: Option<Coin>, coin| match best {
        Some(b) if b.lovelace() >= coin.lovelace() => Some(b),
        _ => Some(coin),
    })
}

impl FromIterator<Coin> for UtxoSet {
    fn from_iter<I: IntoIterator<Item = Coin>>(iter: I) -> Self {
        let mut set = UtxoSet::new();
        for coin in iter {
            set.insert(coin);
        }
        set
    }
}

/// Output to be created by a transaction under construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSpec {
    pub address: String,
    pub lovelace: u64,
    pub assets: Vec<(AssetId, u64)>,
}

impl OutputSpec {
    pub fn lovelace_only(address: impl Into<String>, lovelace: u64) -> Self {
        Self {
            address: address.into(),
            lovelace,
            assets: Vec::new(),
        }
    }
}

/// Text envelope used by the ledger tooling for raw and signed transactions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "cborHex")]
    pub cbor_hex: String,
}

impl TxEnvelope {
    pub const SIGNED_KIND: &'static str = "Tx ConwayEra";

    pub fn signed(cbor_hex: impl Into<String>) -> Self {
        Self {
            kind: Self::SIGNED_KIND.to_string(),
            description: String::new(),
            cbor_hex: cbor_hex.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tx_in_round_trip_through_display() {
        let input: TxIn = "abc123#7".parse().unwrap();
        assert_eq!(input, TxIn::new("abc123", 7));
        assert_eq!(input.to_string(), "abc123#7");
    }

    #[test]
    fn test_tx_in_rejects_missing_separator() {
        assert_eq!(
            "badhash".parse::<TxIn>(),
            Err(LedgerError::InvalidCoinRef("badhash".to_string()))
        );
        assert!("#1".parse::<TxIn>().is_err());
        assert!("abc#x".parse::<TxIn>().is_err());
    }

    #[test]
    fn test_value_accepts_head_indexer_and_integer_shapes() {
        let head: Value = serde_json::from_value(json!({"lovelace": 5_000_000})).unwrap();
        let indexer: Value =
            serde_json::from_value(json!({"ada": {"lovelace": 5_000_000}})).unwrap();
        let bare: Value = serde_json::from_value(json!(5_000_000)).unwrap();

        assert_eq!(head, Value::lovelace(5_000_000));
        assert_eq!(indexer, head);
        assert_eq!(bare, head);
    }

    #[test]
    fn test_value_with_assets() {
        let value: Value = serde_json::from_value(json!({
            "lovelace": 2_000_000,
            "b7d5": {"4879647261": 1, "4e4654": 3}
        }))
        .unwrap();

        assert_eq!(value.lovelace, 2_000_000);
        assert_eq!(value.asset_count(), 2);
        assert!(!value.is_pure_lovelace());
        assert_eq!(value.assets["b7d5"]["4e4654"], 3);

        let encoded = serde_json::to_value(&value).unwrap();
        assert_eq!(encoded["lovelace"], 2_000_000);
        assert_eq!(encoded["b7d5"]["4879647261"], 1);
    }

    #[test]
    fn test_asset_id_hex_name() {
        let asset = AssetId::new("b7d5", "Hydra_0");
        assert_eq!(asset.name_hex(), "48796472615f30");
        assert_eq!(asset.to_string(), "b7d5.48796472615f30");
    }

    #[test]
    fn test_utxo_set_largest() {
        let set: UtxoSet = serde_json::from_value(json!({
            "aa#0": {"address": "addr_test1a", "value": {"lovelace": 10}},
            "bb#1": {"address": "addr_test1b", "value": {"lovelace": 500}},
            "cc#2": {"address": "addr_test1c", "value": 20}
        }))
        .unwrap();

        assert_eq!(set.len(), 3);
        assert_eq!(set.total_lovelace(), 530);
        let largest = set.largest().unwrap();
        assert_eq!(largest.input, TxIn::new("bb", 1));
        assert_eq!(largest.address(), "addr_test1b");
    }

    #[test]
    fn test_utxo_set_largest_pure_lovelace_skips_asset_coins() {
        let mut set: UtxoSet = serde_json::from_value(json!({
            "aa#0": {"address": "addr_test1a", "value": {"lovelace": 60}},
            "bb#1": {"address": "addr_test1b", "value": {"lovelace": 50}}
        }))
        .unwrap();
        let mut rich = set.get(&TxIn::new("aa", 0)).unwrap().clone();
        rich.value.add_asset(&AssetId::new("b7d5", "Old_0"), 1);
        set.insert(Coin::new(TxIn::new("aa", 0), rich));

        assert_eq!(set.asset_count(), 1);
        assert_eq!(set.largest().unwrap().input, TxIn::new("aa", 0));
        assert_eq!(set.largest_pure_lovelace().unwrap().input, TxIn::new("bb", 1));

        let only_assets: UtxoSet = set
            .coins()
            .filter(|coin| !coin.output.value.is_pure_lovelace())
            .collect();
        assert!(only_assets.largest().is_some());
        assert!(only_assets.largest_pure_lovelace().is_none());
    }

    #[test]
    fn test_utxo_set_rejects_bad_key() {
        let result: Result<UtxoSet, _> = serde_json::from_value(json!({
            "badhash": {"address": "addr_test1a", "value": {"lovelace": 10}}
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_tx_out_optional_fields_skipped() {
        let out = TxOut::new("addr_test1", Value::lovelace(1));
        let encoded = serde_json::to_value(&out).unwrap();
        assert_eq!(encoded, json!({"address": "addr_test1", "value": {"lovelace": 1}}));
    }
}

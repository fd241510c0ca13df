use crate::error::CliResult;
use hydra_mint_batch_tx::{CardanoCliConfig, MintConfig};
use hydra_mint_sdk::FundingPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Operator configuration file structure
///
/// Every section is optional; missing fields keep their defaults.
///
/// ```yaml
/// mint:
///   policy_id: b7d525b1...
///   fuel_floor: 3000000
/// builder:
///   command: [cardano-cli]
///   testnet_magic: 42
/// funding:
///   fixed_fee: 250000
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatorConfig {
    pub mint: MintConfig,
    pub builder: CardanoCliConfig,
    pub funding: FundingPolicy,
}

impl OperatorConfig {
    /// Read the YAML file at `path`, or fall back to defaults when none is given
    pub fn load(path: Option<&Path>) -> CliResult<Self> {
        match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                Ok(serde_yaml::from_str(&raw)?)
            }
            None => Ok(Self::default()),
        }
    }
}

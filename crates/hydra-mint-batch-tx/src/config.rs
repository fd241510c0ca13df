use crate::error::{PipelineError, PipelineResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Policy and accounting constants for a mint run
///
/// The fee and reserve figures are hand-tuned for short asset names on a test
/// network. They are not derived from protocol parameters and need
/// calibration against the target network's fee formula.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MintConfig {
    /// Minting policy id (hex)
    pub policy_id: String,

    /// Fee per batch transaction: `fee_base + fee_per_asset * assets`
    pub fee_base: u64,
    pub fee_per_asset: u64,

    /// Lovelace locked with the minted assets: `reserve_base + reserve_per_asset * assets`
    pub reserve_base: u64,
    pub reserve_per_asset: u64,

    /// Smallest fuel output a batch may leave behind
    pub fuel_floor: u64,

    /// Distinct asset names carried by a single output
    pub max_assets_per_output: usize,

    /// Image written into the CIP-25 metadata of every asset
    pub image_uri: String,
}

impl Default for MintConfig {
    fn default() -> Self {
        Self {
            policy_id: String::new(),
            fee_base: 200_000,
            fee_per_asset: 30_000,
            reserve_base: 1_500_000,
            reserve_per_asset: 20_000,
            fuel_floor: 2_000_000,
            max_assets_per_output: 80,
            image_uri: "ipfs://QmHydraMint".to_string(),
        }
    }
}

impl MintConfig {
    pub fn with_policy(policy_id: impl Into<String>) -> Self {
        Self {
            policy_id: policy_id.into(),
            ..Default::default()
        }
    }

    pub fn fee_for(&self, asset_count: u64) -> PipelineResult<u64> {
        linear(self.fee_base, self.fee_per_asset, asset_count, "fee")
    }

    pub fn reserve_for(&self, asset_count: u64) -> PipelineResult<u64> {
        linear(self.reserve_base, self.reserve_per_asset, asset_count, "reserve")
    }

    pub fn validate(&self) -> PipelineResult<()> {
        if self.policy_id.len() != 56 || !self.policy_id.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(PipelineError::Config(format!(
                "policy id must be 56 hex characters, got {:?}",
                self.policy_id
            )));
        }
        if self.max_assets_per_output == 0 {
            return Err(PipelineError::Config(
                "max_assets_per_output must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn linear(base: u64, per_asset: u64, asset_count: u64, what: &str) -> PipelineResult<u64> {
    per_asset
        .checked_mul(asset_count)
        .and_then(|variable| variable.checked_add(base))
        .ok_or_else(|| {
            PipelineError::Config(format!(
                "{what} for {asset_count} assets overflows u64 ({base} + {per_asset} per asset)"
            ))
        })
}

/// How to invoke `cardano-cli` and where its inputs live
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardanoCliConfig {
    /// Program plus leading arguments, e.g. `docker compose exec cardano-node cardano-cli`
    pub command: Vec<String>,

    /// Era sub-command placed before `transaction`; empty to omit
    pub era: String,

    /// Paths as seen by the tool
    pub signing_key_file: String,
    pub policy_script_file: String,

    pub testnet_magic: u32,
    pub invalid_hereafter: Option<u64>,
    pub socket_path: Option<String>,

    /// Directory where envelopes and metadata files are written
    pub work_dir: PathBuf,

    /// The same directory as seen by the tool (differs when it runs in a container)
    pub tool_work_dir: Option<PathBuf>,
}

impl Default for CardanoCliConfig {
    fn default() -> Self {
        Self {
            command: ["docker", "compose", "exec", "cardano-node", "cardano-cli"]
                .into_iter()
                .map(String::from)
                .collect(),
            era: "latest".to_string(),
            signing_key_file: "/keys/cardano.sk".to_string(),
            policy_script_file: "/keys/policy.script".to_string(),
            testnet_magic: 1,
            invalid_hereafter: Some(200_000_000),
            socket_path: None,
            work_dir: std::env::temp_dir(),
            tool_work_dir: None,
        }
    }
}

use crate::error::BuilderResult;
use async_trait::async_trait;
use hydra_mint_sdk::{AssetId, OutputSpec, TxEnvelope, TxIn};

/// Everything the external tool needs to assemble one transaction
#[derive(Debug, Clone, PartialEq)]
pub struct BuildRequest {
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<OutputSpec>,
    /// Assets minted under the configured policy, with quantities
    pub mint: Vec<(AssetId, u64)>,
    pub fee: u64,
    /// Auxiliary metadata document (CIP-25)
    pub metadata: Option<serde_json::Value>,
}

/// Ledger transaction construction, signing and base-ledger submission
///
/// Implementations are opaque and fallible. The pipeline never retries a
/// failed call.
#[async_trait]
pub trait TxBuilder: Send + Sync {
    async fn build(&self, request: &BuildRequest) -> BuilderResult<TxEnvelope>;

    async fn sign(&self, raw: &TxEnvelope) -> BuilderResult<TxEnvelope>;

    /// Transaction id of a signed transaction
    async fn identify(&self, signed: &TxEnvelope) -> BuilderResult<String>;

    async fn submit_to_base_ledger(&self, signed: &TxEnvelope) -> BuilderResult<()>;
}

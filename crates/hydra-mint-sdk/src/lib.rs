/*!
# Hydra Mint SDK

Plain data and pure functions shared by the Head client, the batch minting
pipeline and the CLI. Nothing in this crate performs I/O.

- [`ledger`]: coins, values, coin sets and transaction envelopes
- [`asset_allocation`]: batch ranges, asset names and output chunking
- [`metadata`]: CIP-25 NFT metadata
- [`funding`]: commit coin selection and commit transaction balancing
*/

pub mod asset_allocation;
pub mod funding;
pub mod ledger;
pub mod metadata;

pub use asset_allocation::{
    allocate_asset_outputs, asset_names, batch_ranges, output_count, split_lovelace,
    AllocationError, AllocationResult,
};
pub use funding::{
    balance_commit_tx, select_funding_coins, FundingError, FundingPolicy, FundingResult,
    FundingSelection,
};
pub use ledger::{
    AssetId, Coin, LedgerError, LedgerResult, OutputSpec, TxEnvelope, TxIn, TxOut, UtxoSet, Value,
};
pub use metadata::nft_metadata;

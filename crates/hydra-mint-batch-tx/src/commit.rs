/*!
# Head Funding

Moves one base-ledger coin into the Head: pick the commit and fee coins, ask
the node for a draft commit transaction, balance it with the fee coin (also
used as collateral), then sign and submit it on the base ledger.
*/

use crate::{builder::TxBuilder, error::BuilderError};
use hydra_mint_client::{ClientError, HeadClient};
use hydra_mint_sdk::{
    balance_commit_tx, select_funding_coins, Coin, FundingError, FundingPolicy, FundingSelection,
    TxEnvelope,
};
use thiserror::Error;
use tracing::info;

pub type CommitResult<T> = Result<T, CommitError>;

#[derive(Error, Debug)]
pub enum CommitError {
    #[error("Coin selection failed: {0}")]
    Selection(#[source] FundingError),

    #[error("Balancing failed: {0}")]
    Balancing(#[source] FundingError),

    #[error("Head node refused to draft the commit transaction")]
    DraftRefused,

    #[error("Head client error: {0}")]
    Client(#[from] ClientError),

    #[error("Failed to {step} the commit transaction: {source}")]
    Builder {
        step: &'static str,
        source: BuilderError,
    },
}

/// What was committed, and the signed transaction that did it
#[derive(Debug, Clone, PartialEq)]
pub struct CommitReceipt {
    pub selection: FundingSelection,
    pub signed: TxEnvelope,
}

/// Commit one of `coins` into the Head, returning change to `change_address`
pub async fn commit_funds(
    client: &HeadClient,
    builder: &dyn TxBuilder,
    coins: &[Coin],
    change_address: &str,
    policy: &FundingPolicy,
) -> CommitResult<CommitReceipt> {
    let selection = select_funding_coins(coins, policy).map_err(CommitError::Selection)?;
    info!(
        "Committing {} ({} lovelace), fees from {} ({} lovelace)",
        selection.commit.input,
        selection.commit.lovelace(),
        selection.fee.input,
        selection.fee.lovelace()
    );

    let draft = client
        .build_commit_draft(&selection.commit)
        .await?
        .ok_or(CommitError::DraftRefused)?;

    let balanced = balance_commit_tx(
        &draft,
        &selection.fee,
        Some(&selection.fee),
        change_address,
        policy,
    )
    .map_err(CommitError::Balancing)?;

    let signed = builder
        .sign(&TxEnvelope::signed(balanced))
        .await
        .map_err(|source| CommitError::Builder {
            step: "sign",
            source,
        })?;
    builder
        .submit_to_base_ledger(&signed)
        .await
        .map_err(|source| CommitError::Builder {
            step: "submit",
            source,
        })?;

    info!("Commit transaction submitted to the base ledger");
    Ok(CommitReceipt { selection, signed })
}

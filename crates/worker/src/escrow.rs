//! Credit escrow manager.
//!
//! A batch's credits are frozen before any remote task is created. A batch
//! that cannot be funded is closed on the spot as `failed` / `finalized`
//! with zero spend; it is never retried. A resumed batch may already hold
//! credits, so a ledger error on resume leaves it open for a later
//! invocation instead.

use vidbatch_core::settlement::unfunded_failure;
use vidbatch_db::models::batch_job::BatchJob;
use vidbatch_db::models::credit::FreezeResult;

use crate::store::{CreditLedger, JobStore};

/// Result of securing a batch's escrow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EscrowOutcome {
    /// Credits are held; remote work may start.
    Funded,
    /// The freeze was refused or errored. `closed` tells whether the batch
    /// was written as terminal.
    Unfunded { reason: String, closed: bool },
    /// The ledger errored on a resumed batch. Nothing was written; the
    /// batch should be released for retry.
    Deferred { reason: String },
}

/// Freeze `total_count * cost_per_video` for the batch.
///
/// Freezing is idempotent per batch, so a batch resumed by a later
/// invocation passes through here again without a second charge.
pub async fn secure_funds(
    store: &dyn JobStore,
    ledger: &dyn CreditLedger,
    batch: &BatchJob,
) -> EscrowOutcome {
    let required = batch.required_credits();

    let reason = match ledger.freeze(batch.id, batch.user_id, required).await {
        Ok(FreezeResult::Frozen) => {
            tracing::info!(batch_id = batch.id, user_id = batch.user_id, required, "Credits frozen");
            return EscrowOutcome::Funded;
        }
        Ok(FreezeResult::AlreadyFrozen) => {
            tracing::debug!(batch_id = batch.id, "Credits already frozen");
            return EscrowOutcome::Funded;
        }
        Ok(FreezeResult::InsufficientBalance { balance, required }) => {
            format!("Insufficient balance: {balance} available, {required} required")
        }
        Err(e) if batch.is_resumed() => {
            tracing::warn!(
                batch_id = batch.id,
                claim_count = batch.claim_count,
                error = %e,
                "Ledger unavailable for resumed batch, deferring",
            );
            return EscrowOutcome::Deferred {
                reason: format!("Ledger error: {e}"),
            };
        }
        Err(e) => format!("Ledger error: {e}"),
    };

    tracing::warn!(
        batch_id = batch.id,
        user_id = batch.user_id,
        required,
        reason = %reason,
        "Freeze failed, closing batch",
    );

    let settlement = unfunded_failure(batch.total_count, batch.cost_per_video);
    let closed = match store.settle_batch(batch.id, &settlement).await {
        Ok(written) => written,
        Err(e) => {
            tracing::error!(
                batch_id = batch.id,
                error = %e,
                "Failed to close unfunded batch",
            );
            false
        }
    };

    EscrowOutcome::Unfunded { reason, closed }
}

//! Settlement reconciler.
//!
//! Settles a batch once every task is terminal: the ledger charges only the
//! successful tasks and releases the rest, then the batch row is closed.
//! This is the only place credits are spent.

use vidbatch_core::failure::TASK_READ_FAILED;
use vidbatch_core::settlement::{abandoned_failure, settle, Settlement};
use vidbatch_db::models::batch_job::BatchJob;
use vidbatch_db::models::credit::FinalizeResult;
use vidbatch_db::models::status::VideoTaskStatus;
use vidbatch_db::models::video_task::VideoTask;

use crate::error::StoreError;
use crate::store::{CreditLedger, JobStore};

/// Settle `batch` if all of its tasks are terminal.
///
/// Returns `Ok(None)` while tasks are still pending or in flight, and when
/// another invocation has already written the settlement. Any error leaves
/// the batch unsettled for a later invocation.
pub async fn reconcile(
    store: &dyn JobStore,
    ledger: &dyn CreditLedger,
    batch: &BatchJob,
) -> Result<Option<Settlement>, StoreError> {
    let tasks = store.list_tasks(batch.id).await?;

    let succeeded = count(&tasks, VideoTaskStatus::Succeeded);
    let failed = count(&tasks, VideoTaskStatus::Failed);

    let Some(settlement) = settle(batch.total_count, batch.cost_per_video, succeeded, failed)
    else {
        tracing::debug!(
            batch_id = batch.id,
            succeeded,
            failed,
            total_count = batch.total_count,
            "Batch not ready to settle",
        );
        return Ok(None);
    };

    close(store, ledger, batch, &settlement).await
}

/// Close a funded batch whose tasks could not be read: fail it and
/// release the whole hold.
pub async fn abandon(
    store: &dyn JobStore,
    ledger: &dyn CreditLedger,
    batch: &BatchJob,
) -> Result<Option<Settlement>, StoreError> {
    tracing::warn!(batch_id = batch.id, reason = TASK_READ_FAILED, "Abandoning batch");
    let settlement = abandoned_failure(batch.total_count, batch.cost_per_video);
    close(store, ledger, batch, &settlement).await
}

/// Finalize the hold, then write the terminal batch row.
async fn close(
    store: &dyn JobStore,
    ledger: &dyn CreditLedger,
    batch: &BatchJob,
    settlement: &Settlement,
) -> Result<Option<Settlement>, StoreError> {
    match ledger
        .finalize(batch.id, batch.user_id, settlement.credits_spent)
        .await?
    {
        FinalizeResult::Settled { spent, released } => {
            tracing::info!(batch_id = batch.id, spent, released, "Hold finalized");
        }
        FinalizeResult::AlreadySettled => {
            tracing::debug!(batch_id = batch.id, "Hold already finalized");
        }
        FinalizeResult::NoHold => {
            tracing::warn!(batch_id = batch.id, "No hold to finalize");
        }
    }

    if !store.settle_batch(batch.id, settlement).await? {
        tracing::debug!(batch_id = batch.id, "Batch already settled elsewhere");
        return Ok(None);
    }

    tracing::info!(
        batch_id = batch.id,
        user_id = batch.user_id,
        status = ?settlement.outcome,
        settlement = ?settlement.kind,
        success_count = settlement.success_count,
        failed_count = settlement.failed_count,
        credits_spent = settlement.credits_spent,
        "Batch settled",
    );
    Ok(Some(*settlement))
}

fn count(tasks: &[VideoTask], status: VideoTaskStatus) -> i32 {
    tasks.iter().filter(|t| t.status() == Some(status)).count() as i32
}

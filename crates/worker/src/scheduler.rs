//! Job claim scheduler.

use vidbatch_db::models::batch_job::BatchJob;

use crate::error::WorkerError;
use crate::store::JobStore;

/// Claim up to `limit` batches for this invocation, oldest first.
///
/// The claim is a single atomic store call, so a failure leaves nothing
/// half-claimed and ends the invocation.
pub async fn claim_batches(
    store: &dyn JobStore,
    limit: i64,
    lease_secs: i64,
) -> Result<Vec<BatchJob>, WorkerError> {
    let batches = store
        .claim(limit, lease_secs)
        .await
        .map_err(WorkerError::Claim)?;

    for batch in &batches {
        tracing::info!(
            batch_id = batch.id,
            user_id = batch.user_id,
            total_count = batch.total_count,
            "Batch claimed",
        );
    }
    Ok(batches)
}

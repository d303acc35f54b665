//! Repository for the `batch_jobs` table.
//!
//! Every lifecycle write is guarded on the current status so that racing
//! worker invocations cannot move a batch backwards or settle it twice.

use sqlx::PgPool;
use vidbatch_core::settlement::Settlement;
use vidbatch_core::types::DbId;

use crate::models::batch_job::{BatchBacklog, BatchJob, CreateBatchJob};
use crate::models::status::{BatchJobStatus, SettlementStatus};

/// Column list for `batch_jobs` queries.
const COLUMNS: &str = "\
    id, user_id, status_id, settlement_status_id, \
    total_count, cost_per_video, success_count, failed_count, credits_spent, \
    claim_count, claimed_at, lease_expires_at, completed_at, created_at, updated_at";

/// Provides claim, read and settlement operations for batch jobs.
pub struct BatchJobRepo;

impl BatchJobRepo {
    /// Enqueue a batch and all of its tasks in one transaction.
    ///
    /// The batch starts `queued` / `pending`; tasks start `pending` with
    /// `batch_index` following their order in `input.tasks`.
    pub async fn create_with_tasks(
        pool: &PgPool,
        input: &CreateBatchJob,
    ) -> Result<BatchJob, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO batch_jobs (user_id, status_id, settlement_status_id, total_count, cost_per_video) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        let batch = sqlx::query_as::<_, BatchJob>(&query)
            .bind(input.user_id)
            .bind(BatchJobStatus::Queued.id())
            .bind(SettlementStatus::Pending.id())
            .bind(input.tasks.len() as i32)
            .bind(input.cost_per_video)
            .fetch_one(&mut *tx)
            .await?;

        for (index, task) in input.tasks.iter().enumerate() {
            sqlx::query(
                "INSERT INTO video_tasks \
                     (batch_job_id, batch_index, model, prompt, reference_url, aspect_ratio, duration, meta) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, COALESCE($8, '{}'::jsonb))",
            )
            .bind(batch.id)
            .bind(index as i32)
            .bind(&task.model)
            .bind(&task.prompt)
            .bind(&task.reference_url)
            .bind(&task.aspect_ratio)
            .bind(task.duration)
            .bind(&task.meta)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(batch)
    }

    /// Atomically claim up to `limit` batches for this invocation.
    ///
    /// Claimable batches are `queued` ones, plus `processing` ones whose
    /// lease has lapsed or was released by an earlier invocation. Claimed
    /// rows move to `processing` with a fresh lease of `lease_secs` and
    /// their `claim_count` bumped.
    ///
    /// Uses `FOR UPDATE SKIP LOCKED` so concurrent invocations never
    /// receive the same batch. Results are returned oldest first.
    pub async fn claim(
        pool: &PgPool,
        limit: i64,
        lease_secs: i64,
    ) -> Result<Vec<BatchJob>, sqlx::Error> {
        let query = format!(
            "UPDATE batch_jobs \
             SET status_id = $1, claim_count = claim_count + 1, claimed_at = NOW(), \
                 lease_expires_at = NOW() + make_interval(secs => $2::DOUBLE PRECISION), \
                 updated_at = NOW() \
             WHERE id IN ( \
                 SELECT id FROM batch_jobs \
                 WHERE status_id = $3 \
                    OR (status_id = $1 AND (lease_expires_at IS NULL OR lease_expires_at < NOW())) \
                 ORDER BY created_at ASC, id ASC \
                 LIMIT $4 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        let mut claimed = sqlx::query_as::<_, BatchJob>(&query)
            .bind(BatchJobStatus::Processing.id())
            .bind(lease_secs as f64)
            .bind(BatchJobStatus::Queued.id())
            .bind(limit)
            .fetch_all(pool)
            .await?;

        // RETURNING order is unspecified.
        claimed.sort_by_key(|b| (b.created_at, b.id));
        Ok(claimed)
    }

    /// Find a batch by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<BatchJob>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM batch_jobs WHERE id = $1");
        sqlx::query_as::<_, BatchJob>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Write a terminal settlement.
    ///
    /// Only applies while the batch is still `processing`. Returns `false`
    /// when another invocation already settled it.
    pub async fn settle(
        pool: &PgPool,
        id: DbId,
        settlement: &Settlement,
    ) -> Result<bool, sqlx::Error> {
        let status = BatchJobStatus::from(settlement.outcome);
        let settlement_status = SettlementStatus::from(settlement.kind);

        let result = sqlx::query(
            "UPDATE batch_jobs \
             SET status_id = $2, settlement_status_id = $3, \
                 success_count = $4, failed_count = $5, credits_spent = $6, \
                 completed_at = NOW(), lease_expires_at = NULL, updated_at = NOW() \
             WHERE id = $1 AND status_id = $7",
        )
        .bind(id)
        .bind(status.id())
        .bind(settlement_status.id())
        .bind(settlement.success_count)
        .bind(settlement.failed_count)
        .bind(settlement.credits_spent)
        .bind(BatchJobStatus::Processing.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Give up this invocation's lease on an unsettled batch so the next
    /// invocation can pick it up without waiting for expiry.
    pub async fn release_lease(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE batch_jobs SET lease_expires_at = NULL, updated_at = NOW() \
             WHERE id = $1 AND status_id = $2",
        )
        .bind(id)
        .bind(BatchJobStatus::Processing.id())
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Count batches that still need work: `queued`, plus `processing`
    /// whether leased or not.
    pub async fn backlog(pool: &PgPool) -> Result<BatchBacklog, sqlx::Error> {
        sqlx::query_as::<_, BatchBacklog>(
            "SELECT COUNT(*) FILTER (WHERE status_id = $1) AS queued, \
                    COUNT(*) FILTER (WHERE status_id = $2) AS processing \
             FROM batch_jobs WHERE status_id IN ($1, $2)",
        )
        .bind(BatchJobStatus::Queued.id())
        .bind(BatchJobStatus::Processing.id())
        .fetch_one(pool)
        .await
    }
}

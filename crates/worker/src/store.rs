//! Persistence seams used by the worker, and their PostgreSQL implementations.
//!
//! The worker only talks to [`JobStore`] and [`CreditLedger`]. Each method
//! maps to one repository call so the transition guards live in SQL.

use async_trait::async_trait;
use sqlx::PgPool;
use vidbatch_core::settlement::Settlement;
use vidbatch_core::types::{Credits, DbId};
use vidbatch_db::models::batch_job::BatchJob;
use vidbatch_db::models::credit::{FinalizeResult, FreezeResult};
use vidbatch_db::models::status::VideoTaskStatus;
use vidbatch_db::models::video_task::VideoTask;
use vidbatch_db::repositories::{BatchJobRepo, CreditLedgerRepo, VideoTaskRepo};

use crate::error::StoreError;

/// Batch and task persistence.
///
/// Every transition returns `false` when the row was not in the state the
/// transition requires, and writes nothing in that case.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Atomically move up to `limit` claimable batches into `processing`.
    async fn claim(&self, limit: i64, lease_secs: i64) -> Result<Vec<BatchJob>, StoreError>;

    /// All tasks of a batch in `batch_index` order.
    async fn list_tasks(&self, batch_id: DbId) -> Result<Vec<VideoTask>, StoreError>;

    /// Tasks of a batch in any of `statuses`, in `batch_index` order.
    async fn list_tasks_with_status(
        &self,
        batch_id: DbId,
        statuses: &[VideoTaskStatus],
    ) -> Result<Vec<VideoTask>, StoreError>;

    /// `pending`/`queued` without remote id -> `processing`.
    async fn mark_task_processing(&self, task_id: DbId) -> Result<bool, StoreError>;

    /// Attach the provider's task id to a `processing` task.
    async fn record_remote_id(&self, task_id: DbId, remote_id: &str) -> Result<bool, StoreError>;

    /// `processing` -> `failed`.
    async fn fail_task(&self, task_id: DbId, reason: &str) -> Result<bool, StoreError>;

    /// `processing` -> `succeeded`.
    async fn succeed_task(&self, task_id: DbId, video_url: &str) -> Result<bool, StoreError>;

    async fn record_progress(&self, task_id: DbId, progress: i16) -> Result<(), StoreError>;

    /// Write a terminal settlement to a `processing` batch.
    async fn settle_batch(&self, batch_id: DbId, settlement: &Settlement)
        -> Result<bool, StoreError>;

    /// Drop this invocation's lease on an unsettled batch.
    async fn release_batch(&self, batch_id: DbId) -> Result<(), StoreError>;
}

/// Credit escrow keyed by batch id.
///
/// Both operations must be idempotent per batch.
#[async_trait]
pub trait CreditLedger: Send + Sync {
    async fn freeze(
        &self,
        batch_id: DbId,
        user_id: DbId,
        amount: Credits,
    ) -> Result<FreezeResult, StoreError>;

    async fn finalize(
        &self,
        batch_id: DbId,
        user_id: DbId,
        spent: Credits,
    ) -> Result<FinalizeResult, StoreError>;
}

// ---------------------------------------------------------------------------
// PostgreSQL
// ---------------------------------------------------------------------------

/// [`JobStore`] backed by the `batch_jobs` and `video_tasks` tables.
#[derive(Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn claim(&self, limit: i64, lease_secs: i64) -> Result<Vec<BatchJob>, StoreError> {
        Ok(BatchJobRepo::claim(&self.pool, limit, lease_secs).await?)
    }

    async fn list_tasks(&self, batch_id: DbId) -> Result<Vec<VideoTask>, StoreError> {
        Ok(VideoTaskRepo::list_by_batch(&self.pool, batch_id).await?)
    }

    async fn list_tasks_with_status(
        &self,
        batch_id: DbId,
        statuses: &[VideoTaskStatus],
    ) -> Result<Vec<VideoTask>, StoreError> {
        Ok(VideoTaskRepo::list_by_batch_and_status(&self.pool, batch_id, statuses).await?)
    }

    async fn mark_task_processing(&self, task_id: DbId) -> Result<bool, StoreError> {
        Ok(VideoTaskRepo::mark_processing(&self.pool, task_id).await?)
    }

    async fn record_remote_id(&self, task_id: DbId, remote_id: &str) -> Result<bool, StoreError> {
        Ok(VideoTaskRepo::record_remote_id(&self.pool, task_id, remote_id).await?)
    }

    async fn fail_task(&self, task_id: DbId, reason: &str) -> Result<bool, StoreError> {
        Ok(VideoTaskRepo::fail(&self.pool, task_id, reason).await?)
    }

    async fn succeed_task(&self, task_id: DbId, video_url: &str) -> Result<bool, StoreError> {
        Ok(VideoTaskRepo::succeed(&self.pool, task_id, video_url).await?)
    }

    async fn record_progress(&self, task_id: DbId, progress: i16) -> Result<(), StoreError> {
        Ok(VideoTaskRepo::update_progress(&self.pool, task_id, progress).await?)
    }

    async fn settle_batch(
        &self,
        batch_id: DbId,
        settlement: &Settlement,
    ) -> Result<bool, StoreError> {
        Ok(BatchJobRepo::settle(&self.pool, batch_id, settlement).await?)
    }

    async fn release_batch(&self, batch_id: DbId) -> Result<(), StoreError> {
        Ok(BatchJobRepo::release_lease(&self.pool, batch_id).await?)
    }
}

/// [`CreditLedger`] backed by the `credit_*` tables.
#[derive(Clone)]
pub struct PgCreditLedger {
    pool: PgPool,
}

impl PgCreditLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CreditLedger for PgCreditLedger {
    async fn freeze(
        &self,
        batch_id: DbId,
        user_id: DbId,
        amount: Credits,
    ) -> Result<FreezeResult, StoreError> {
        Ok(CreditLedgerRepo::freeze(&self.pool, batch_id, user_id, amount).await?)
    }

    async fn finalize(
        &self,
        batch_id: DbId,
        user_id: DbId,
        spent: Credits,
    ) -> Result<FinalizeResult, StoreError> {
        Ok(CreditLedgerRepo::finalize(&self.pool, batch_id, user_id, spent).await?)
    }
}

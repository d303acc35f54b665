//! Repository for the `video_tasks` table.
//!
//! Transitions are conditional updates returning `bool`: `false` means the
//! row was not in the expected state and nothing was written. This is what
//! makes duplicate webhook deliveries and overlapping invocations harmless.

use sqlx::PgPool;
use vidbatch_core::types::DbId;

use crate::models::status::{StatusId, VideoTaskStatus};
use crate::models::video_task::VideoTask;

/// Column list for `video_tasks` queries.
const COLUMNS: &str = "\
    id, batch_job_id, batch_index, model, prompt, reference_url, aspect_ratio, \
    duration, meta, grsai_task_id, status_id, progress, video_url, error_message, \
    completed_at, created_at, updated_at";

/// Provides read and transition operations for video tasks.
pub struct VideoTaskRepo;

impl VideoTaskRepo {
    /// All tasks of a batch in `batch_index` order.
    pub async fn list_by_batch(
        pool: &PgPool,
        batch_job_id: DbId,
    ) -> Result<Vec<VideoTask>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM video_tasks \
             WHERE batch_job_id = $1 \
             ORDER BY batch_index ASC"
        );
        sqlx::query_as::<_, VideoTask>(&query)
            .bind(batch_job_id)
            .fetch_all(pool)
            .await
    }

    /// Tasks of a batch whose status is one of `statuses`, in `batch_index` order.
    pub async fn list_by_batch_and_status(
        pool: &PgPool,
        batch_job_id: DbId,
        statuses: &[VideoTaskStatus],
    ) -> Result<Vec<VideoTask>, sqlx::Error> {
        let ids: Vec<StatusId> = statuses.iter().map(|s| s.id()).collect();
        let query = format!(
            "SELECT {COLUMNS} FROM video_tasks \
             WHERE batch_job_id = $1 AND status_id = ANY($2) \
             ORDER BY batch_index ASC"
        );
        sqlx::query_as::<_, VideoTask>(&query)
            .bind(batch_job_id)
            .bind(&ids)
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<VideoTask>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM video_tasks WHERE id = $1");
        sqlx::query_as::<_, VideoTask>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a task by the provider's task identifier.
    pub async fn find_by_remote_id(
        pool: &PgPool,
        grsai_task_id: &str,
    ) -> Result<Option<VideoTask>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM video_tasks WHERE grsai_task_id = $1");
        sqlx::query_as::<_, VideoTask>(&query)
            .bind(grsai_task_id)
            .fetch_optional(pool)
            .await
    }

    /// Move a not-yet-dispatched task to `processing` ahead of the remote call.
    ///
    /// Returns `false` if the task already has a remote id or has left
    /// `pending`/`queued`, in which case it must not be dispatched.
    pub async fn mark_processing(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE video_tasks SET status_id = $2, updated_at = NOW() \
             WHERE id = $1 AND status_id IN ($3, $4) AND grsai_task_id IS NULL",
        )
        .bind(id)
        .bind(VideoTaskStatus::Processing.id())
        .bind(VideoTaskStatus::Pending.id())
        .bind(VideoTaskStatus::Queued.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Persist the provider's task id after a successful creation call.
    pub async fn record_remote_id(
        pool: &PgPool,
        id: DbId,
        grsai_task_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE video_tasks \
             SET grsai_task_id = $2, error_message = NULL, updated_at = NOW() \
             WHERE id = $1 AND status_id = $3",
        )
        .bind(id)
        .bind(grsai_task_id)
        .bind(VideoTaskStatus::Processing.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Terminal failure. Applies only to a `processing` task.
    pub async fn fail(pool: &PgPool, id: DbId, error_message: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE video_tasks \
             SET status_id = $2, error_message = $3, video_url = NULL, \
                 completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status_id = $4",
        )
        .bind(id)
        .bind(VideoTaskStatus::Failed.id())
        .bind(error_message)
        .bind(VideoTaskStatus::Processing.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Terminal success. Applies only to a `processing` task.
    pub async fn succeed(pool: &PgPool, id: DbId, video_url: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE video_tasks \
             SET status_id = $2, video_url = $3, error_message = NULL, progress = 100, \
                 completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status_id = $4",
        )
        .bind(id)
        .bind(VideoTaskStatus::Succeeded.id())
        .bind(video_url)
        .bind(VideoTaskStatus::Processing.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record provider-reported progress (0-100) on an in-flight task.
    pub async fn update_progress(pool: &PgPool, id: DbId, progress: i16) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE video_tasks SET progress = $2, updated_at = NOW() \
             WHERE id = $1 AND status_id = $3",
        )
        .bind(id)
        .bind(progress.clamp(0, 100))
        .bind(VideoTaskStatus::Processing.id())
        .execute(pool)
        .await?;
        Ok(())
    }
}

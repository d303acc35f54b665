//! Remote task dispatcher.
//!
//! Creates a provider task for every not-yet-dispatched row of a batch,
//! with at most `concurrency` creation calls in flight. Each task is marked
//! `processing` before its call, so a crash mid-call leaves it visibly
//! in flight instead of silently pending. Creation failures are terminal
//! for the task and never retried.

use chrono::{Duration, Utc};
use futures::stream::{self, StreamExt};
use vidbatch_core::callback::CompletionMode;
use vidbatch_core::failure::{truncate_reason, DISPATCH_INTERRUPTED, NO_TASK_ID};
use vidbatch_core::types::Timestamp;
use vidbatch_db::models::status::VideoTaskStatus;
use vidbatch_db::models::video_task::VideoTask;
use vidbatch_provider::{build_request, ProviderError, TaskParams, VideoProvider};

use crate::store::JobStore;

/// Shared inputs for dispatching one batch.
pub struct DispatchContext<'a> {
    pub store: &'a dyn JobStore,
    pub provider: &'a dyn VideoProvider,
    pub mode: &'a CompletionMode,
    pub signing_secret: Option<&'a str>,
    pub concurrency: usize,
    /// Tasks stuck in `processing` without a remote id since before this
    /// instant are treated as abandoned dispatches.
    pub stale_before: Timestamp,
}

/// Cutoff for abandoned dispatches: one lease length ago.
pub fn stale_cutoff(lease_secs: i64) -> Timestamp {
    Utc::now() - Duration::seconds(lease_secs)
}

/// Per-batch dispatch counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Remote tasks created and recorded.
    pub dispatched: usize,
    /// Tasks failed during dispatch (including abandoned dispatches).
    pub failed: usize,
}

impl DispatchStats {
    pub fn attempted(&self) -> usize {
        self.dispatched + self.failed
    }
}

/// How one task's dispatch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskDispatch {
    Dispatched,
    Failed,
    /// Another invocation owns the task, or the store could not be updated.
    Skipped,
}

/// Dispatch every dispatchable task in `tasks`.
///
/// Tasks are started in `batch_index` order; completions may land in any
/// order.
pub async fn dispatch_batch(ctx: &DispatchContext<'_>, tasks: &[VideoTask]) -> DispatchStats {
    let mut stats = DispatchStats::default();

    for task in tasks.iter().filter(|t| is_abandoned(t, ctx.stale_before)) {
        if fail(ctx.store, task, DISPATCH_INTERRUPTED).await == TaskDispatch::Failed {
            stats.failed += 1;
        }
    }

    let mut queue: Vec<&VideoTask> = tasks.iter().filter(|t| t.is_dispatchable()).collect();
    queue.sort_by_key(|t| t.batch_index);
    if queue.is_empty() {
        return stats;
    }

    let calls: Vec<_> = queue.into_iter().map(|task| dispatch_one(ctx, task)).collect();
    let results: Vec<TaskDispatch> = stream::iter(calls)
        .buffer_unordered(ctx.concurrency.max(1))
        .collect()
        .await;

    for result in results {
        match result {
            TaskDispatch::Dispatched => stats.dispatched += 1,
            TaskDispatch::Failed => stats.failed += 1,
            TaskDispatch::Skipped => {}
        }
    }
    stats
}

async fn dispatch_one(ctx: &DispatchContext<'_>, task: &VideoTask) -> TaskDispatch {
    match ctx.store.mark_task_processing(task.id).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::debug!(task_id = task.id, "Task no longer dispatchable, skipping");
            return TaskDispatch::Skipped;
        }
        Err(e) => {
            tracing::warn!(task_id = task.id, error = %e, "Failed to mark task processing");
            return TaskDispatch::Skipped;
        }
    }

    let params = TaskParams {
        model: &task.model,
        prompt: &task.prompt,
        reference_url: task.reference_url.as_deref(),
        aspect_ratio: task.aspect_ratio.as_deref(),
        duration: task.duration,
        meta: &task.meta,
    };
    let callback = ctx.mode.callback_for(task.id, ctx.signing_secret);

    let request = match build_request(params, callback) {
        Ok(request) => request,
        Err(e) => return fail(ctx.store, task, &e.to_string()).await,
    };

    match ctx.provider.create_task(&request).await {
        Ok(remote_id) => match ctx.store.record_remote_id(task.id, &remote_id).await {
            Ok(true) => {
                tracing::info!(
                    batch_id = task.batch_job_id,
                    task_id = task.id,
                    remote_task_id = %remote_id,
                    family = request.family().as_str(),
                    "Remote task created",
                );
                TaskDispatch::Dispatched
            }
            Ok(false) => {
                tracing::warn!(
                    task_id = task.id,
                    remote_task_id = %remote_id,
                    "Task left processing before its remote id was recorded",
                );
                TaskDispatch::Skipped
            }
            Err(e) => {
                tracing::error!(
                    task_id = task.id,
                    remote_task_id = %remote_id,
                    error = %e,
                    "Failed to record remote task id",
                );
                TaskDispatch::Skipped
            }
        },
        Err(ProviderError::MissingTaskId) => fail(ctx.store, task, NO_TASK_ID).await,
        Err(e) => fail(ctx.store, task, &e.to_string()).await,
    }
}

async fn fail(store: &dyn JobStore, task: &VideoTask, reason: &str) -> TaskDispatch {
    let reason = truncate_reason(reason);
    match store.fail_task(task.id, &reason).await {
        Ok(true) => {
            tracing::warn!(
                batch_id = task.batch_job_id,
                task_id = task.id,
                reason = %reason,
                "Task dispatch failed",
            );
            TaskDispatch::Failed
        }
        Ok(false) => TaskDispatch::Skipped,
        Err(e) => {
            tracing::error!(task_id = task.id, error = %e, "Failed to record dispatch failure");
            TaskDispatch::Skipped
        }
    }
}

/// `processing` with no remote id, untouched for longer than a lease.
fn is_abandoned(task: &VideoTask, stale_before: Timestamp) -> bool {
    task.status() == Some(VideoTaskStatus::Processing)
        && task.grsai_task_id.is_none()
        && task.updated_at < stale_before
}

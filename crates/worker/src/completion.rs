//! Completion detector.
//!
//! In poll mode the worker fetches each in-flight task's result once per
//! invocation, sequentially. In webhook mode the provider calls back and the
//! API applies the same [`apply_outcome`] transition; the worker never polls.

use vidbatch_core::failure::truncate_reason;
use vidbatch_core::types::DbId;
use vidbatch_db::models::video_task::VideoTask;
use vidbatch_provider::{RemoteOutcome, VideoProvider};

use crate::error::StoreError;
use crate::store::JobStore;

/// What applying a remote outcome did to the task row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Succeeded,
    Failed,
    /// Progress recorded; the task is still in flight.
    Progress,
    /// Nothing written: still running without progress, or the task had
    /// already left `processing`.
    Unchanged,
}

impl Applied {
    pub fn is_terminal(self) -> bool {
        matches!(self, Applied::Succeeded | Applied::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Applied::Succeeded => "succeeded",
            Applied::Failed => "failed",
            Applied::Progress => "progress",
            Applied::Unchanged => "unchanged",
        }
    }
}

/// Apply a provider outcome to a task.
///
/// Terminal writes only take effect on a `processing` task, so repeated
/// deliveries of the same outcome are no-ops.
pub async fn apply_outcome(
    store: &dyn JobStore,
    task_id: DbId,
    outcome: &RemoteOutcome,
) -> Result<Applied, StoreError> {
    let applied = match outcome {
        RemoteOutcome::Running { progress: Some(progress) } => {
            store.record_progress(task_id, *progress).await?;
            Applied::Progress
        }
        RemoteOutcome::Running { progress: None } => Applied::Unchanged,
        RemoteOutcome::Succeeded { video_url } => {
            if store.succeed_task(task_id, video_url).await? {
                tracing::info!(task_id, video_url = %video_url, "Task succeeded");
                Applied::Succeeded
            } else {
                Applied::Unchanged
            }
        }
        RemoteOutcome::Failed { reason } => {
            let reason = truncate_reason(reason);
            if store.fail_task(task_id, &reason).await? {
                tracing::warn!(task_id, reason = %reason, "Task failed remotely");
                Applied::Failed
            } else {
                Applied::Unchanged
            }
        }
    };
    Ok(applied)
}

/// Per-batch poll counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollStats {
    /// Result fetches attempted.
    pub polled: usize,
    /// Tasks moved to a terminal state.
    pub completed: usize,
    /// Fetches that failed in transport or parsing; those tasks are untouched.
    pub errors: usize,
}

/// Poll every in-flight task once, one at a time.
///
/// A transport or parse error leaves the task `processing`; the next
/// invocation polls it again.
pub async fn poll_tasks(
    store: &dyn JobStore,
    provider: &dyn VideoProvider,
    tasks: &[VideoTask],
) -> PollStats {
    let mut stats = PollStats::default();

    for task in tasks.iter().filter(|t| t.is_in_flight()) {
        let Some(remote_id) = task.grsai_task_id.as_deref() else {
            continue;
        };
        stats.polled += 1;

        let envelope = match provider.fetch_result(remote_id).await {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(
                    task_id = task.id,
                    remote_task_id = %remote_id,
                    error = %e,
                    "Result fetch failed, will retry next invocation",
                );
                stats.errors += 1;
                continue;
            }
        };

        match apply_outcome(store, task.id, &envelope.interpret()).await {
            Ok(applied) if applied.is_terminal() => stats.completed += 1,
            Ok(_) => {}
            Err(e) => {
                tracing::error!(task_id = task.id, error = %e, "Failed to record poll result");
            }
        }
    }
    stats
}

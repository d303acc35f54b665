//! Inbound provider callbacks.
//!
//! Applies the same transition as the poll path. Terminal writes are guarded
//! by `status = processing`, so duplicate deliveries are acknowledged with
//! `applied: false` and change nothing.

use axum::extract::{Query, State};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use vidbatch_core::error::CoreError;
use vidbatch_core::signing::verify_task_callback;
use vidbatch_core::types::DbId;
use vidbatch_db::models::video_task::VideoTask;
use vidbatch_db::repositories::VideoTaskRepo;
use vidbatch_provider::ResultEnvelope;
use vidbatch_worker::completion::{apply_outcome, Applied};
use vidbatch_worker::PgJobStore;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub task_id: Option<DbId>,
    pub sig: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CallbackAck {
    pub task_id: DbId,
    /// Whether the callback changed the task row.
    pub applied: bool,
    /// `succeeded`, `failed`, `progress` or `unchanged`.
    pub result: &'static str,
}

// ---------------------------------------------------------------------------
// POST /webhooks/grsai
// ---------------------------------------------------------------------------

/// POST /api/v1/webhooks/grsai?task_id=<id>[&sig=<hmac>]
async fn grsai_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
    Json(body): Json<serde_json::Value>,
) -> AppResult<Json<DataResponse<CallbackAck>>> {
    let envelope = ResultEnvelope::from_callback(body)
        .map_err(|e| AppError::BadRequest(format!("Unrecognized callback body: {e}")))?;
    let remote_id = envelope.remote_task_id();

    let task = resolve_task(&state, &query, remote_id).await?;

    // Unsigned callbacks must name the remote task the row was dispatched as.
    let signed = state.config.webhook_signing_secret.is_some();
    let correlated = match (task.grsai_task_id.as_deref(), remote_id) {
        (Some(expected), Some(received)) => expected == received,
        _ => signed,
    };
    if !correlated {
        tracing::warn!(
            task_id = task.id,
            remote_task_id = ?remote_id,
            expected = ?task.grsai_task_id,
            signed,
            "Callback remote id does not match task",
        );
        return Err(AppError::BadRequest(
            "Callback does not match the task's remote id".into(),
        ));
    }

    let outcome = envelope.interpret();
    let store = PgJobStore::new(state.pool.clone());
    let applied = apply_outcome(&store, task.id, &outcome).await?;

    tracing::info!(
        task_id = task.id,
        batch_id = task.batch_job_id,
        result = applied.as_str(),
        "Provider callback handled",
    );

    Ok(Json(DataResponse {
        data: CallbackAck {
            task_id: task.id,
            applied: applied != Applied::Unchanged,
            result: applied.as_str(),
        },
    }))
}

/// Find the task a callback refers to.
///
/// With a signing secret configured the callback must carry `task_id` and a
/// valid `sig`. Without one, a callback lacking `task_id` is correlated by
/// its remote task id.
async fn resolve_task(
    state: &AppState,
    query: &CallbackQuery,
    remote_id: Option<&str>,
) -> AppResult<VideoTask> {
    let secret = state.config.webhook_signing_secret.as_deref();

    let Some(task_id) = query.task_id else {
        if secret.is_some() {
            return Err(unauthorized("Unsigned callback"));
        }
        let remote_id = remote_id.ok_or_else(|| {
            AppError::BadRequest("Callback carries neither task_id nor a remote task id".into())
        })?;
        return VideoTaskRepo::find_by_remote_id(&state.pool, remote_id)
            .await?
            .ok_or_else(|| AppError::BadRequest(format!("Unknown remote task id {remote_id}")));
    };

    if let Some(secret) = secret {
        let sig = query.sig.as_deref().unwrap_or_default();
        if !verify_task_callback(secret, task_id, sig) {
            tracing::warn!(task_id, "Callback signature rejected");
            return Err(unauthorized("Invalid callback signature"));
        }
    }

    VideoTaskRepo::find_by_id(&state.pool, task_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "VideoTask",
            id: task_id,
        }))
}

fn unauthorized(msg: &str) -> AppError {
    AppError::Core(CoreError::Unauthorized(msg.into()))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/webhooks/grsai", post(grsai_callback))
}

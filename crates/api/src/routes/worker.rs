//! Scheduler trigger for the batch worker.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use vidbatch_worker::InvocationReport;

use crate::error::AppResult;
use crate::middleware::cron_secret::CronAuth;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET|POST /api/v1/worker/batch-video
///
/// Runs one invocation and returns its report. Only a claim failure is an
/// error; per-batch problems are reflected in the batch rows.
async fn trigger(
    _auth: CronAuth,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<InvocationReport>>> {
    let report = state.worker.run_invocation().await?;
    Ok(Json(DataResponse { data: report }))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/worker/batch-video", get(trigger).post(trigger))
}

use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;
use vidbatch_db::models::batch_job::BatchBacklog;
use vidbatch_db::repositories::BatchJobRepo;

use crate::state::AppState;

/// Health and operating-mode report.
#[derive(Serialize)]
pub struct HealthResponse {
    /// `"ok"` or `"degraded"`.
    pub status: &'static str,
    pub version: &'static str,
    pub db_healthy: bool,
    /// `"webhook"` or `"poll"`, as the next invocation will run.
    pub completion_mode: &'static str,
    /// Whether a scheduler secret is configured; without one every trigger
    /// is rejected.
    pub trigger_enabled: bool,
    /// Whether callback URLs are signed and verified.
    pub webhook_signed: bool,
    /// Unsettled batches, or `null` when the database is unreachable.
    pub backlog: Option<BatchBacklog>,
}

/// GET /health
///
/// Degraded when the database cannot be read. A missing scheduler secret is
/// reported but does not degrade the service.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let backlog = match BatchJobRepo::backlog(&state.pool).await {
        Ok(backlog) => Some(backlog),
        Err(e) => {
            tracing::warn!(error = %e, "Health check could not read batch backlog");
            None
        }
    };
    let db_healthy = backlog.is_some();

    Json(HealthResponse {
        status: if db_healthy { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        completion_mode: state.worker.config().completion_mode().as_str(),
        trigger_enabled: state.config.cron_secret.is_some(),
        webhook_signed: state.config.webhook_signing_secret.is_some(),
        backlog,
    })
}

/// Mount the health route at the root, outside `/api/v1`.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

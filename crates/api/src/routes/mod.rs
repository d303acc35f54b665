pub mod health;
pub mod webhooks;
pub mod worker;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /worker/batch-video        GET, POST   scheduler trigger (cron secret)
/// /webhooks/grsai            POST        provider completion callback
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(worker::router())
        .merge(webhooks::router())
}

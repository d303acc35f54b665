use std::sync::Arc;

use vidbatch_worker::BatchWorker;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: vidbatch_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Runs one invocation per trigger request.
    pub worker: Arc<BatchWorker>,
}

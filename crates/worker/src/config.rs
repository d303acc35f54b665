use std::time::Duration;

use vidbatch_core::callback::CompletionMode;

/// Worker configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Batches claimed per invocation (default: `5`).
    pub claim_limit: i64,
    /// Concurrent remote creation calls per batch (default: `3`).
    pub task_concurrency: usize,
    /// Claim lease in seconds (default: `600`).
    pub lease_secs: i64,
    /// Public base URL for provider callbacks. Absent means poll mode.
    pub public_base_url: Option<String>,
    /// Secret used to sign callback URLs.
    pub webhook_signing_secret: Option<String>,
    /// Period of the standalone timer loop (default: `60s`).
    pub interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            claim_limit: 5,
            task_concurrency: 3,
            lease_secs: 600,
            public_base_url: None,
            webhook_signing_secret: None,
            interval: Duration::from_secs(60),
        }
    }
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default |
    /// |--------------------------|---------|
    /// | `BATCH_CLAIM_LIMIT`      | `5`     |
    /// | `TASK_CONCURRENCY`       | `3`     |
    /// | `BATCH_LEASE_SECS`       | `600`   |
    /// | `PUBLIC_BASE_URL`        | unset   |
    /// | `WEBHOOK_SIGNING_SECRET` | unset   |
    /// | `WORKER_INTERVAL_SECS`   | `60`    |
    pub fn from_env() -> Self {
        let claim_limit: i64 = std::env::var("BATCH_CLAIM_LIMIT")
            .unwrap_or_else(|_| "5".into())
            .parse()
            .expect("BATCH_CLAIM_LIMIT must be a valid i64");

        let task_concurrency: usize = std::env::var("TASK_CONCURRENCY")
            .unwrap_or_else(|_| "3".into())
            .parse()
            .expect("TASK_CONCURRENCY must be a valid usize");

        let lease_secs: i64 = std::env::var("BATCH_LEASE_SECS")
            .unwrap_or_else(|_| "600".into())
            .parse()
            .expect("BATCH_LEASE_SECS must be a valid i64");

        let interval_secs: u64 = std::env::var("WORKER_INTERVAL_SECS")
            .unwrap_or_else(|_| "60".into())
            .parse()
            .expect("WORKER_INTERVAL_SECS must be a valid u64");

        Self {
            claim_limit: claim_limit.max(1),
            task_concurrency: task_concurrency.max(1),
            lease_secs: lease_secs.max(1),
            public_base_url: non_empty_var("PUBLIC_BASE_URL"),
            webhook_signing_secret: non_empty_var("WEBHOOK_SIGNING_SECRET"),
            interval: Duration::from_secs(interval_secs.max(1)),
        }
    }

    /// Completion mode for an invocation, fixed for its whole run.
    pub fn completion_mode(&self) -> CompletionMode {
        CompletionMode::from_base_url(self.public_base_url.as_deref())
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

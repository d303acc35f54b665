/// Server configuration loaded from environment variables.
///
/// Worker and provider settings are loaded by their own crates; this only
/// covers the HTTP surface.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// HTTP request timeout in seconds (default: `300`). An invocation can
    /// run for several minutes.
    pub request_timeout_secs: u64,
    /// Shared secret for the trigger endpoint. `None` rejects every trigger.
    pub cron_secret: Option<String>,
    /// Secret the webhook uses to verify callback signatures.
    pub webhook_signing_secret: Option<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default   |
    /// |--------------------------|-----------|
    /// | `HOST`                   | `0.0.0.0` |
    /// | `PORT`                   | `3000`    |
    /// | `REQUEST_TIMEOUT_SECS`   | `300`     |
    /// | `CRON_SECRET`            | unset     |
    /// | `WEBHOOK_SIGNING_SECRET` | unset     |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "300".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        Self {
            host,
            port,
            request_timeout_secs,
            cron_secret: non_empty_var("CRON_SECRET"),
            webhook_signing_secret: non_empty_var("WEBHOOK_SIGNING_SECRET"),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

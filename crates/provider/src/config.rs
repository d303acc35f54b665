use std::time::Duration;

/// Provider settings loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Bearer token sent with every request.
    pub api_key: String,
    /// API base URL without a trailing slash.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl ProviderConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var                 | Default                  |
    /// |-------------------------|--------------------------|
    /// | `GRSAI_API_KEY`         | required                 |
    /// | `GRSAI_BASE_URL`        | `https://api.grsai.com`  |
    /// | `PROVIDER_TIMEOUT_SECS` | `60`                     |
    pub fn from_env() -> Self {
        let api_key = std::env::var("GRSAI_API_KEY").expect("GRSAI_API_KEY must be set");

        let base_url = std::env::var("GRSAI_BASE_URL")
            .unwrap_or_else(|_| "https://api.grsai.com".into())
            .trim_end_matches('/')
            .to_string();

        let timeout_secs: u64 = std::env::var("PROVIDER_TIMEOUT_SECS")
            .unwrap_or_else(|_| "60".into())
            .parse()
            .expect("PROVIDER_TIMEOUT_SECS must be a valid u64");

        Self {
            api_key,
            base_url,
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

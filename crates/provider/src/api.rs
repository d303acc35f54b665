//! REST API client for the video-generation provider.
//!
//! Wraps task creation and result retrieval using [`reqwest`]. Every
//! request carries the configured bearer token.

use vidbatch_core::failure::NO_TASK_ID;

use crate::config::ProviderConfig;
use crate::messages::{CreateTaskResponse, ResultEnvelope};
use crate::request::CreateTaskRequest;

/// HTTP client for the provider API.
pub struct GrsaiApi {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

/// Errors from the provider REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout, body decode).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider returned a non-2xx status code.
    #[error("Provider API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The envelope carried a non-zero business code.
    #[error("Provider rejected request (code {code}): {msg}")]
    Rejected { code: i64, msg: String },

    /// Creation succeeded but the response had no task id.
    #[error("{}", NO_TASK_ID)]
    MissingTaskId,
}

impl GrsaiApi {
    /// Create a client from configuration, applying its request timeout.
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self::with_client(client, config.base_url.clone(), config.api_key.clone()))
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, api_url: String, api_key: String) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Create a remote generation task.
    ///
    /// Posts to the family's endpoint and returns the provider task id.
    pub async fn create_task(&self, request: &CreateTaskRequest) -> Result<String, ProviderError> {
        let builder = self
            .client
            .post(format!("{}{}", self.api_url, request.path()))
            .bearer_auth(&self.api_key);
        let builder = match request {
            CreateTaskRequest::Sora(body) => builder.json(body),
            CreateTaskRequest::Veo(body) => builder.json(body),
        };
        let response = builder.send().await?;

        let envelope: CreateTaskResponse = Self::parse_response(response).await?;
        if envelope.code != 0 {
            tracing::debug!(
                family = request.family().as_str(),
                code = envelope.code,
                "Provider rejected task creation",
            );
            return Err(ProviderError::Rejected {
                code: envelope.code,
                msg: envelope.msg.unwrap_or_default(),
            });
        }
        envelope
            .task_id()
            .map(str::to_string)
            .ok_or(ProviderError::MissingTaskId)
    }

    /// Fetch the result envelope of a remote task.
    ///
    /// Business errors are returned inside the envelope, not as `Err`, so the
    /// caller can tell a reported failure from a transport problem.
    pub async fn fetch_result(&self, remote_task_id: &str) -> Result<ResultEnvelope, ProviderError> {
        let body = serde_json::json!({ "id": remote_task_id });

        let response = self
            .client
            .post(format!("{}/v1/draw/result", self.api_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ProviderError> {
        let status = response.status();
        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), "Provider returned error status");
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ProviderError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

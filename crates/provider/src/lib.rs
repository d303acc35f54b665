//! Client for the remote video-generation provider.
//!
//! - [`api`] -- reqwest-based HTTP client ([`GrsaiApi`]).
//! - [`request`] -- maps stored task parameters to the two request families.
//! - [`messages`] -- wire types and interpretation of result envelopes.
//! - [`config`] -- provider settings loaded from the environment.
//!
//! The worker depends only on the [`VideoProvider`] trait so that tests can
//! substitute a scripted provider.

pub mod api;
pub mod config;
pub mod messages;
pub mod request;

use async_trait::async_trait;

pub use api::{GrsaiApi, ProviderError};
pub use config::ProviderConfig;
pub use messages::{RemoteOutcome, ResultEnvelope};
pub use request::{build_request, CreateTaskRequest, TaskParams};

/// Operations the worker needs from the provider.
#[async_trait]
pub trait VideoProvider: Send + Sync {
    /// Create a remote generation task and return its provider id.
    async fn create_task(&self, request: &CreateTaskRequest) -> Result<String, ProviderError>;

    /// Fetch the current result envelope of a remote task.
    async fn fetch_result(&self, remote_task_id: &str) -> Result<ResultEnvelope, ProviderError>;
}

#[async_trait]
impl VideoProvider for GrsaiApi {
    async fn create_task(&self, request: &CreateTaskRequest) -> Result<String, ProviderError> {
        GrsaiApi::create_task(self, request).await
    }

    async fn fetch_result(&self, remote_task_id: &str) -> Result<ResultEnvelope, ProviderError> {
        GrsaiApi::fetch_result(self, remote_task_id).await
    }
}

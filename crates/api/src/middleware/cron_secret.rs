//! Shared-secret extractor for the scheduler trigger.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use vidbatch_core::error::CoreError;
use vidbatch_core::signing::secrets_match;

use crate::error::AppError;
use crate::state::AppState;

/// Header carrying the trigger secret.
pub const CRON_SECRET_HEADER: &str = "x-cron-secret";

/// Proof that the request carried the configured cron secret, either in
/// `x-cron-secret` or as `Authorization: Bearer <secret>`.
///
/// Rejection happens during extraction, before the handler touches the
/// job store. With no secret configured every request is rejected.
#[derive(Debug, Clone, Copy)]
pub struct CronAuth;

impl FromRequestParts<AppState> for CronAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.config.cron_secret.as_deref() else {
            tracing::warn!("Trigger rejected: CRON_SECRET is not configured");
            return Err(unauthorized());
        };

        let provided = parts
            .headers
            .get(CRON_SECRET_HEADER)
            .and_then(|v| v.to_str().ok())
            .or_else(|| {
                parts
                    .headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.strip_prefix("Bearer "))
            })
            .ok_or_else(unauthorized)?;

        if !secrets_match(expected, provided.trim()) {
            tracing::warn!("Trigger rejected: secret mismatch");
            return Err(unauthorized());
        }

        Ok(CronAuth)
    }
}

fn unauthorized() -> AppError {
    AppError::Core(CoreError::Unauthorized("Invalid or missing cron secret".into()))
}

//! Completion-detection mode and provider callback addressing.
//!
//! An invocation runs in exactly one mode. With a reachable public base URL
//! the provider is given a per-task callback URL and completion arrives via
//! the webhook. Without one, the provider is told not to call back and the
//! worker polls in-flight tasks itself.

use url::{Host, Url};

use crate::signing::sign_task_callback;
use crate::types::DbId;

/// Value sent in place of a callback URL to tell the provider not to call back.
pub const NO_CALLBACK_SENTINEL: &str = "-1";

/// Path of the inbound provider webhook, relative to the public base URL.
pub const WEBHOOK_PATH: &str = "/api/v1/webhooks/grsai";

/// How task completion is learned during one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionMode {
    /// The provider calls back to `base_url`; the worker never polls.
    Webhook { base_url: String },
    /// No callback is registered; the worker polls in-flight tasks.
    Poll,
}

impl CompletionMode {
    /// Select the mode from an optional configured base URL.
    pub fn from_base_url(raw: Option<&str>) -> Self {
        match raw.and_then(public_base_url) {
            Some(base_url) => CompletionMode::Webhook { base_url },
            None => CompletionMode::Poll,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CompletionMode::Webhook { .. } => "webhook",
            CompletionMode::Poll => "poll",
        }
    }

    pub fn is_poll(&self) -> bool {
        matches!(self, CompletionMode::Poll)
    }

    /// The value to send as the provider's callback field for `task_id`.
    ///
    /// In poll mode this is always [`NO_CALLBACK_SENTINEL`].
    pub fn callback_for(&self, task_id: DbId, signing_secret: Option<&str>) -> String {
        match self {
            CompletionMode::Webhook { base_url } => {
                let mut url = format!("{base_url}{WEBHOOK_PATH}?task_id={task_id}");
                if let Some(secret) = signing_secret.filter(|s| !s.is_empty()) {
                    url.push_str("&sig=");
                    url.push_str(&sign_task_callback(secret, task_id));
                }
                url
            }
            CompletionMode::Poll => NO_CALLBACK_SENTINEL.to_string(),
        }
    }
}

/// Normalize a configured base URL, or `None` when the provider could not
/// reach it.
///
/// Blank or unparsable values, non-http(s) schemes, and loopback or
/// unspecified hosts are all treated as "no public URL". Credentials, query
/// and fragment are dropped, as is a trailing slash on the path.
pub fn public_base_url(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }

    let reachable = match url.host()? {
        Host::Domain(domain) => domain != "localhost" && !domain.ends_with(".localhost"),
        Host::Ipv4(ip) => !ip.is_loopback() && !ip.is_unspecified(),
        Host::Ipv6(ip) => !ip.is_loopback() && !ip.is_unspecified(),
    };
    if !reachable {
        return None;
    }

    let origin = url.origin().ascii_serialization();
    Some(format!("{origin}{}", url.path().trim_end_matches('/')))
}

//! Wire types for the provider API and interpretation of result envelopes.
//!
//! Every response is wrapped in `{ "code", "msg", "data" }`. A non-zero
//! `code` is a business error regardless of what `data` says.

use serde::{Deserialize, Serialize};
use vidbatch_core::failure::{reason_or_generic, NO_VIDEO_URL};

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

/// Body of a Sora-family creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SoraCreateRequest {
    pub model: String,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
    pub duration: i32,
    pub size: String,
    /// Callback URL, or `"-1"` to disable callbacks.
    pub web_hook: String,
}

/// Body of a Veo-family creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VeoCreateRequest {
    pub model: String,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_frame_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_frame_url: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub urls: Vec<String>,
    /// Callback URL, or `"-1"` to disable callbacks.
    pub web_hook: String,
}

/// Envelope returned by the creation endpoints.
#[derive(Debug, Deserialize)]
pub struct CreateTaskResponse {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub data: Option<CreateTaskData>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskData {
    #[serde(default)]
    pub id: Option<String>,
}

impl CreateTaskResponse {
    /// The remote task id, if the response carried a non-blank one.
    pub fn task_id(&self) -> Option<&str> {
        self.data
            .as_ref()
            .and_then(|d| d.id.as_deref())
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Envelope returned by the result endpoint and posted to the webhook.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultEnvelope {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub data: Option<ResultData>,
}

/// Task state inside a result envelope.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultData {
    #[serde(default)]
    pub id: Option<String>,
    /// `running`, `succeeded` or `failed`.
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub progress: Option<i64>,
    /// Sora-style success payload.
    #[serde(default)]
    pub results: Vec<ResultItem>,
    /// Veo-style success payload.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub failure_reason: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultItem {
    #[serde(default)]
    pub url: Option<String>,
}

/// What a result envelope means for the task it describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteOutcome {
    /// Still generating. `progress` is 0-100 when reported.
    Running { progress: Option<i16> },
    Succeeded { video_url: String },
    Failed { reason: String },
}

impl ResultEnvelope {
    /// Parse a webhook body.
    ///
    /// Callbacks arrive either as the full envelope or as the bare `data`
    /// object; both are accepted.
    pub fn from_callback(body: serde_json::Value) -> Result<Self, serde_json::Error> {
        if body.get("data").is_some_and(serde_json::Value::is_object) {
            serde_json::from_value(body)
        } else {
            let data: ResultData = serde_json::from_value(body)?;
            Ok(Self {
                code: 0,
                msg: None,
                data: Some(data),
            })
        }
    }

    /// The remote task id the envelope refers to, if present.
    pub fn remote_task_id(&self) -> Option<&str> {
        self.data
            .as_ref()
            .and_then(|d| d.id.as_deref())
            .filter(|id| !id.is_empty())
    }

    /// Decide what this envelope means for the task.
    pub fn interpret(&self) -> RemoteOutcome {
        if self.code != 0 {
            return RemoteOutcome::Failed {
                reason: reason_or_generic(self.msg.as_deref()),
            };
        }

        let Some(data) = &self.data else {
            return RemoteOutcome::Running { progress: None };
        };

        let status = data.status.as_deref().map(str::to_ascii_lowercase);
        match status.as_deref() {
            Some("succeeded") | Some("success") => match data.video_url() {
                Some(video_url) => RemoteOutcome::Succeeded { video_url },
                None => RemoteOutcome::Failed {
                    reason: NO_VIDEO_URL.to_string(),
                },
            },
            Some("failed") | Some("error") => RemoteOutcome::Failed {
                reason: reason_or_generic(data.failure_reason()),
            },
            _ => RemoteOutcome::Running {
                progress: data.progress.map(|p| p.clamp(0, 100) as i16),
            },
        }
    }
}

impl ResultData {
    /// First non-blank URL from either success shape.
    fn video_url(&self) -> Option<String> {
        self.results
            .iter()
            .filter_map(|r| r.url.as_deref())
            .chain(self.url.as_deref())
            .map(str::trim)
            .find(|u| !u.is_empty())
            .map(str::to_string)
    }

    fn failure_reason(&self) -> Option<&str> {
        [self.failure_reason.as_deref(), self.error.as_deref()]
            .into_iter()
            .flatten()
            .find(|r| !r.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use vidbatch_core::failure::GENERATION_FAILED;

    use super::*;

    fn envelope(value: serde_json::Value) -> ResultEnvelope {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn running_reports_progress() {
        let env = envelope(json!({"code": 0, "data": {"id": "t1", "status": "running", "progress": 42}}));
        assert_eq!(env.interpret(), RemoteOutcome::Running { progress: Some(42) });
    }

    #[test]
    fn results_array_shape_succeeds() {
        let env = envelope(json!({
            "code": 0,
            "data": {"status": "succeeded", "results": [{"url": "https://cdn/a.mp4"}]}
        }));
        assert_eq!(
            env.interpret(),
            RemoteOutcome::Succeeded { video_url: "https://cdn/a.mp4".into() }
        );
    }

    #[test]
    fn direct_url_shape_succeeds() {
        let env = envelope(json!({"code": 0, "data": {"status": "succeeded", "url": "https://cdn/b.mp4"}}));
        assert_eq!(
            env.interpret(),
            RemoteOutcome::Succeeded { video_url: "https://cdn/b.mp4".into() }
        );
    }

    #[test]
    fn success_without_url_is_failure() {
        let env = envelope(json!({"code": 0, "data": {"status": "succeeded", "results": [{"url": ""}]}}));
        assert_eq!(env.interpret(), RemoteOutcome::Failed { reason: NO_VIDEO_URL.into() });
    }

    #[test]
    fn failure_uses_provider_reason() {
        let env = envelope(json!({"code": 0, "data": {"status": "failed", "failure_reason": "", "error": "nsfw"}}));
        assert_eq!(env.interpret(), RemoteOutcome::Failed { reason: "nsfw".into() });
    }

    #[test]
    fn failure_without_reason_is_generic() {
        let env = envelope(json!({"code": 0, "data": {"status": "failed"}}));
        assert_eq!(env.interpret(), RemoteOutcome::Failed { reason: GENERATION_FAILED.into() });
    }

    #[test]
    fn non_zero_code_fails_regardless_of_status() {
        let env = envelope(json!({
            "code": -22,
            "msg": "task not found",
            "data": {"status": "succeeded", "url": "https://cdn/c.mp4"}
        }));
        assert_eq!(env.interpret(), RemoteOutcome::Failed { reason: "task not found".into() });
    }

    #[test]
    fn callback_accepts_bare_data() {
        let env = ResultEnvelope::from_callback(json!({"id": "t9", "status": "succeeded", "url": "https://cdn/d.mp4"}))
            .unwrap();
        assert_eq!(env.remote_task_id(), Some("t9"));
        assert_eq!(
            env.interpret(),
            RemoteOutcome::Succeeded { video_url: "https://cdn/d.mp4".into() }
        );
    }

    #[test]
    fn callback_accepts_envelope() {
        let env = ResultEnvelope::from_callback(json!({"code": 0, "data": {"id": "t9", "status": "running"}}))
            .unwrap();
        assert_eq!(env.remote_task_id(), Some("t9"));
    }

    #[test]
    fn create_response_task_id_ignores_blank() {
        let resp: CreateTaskResponse =
            serde_json::from_value(json!({"code": 0, "data": {"id": "  "}})).unwrap();
        assert_eq!(resp.task_id(), None);
        let resp: CreateTaskResponse = serde_json::from_value(json!({"code": 0})).unwrap();
        assert_eq!(resp.task_id(), None);
    }
}

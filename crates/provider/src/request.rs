//! Mapping of stored task parameters to provider creation requests.

use serde_json::Value;
use vidbatch_core::error::CoreError;
use vidbatch_core::video_model::{
    clamp_sora_duration, detect_family, sora_provider_model, veo_provider_model, ModelFamily,
    SORA_SIZE,
};

use crate::messages::{SoraCreateRequest, VeoCreateRequest};

/// The task fields a creation request is built from.
#[derive(Debug, Clone, Copy)]
pub struct TaskParams<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub reference_url: Option<&'a str>,
    pub aspect_ratio: Option<&'a str>,
    pub duration: Option<i32>,
    pub meta: &'a Value,
}

/// A creation request for one of the two endpoint families.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateTaskRequest {
    Sora(SoraCreateRequest),
    Veo(VeoCreateRequest),
}

impl CreateTaskRequest {
    pub fn family(&self) -> ModelFamily {
        match self {
            CreateTaskRequest::Sora(_) => ModelFamily::Sora,
            CreateTaskRequest::Veo(_) => ModelFamily::Veo,
        }
    }

    /// Endpoint path relative to the API base URL.
    pub fn path(&self) -> &'static str {
        match self {
            CreateTaskRequest::Sora(_) => "/v1/video/sora-video",
            CreateTaskRequest::Veo(_) => "/v1/video/veo",
        }
    }
}

/// Build the creation request for a task.
///
/// `web_hook` is the callback URL or the no-callback sentinel. Fails with
/// [`CoreError::Validation`] when the model belongs to neither family.
pub fn build_request(params: TaskParams<'_>, web_hook: String) -> Result<CreateTaskRequest, CoreError> {
    let request = match detect_family(params.model)? {
        ModelFamily::Sora => CreateTaskRequest::Sora(SoraCreateRequest {
            model: sora_provider_model(params.model),
            prompt: params.prompt.to_string(),
            url: non_blank(params.reference_url).or_else(|| meta_str(params.meta, "url")),
            aspect_ratio: non_blank(params.aspect_ratio),
            duration: clamp_sora_duration(params.duration),
            size: SORA_SIZE.to_string(),
            web_hook,
        }),
        ModelFamily::Veo => {
            let urls = meta_str_list(params.meta, "urls");
            let first_frame_url = meta_str(params.meta, "firstFrameUrl").or_else(|| {
                if urls.is_empty() {
                    non_blank(params.reference_url)
                } else {
                    None
                }
            });
            CreateTaskRequest::Veo(VeoCreateRequest {
                model: veo_provider_model(params.model),
                prompt: params.prompt.to_string(),
                aspect_ratio: non_blank(params.aspect_ratio),
                first_frame_url,
                last_frame_url: meta_str(params.meta, "lastFrameUrl"),
                urls,
                web_hook,
            })
        }
    };
    Ok(request)
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn meta_str(meta: &Value, key: &str) -> Option<String> {
    non_blank(meta.get(key).and_then(Value::as_str))
}

fn meta_str_list(meta: &Value, key: &str) -> Vec<String> {
    meta.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| non_blank(v.as_str()))
                .collect()
        })
        .unwrap_or_default()
}

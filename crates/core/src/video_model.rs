//! Routing of stored model names to the provider's two model families.
//!
//! Tasks store a short, product-facing model name. The provider exposes two
//! endpoints with different request shapes: a Sora-style endpoint taking a
//! fixed size and a 10/15 second duration, and a Veo-style endpoint taking
//! first/last frame references and a full model identifier.

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Output size sent with every Sora-family request.
pub const SORA_SIZE: &str = "small";

/// Default Sora duration in seconds, used for anything other than 15.
pub const SORA_DEFAULT_DURATION_SECS: i32 = 10;

/// The only other duration the Sora family accepts.
pub const SORA_LONG_DURATION_SECS: i32 = 15;

/// Provider identifier used when a Sora name carries no variant.
pub const DEFAULT_SORA_MODEL: &str = "sora-2";

/// Short Veo names and the provider identifiers they expand to.
const VEO_MODEL_ALIASES: &[(&str, &str)] = &[
    ("veo", "veo3.1-fast"),
    ("veo-fast", "veo3.1-fast"),
    ("veo-pro", "veo3.1-pro"),
    ("veo3", "veo3-fast"),
    ("veo3-fast", "veo3-fast"),
    ("veo3-pro", "veo3-pro"),
    ("veo31", "veo3.1-fast"),
    ("veo31-fast", "veo3.1-fast"),
    ("veo31-pro", "veo3.1-pro"),
    ("veo-3.1-fast", "veo3.1-fast"),
    ("veo-3.1-pro", "veo3.1-pro"),
];

// ---------------------------------------------------------------------------
// Family detection
// ---------------------------------------------------------------------------

/// Provider endpoint family a task is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    Sora,
    Veo,
}

impl ModelFamily {
    pub fn as_str(self) -> &'static str {
        match self {
            ModelFamily::Sora => "sora",
            ModelFamily::Veo => "veo",
        }
    }
}

/// Route a stored model name to its family by case-insensitive name match.
///
/// Unrecognised names are a validation error; the dispatcher records it as a
/// task failure rather than guessing a family.
pub fn detect_family(model: &str) -> Result<ModelFamily, CoreError> {
    let normalized = model.trim().to_ascii_lowercase();
    if normalized.contains("sora") {
        Ok(ModelFamily::Sora)
    } else if normalized.contains("veo") {
        Ok(ModelFamily::Veo)
    } else {
        Err(CoreError::Validation(format!(
            "Unsupported video model: {}",
            model.trim()
        )))
    }
}

// ---------------------------------------------------------------------------
// Sora
// ---------------------------------------------------------------------------

/// Clamp a stored duration to the two values the Sora family accepts.
///
/// Exactly 15 stays 15; every other value, including a missing one, becomes 10.
pub fn clamp_sora_duration(duration: Option<i32>) -> i32 {
    match duration {
        Some(SORA_LONG_DURATION_SECS) => SORA_LONG_DURATION_SECS,
        _ => SORA_DEFAULT_DURATION_SECS,
    }
}

/// Provider identifier for a Sora-family model name.
pub fn sora_provider_model(model: &str) -> String {
    let normalized = model.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "sora" | "sora2" | "sora-2" => DEFAULT_SORA_MODEL.to_string(),
        "sora2-pro" | "sora-2-pro" => "sora-2-pro".to_string(),
        _ => normalized,
    }
}

// ---------------------------------------------------------------------------
// Veo
// ---------------------------------------------------------------------------

/// Provider identifier for a Veo-family model name.
///
/// Known short names are expanded; anything else is forwarded as-is, which
/// lets already-qualified identifiers through untouched.
pub fn veo_provider_model(model: &str) -> String {
    let normalized = model.trim().to_ascii_lowercase();
    VEO_MODEL_ALIASES
        .iter()
        .find(|(short, _)| *short == normalized)
        .map(|(_, full)| (*full).to_string())
        .unwrap_or(normalized)
}

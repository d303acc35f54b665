//! Failure reasons recorded on task rows.
//!
//! Provider error bodies can be arbitrarily large, so every reason is
//! truncated before it is persisted.

/// Maximum number of characters stored in `video_tasks.error_message`.
pub const MAX_ERROR_MESSAGE_CHARS: usize = 500;

/// Creation succeeded at the HTTP level but the response carried no task id.
pub const NO_TASK_ID: &str = "Provider returned no task id";

/// The provider reported success but neither result shape held a URL.
pub const NO_VIDEO_URL: &str = "Provider reported success without a video URL";

/// The provider reported failure without giving a reason.
pub const GENERATION_FAILED: &str = "Video generation failed";

/// The batch's task rows could not be read after escrow.
pub const TASK_READ_FAILED: &str = "Could not load batch tasks";

/// A task was left `processing` without a remote id by an invocation that
/// did not finish, so its creation call may or may not have gone through.
pub const DISPATCH_INTERRUPTED: &str = "Dispatch interrupted before a task id was recorded";

/// Truncate a failure reason to [`MAX_ERROR_MESSAGE_CHARS`] characters.
///
/// Cuts on a `char` boundary so multi-byte provider messages stay valid UTF-8.
pub fn truncate_reason(reason: &str) -> String {
    let trimmed = reason.trim();
    match trimmed.char_indices().nth(MAX_ERROR_MESSAGE_CHARS) {
        Some((byte_idx, _)) => trimmed[..byte_idx].to_string(),
        None => trimmed.to_string(),
    }
}

/// Build a reason from an optional provider message, falling back to
/// [`GENERATION_FAILED`] when the provider gave nothing useful.
pub fn reason_or_generic(reason: Option<&str>) -> String {
    match reason.map(str::trim) {
        Some(r) if !r.is_empty() => truncate_reason(r),
        _ => GENERATION_FAILED.to_string(),
    }
}

//! Video task entity: one generation request within a batch.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use vidbatch_core::types::{DbId, Timestamp};

use super::status::{StatusId, VideoTaskStatus};

/// A row from the `video_tasks` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct VideoTask {
    pub id: DbId,
    pub batch_job_id: DbId,
    pub batch_index: i32,
    pub model: String,
    pub prompt: String,
    pub reference_url: Option<String>,
    pub aspect_ratio: Option<String>,
    pub duration: Option<i32>,
    /// Model-specific extras, e.g. `firstFrameUrl` / `lastFrameUrl` / `urls`.
    pub meta: serde_json::Value,
    pub grsai_task_id: Option<String>,
    pub status_id: StatusId,
    pub progress: i16,
    pub video_url: Option<String>,
    pub error_message: Option<String>,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl VideoTask {
    pub fn status(&self) -> Option<VideoTaskStatus> {
        VideoTaskStatus::from_id(self.status_id)
    }

    /// Not yet sent to the provider: pending/queued with no remote id.
    pub fn is_dispatchable(&self) -> bool {
        self.grsai_task_id.is_none() && self.status().is_some_and(VideoTaskStatus::is_dispatchable)
    }

    /// Sent to the provider and awaiting a result.
    pub fn is_in_flight(&self) -> bool {
        self.grsai_task_id.is_some() && self.status() == Some(VideoTaskStatus::Processing)
    }
}

/// DTO for one task of a new batch.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateVideoTask {
    pub model: String,
    pub prompt: String,
    pub reference_url: Option<String>,
    pub aspect_ratio: Option<String>,
    pub duration: Option<i32>,
    pub meta: Option<serde_json::Value>,
}

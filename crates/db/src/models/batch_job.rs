//! Batch job entity and the DTOs used to enqueue one.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use vidbatch_core::settlement::required_credits;
use vidbatch_core::types::{Credits, DbId, Timestamp};

use super::status::{BatchJobStatus, SettlementStatus, StatusId};
use super::video_task::CreateVideoTask;

/// A row from the `batch_jobs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BatchJob {
    pub id: DbId,
    pub user_id: DbId,
    pub status_id: StatusId,
    pub settlement_status_id: StatusId,
    pub total_count: i32,
    pub cost_per_video: Credits,
    pub success_count: i32,
    pub failed_count: i32,
    pub credits_spent: Credits,
    /// Number of invocations that have claimed this batch.
    pub claim_count: i32,
    pub claimed_at: Option<Timestamp>,
    pub lease_expires_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl BatchJob {
    /// Credits escrowed for this batch: `total_count * cost_per_video`.
    pub fn required_credits(&self) -> Credits {
        required_credits(self.total_count, self.cost_per_video)
    }

    /// Whether an earlier invocation already claimed this batch, so credits
    /// may already be held for it.
    pub fn is_resumed(&self) -> bool {
        self.claim_count > 1
    }

    pub fn status(&self) -> Option<BatchJobStatus> {
        BatchJobStatus::from_id(self.status_id)
    }

    pub fn settlement_status(&self) -> Option<SettlementStatus> {
        SettlementStatus::from_id(self.settlement_status_id)
    }
}

/// Unsettled batch counts, reported by the health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow, Serialize)]
pub struct BatchBacklog {
    pub queued: i64,
    pub processing: i64,
}

/// DTO for enqueueing a batch together with its tasks.
///
/// `total_count` is taken from the number of tasks and each task's
/// `batch_index` from its position in `tasks`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBatchJob {
    pub user_id: DbId,
    pub cost_per_video: Credits,
    pub tasks: Vec<CreateVideoTask>,
}

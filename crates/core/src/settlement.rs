//! Credit settlement arithmetic for batch jobs.
//!
//! A batch escrows `total_count * cost_per_video` credits up front. Once every
//! task is terminal, only the successful ones are charged and the rest of the
//! hold is released. Everything in this module is pure so the reconciler and
//! the short-circuit paths share one definition of "what a settled batch
//! looks like".

use crate::types::Credits;

/// Terminal status of a batch after settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Every task succeeded.
    Completed,
    /// Some tasks succeeded, some failed.
    Partial,
    /// No task succeeded.
    Failed,
}

/// How the escrowed credits were resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementKind {
    /// Less than the escrowed amount was spent; the remainder went back.
    Refunded,
    /// The spend equals the escrowed amount (or nothing was escrowed).
    Finalized,
}

/// The complete set of values written to a batch when it settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    pub success_count: i32,
    pub failed_count: i32,
    pub credits_spent: Credits,
    pub credits_required: Credits,
    pub outcome: BatchOutcome,
    pub kind: SettlementKind,
}

impl Settlement {
    /// Credits released back to the user by this settlement.
    pub fn credits_released(&self) -> Credits {
        self.credits_required - self.credits_spent
    }
}

/// Total credits a batch escrows before any remote work starts.
pub fn required_credits(total_count: i32, cost_per_video: Credits) -> Credits {
    Credits::from(total_count.max(0)) * cost_per_video.max(0)
}

/// Derive the batch status from terminal task counts.
pub fn derive_outcome(succeeded: i32, failed: i32) -> BatchOutcome {
    if succeeded == 0 {
        BatchOutcome::Failed
    } else if failed == 0 {
        BatchOutcome::Completed
    } else {
        BatchOutcome::Partial
    }
}

/// Derive the settlement status from spend versus escrow.
pub fn derive_kind(spent: Credits, required: Credits) -> SettlementKind {
    if spent < required {
        SettlementKind::Refunded
    } else {
        SettlementKind::Finalized
    }
}

/// Compute the settlement for a batch, or `None` while tasks are still
/// pending or in flight.
///
/// Returns `None` whenever `succeeded + failed != total_count`, which also
/// covers inconsistent counts larger than the batch size.
pub fn settle(
    total_count: i32,
    cost_per_video: Credits,
    succeeded: i32,
    failed: i32,
) -> Option<Settlement> {
    if succeeded < 0 || failed < 0 || succeeded + failed != total_count {
        return None;
    }

    let required = required_credits(total_count, cost_per_video);
    let spent = Credits::from(succeeded) * cost_per_video.max(0);

    Some(Settlement {
        success_count: succeeded,
        failed_count: failed,
        credits_spent: spent,
        credits_required: required,
        outcome: derive_outcome(succeeded, failed),
        kind: derive_kind(spent, required),
    })
}

/// Settlement for a batch whose escrow could not be established.
///
/// Nothing was frozen, so nothing is refunded: the batch is closed as
/// `failed` / `finalized` with zero spend.
pub fn unfunded_failure(total_count: i32, cost_per_video: Credits) -> Settlement {
    Settlement {
        success_count: 0,
        failed_count: total_count,
        credits_spent: 0,
        credits_required: required_credits(total_count, cost_per_video),
        outcome: BatchOutcome::Failed,
        kind: SettlementKind::Finalized,
    }
}

/// Settlement for a funded batch abandoned before any task could run.
///
/// The whole hold goes back to the user.
pub fn abandoned_failure(total_count: i32, cost_per_video: Credits) -> Settlement {
    let required = required_credits(total_count, cost_per_video);
    Settlement {
        success_count: 0,
        failed_count: total_count,
        credits_spent: 0,
        credits_required: required,
        outcome: BatchOutcome::Failed,
        kind: derive_kind(0, required),
    }
}

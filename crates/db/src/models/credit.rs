//! Credit ledger entities and the outcomes of escrow operations.

use serde::Serialize;
use sqlx::FromRow;
use vidbatch_core::types::{Credits, DbId, Timestamp};

use super::status::StatusId;

/// A row from the `credit_accounts` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CreditAccount {
    pub user_id: DbId,
    /// Spendable credits, excluding anything currently frozen.
    pub balance: Credits,
    pub frozen: Credits,
    pub updated_at: Timestamp,
}

/// A row from the `credit_holds` table. One per funded batch.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CreditHold {
    pub batch_job_id: DbId,
    pub user_id: DbId,
    pub amount: Credits,
    /// Set when the hold is settled.
    pub spent: Option<Credits>,
    pub status_id: StatusId,
    pub created_at: Timestamp,
    pub settled_at: Option<Timestamp>,
}

/// A row from the `credit_ledger_entries` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CreditLedgerEntry {
    pub id: DbId,
    pub user_id: DbId,
    pub batch_job_id: Option<DbId>,
    pub kind: String,
    pub amount: Credits,
    pub created_at: Timestamp,
}

/// Ledger entry kinds, as stored in `credit_ledger_entries.kind`.
pub mod entry_kind {
    pub const DEPOSIT: &str = "deposit";
    pub const FREEZE: &str = "freeze";
    pub const SPEND: &str = "spend";
    pub const RELEASE: &str = "release";
}

/// Result of a freeze request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreezeResult {
    /// A new hold was created and the balance reduced.
    Frozen,
    /// A hold for this batch already exists; nothing changed.
    AlreadyFrozen,
    /// The balance cannot cover the hold; nothing changed.
    InsufficientBalance { balance: Credits, required: Credits },
}

impl FreezeResult {
    /// Whether the batch is funded after this call.
    pub fn is_ok(self) -> bool {
        matches!(self, FreezeResult::Frozen | FreezeResult::AlreadyFrozen)
    }
}

/// Result of a finalize request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeResult {
    /// The hold was settled: `spent` charged, `released` returned.
    Settled { spent: Credits, released: Credits },
    /// The hold was already settled by an earlier call.
    AlreadySettled,
    /// No hold exists for this batch.
    NoHold,
}

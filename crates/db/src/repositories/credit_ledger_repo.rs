//! Repository for the credit ledger: accounts, per-batch holds and entries.
//!
//! Freeze and finalize are keyed by batch id and run in a transaction that
//! locks the account row first, so concurrent calls for the same user
//! serialize and repeated calls for the same batch are no-ops.

use sqlx::{PgPool, Postgres, Transaction};
use vidbatch_core::types::{Credits, DbId};

use crate::models::credit::{
    entry_kind, CreditAccount, CreditHold, CreditLedgerEntry, FinalizeResult, FreezeResult,
};
use crate::models::status::CreditHoldStatus;

/// Column list for `credit_accounts` queries.
const ACCOUNT_COLUMNS: &str = "user_id, balance, frozen, updated_at";

/// Column list for `credit_holds` queries.
const HOLD_COLUMNS: &str =
    "batch_job_id, user_id, amount, spent, status_id, created_at, settled_at";

/// Column list for `credit_ledger_entries` queries.
const ENTRY_COLUMNS: &str = "id, user_id, batch_job_id, kind, amount, created_at";

/// Provides escrow operations against user credit balances.
pub struct CreditLedgerRepo;

impl CreditLedgerRepo {
    /// Add credits to a user's balance, creating the account if needed.
    pub async fn deposit(
        pool: &PgPool,
        user_id: DbId,
        amount: Credits,
    ) -> Result<CreditAccount, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO credit_accounts (user_id, balance) VALUES ($1, $2) \
             ON CONFLICT (user_id) DO UPDATE \
                 SET balance = credit_accounts.balance + EXCLUDED.balance, updated_at = NOW() \
             RETURNING {ACCOUNT_COLUMNS}"
        );
        let account = sqlx::query_as::<_, CreditAccount>(&query)
            .bind(user_id)
            .bind(amount)
            .fetch_one(&mut *tx)
            .await?;

        Self::insert_entry(&mut tx, user_id, None, entry_kind::DEPOSIT, amount).await?;

        tx.commit().await?;
        Ok(account)
    }

    pub async fn find_account(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Option<CreditAccount>, sqlx::Error> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM credit_accounts WHERE user_id = $1");
        sqlx::query_as::<_, CreditAccount>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_hold(
        pool: &PgPool,
        batch_job_id: DbId,
    ) -> Result<Option<CreditHold>, sqlx::Error> {
        let query = format!("SELECT {HOLD_COLUMNS} FROM credit_holds WHERE batch_job_id = $1");
        sqlx::query_as::<_, CreditHold>(&query)
            .bind(batch_job_id)
            .fetch_optional(pool)
            .await
    }

    /// Ledger entries for a batch, oldest first.
    pub async fn list_entries_for_batch(
        pool: &PgPool,
        batch_job_id: DbId,
    ) -> Result<Vec<CreditLedgerEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {ENTRY_COLUMNS} FROM credit_ledger_entries \
             WHERE batch_job_id = $1 ORDER BY id ASC"
        );
        sqlx::query_as::<_, CreditLedgerEntry>(&query)
            .bind(batch_job_id)
            .fetch_all(pool)
            .await
    }

    /// Move `amount` from the user's balance into a hold for the batch.
    ///
    /// Idempotent by batch: if a hold already exists, nothing changes and
    /// [`FreezeResult::AlreadyFrozen`] is returned.
    pub async fn freeze(
        pool: &PgPool,
        batch_job_id: DbId,
        user_id: DbId,
        amount: Credits,
    ) -> Result<FreezeResult, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let account = Self::lock_account(&mut tx, user_id).await?;

        let existing = sqlx::query_scalar::<_, DbId>(
            "SELECT batch_job_id FROM credit_holds WHERE batch_job_id = $1",
        )
        .bind(batch_job_id)
        .fetch_optional(&mut *tx)
        .await?;
        if existing.is_some() {
            return Ok(FreezeResult::AlreadyFrozen);
        }

        if account.balance < amount {
            return Ok(FreezeResult::InsufficientBalance {
                balance: account.balance,
                required: amount,
            });
        }

        sqlx::query(
            "UPDATE credit_accounts \
             SET balance = balance - $2, frozen = frozen + $2, updated_at = NOW() \
             WHERE user_id = $1",
        )
        .bind(user_id)
        .bind(amount)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO credit_holds (batch_job_id, user_id, amount, status_id) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(batch_job_id)
        .bind(user_id)
        .bind(amount)
        .bind(CreditHoldStatus::Frozen.id())
        .execute(&mut *tx)
        .await?;

        Self::insert_entry(&mut tx, user_id, Some(batch_job_id), entry_kind::FREEZE, amount)
            .await?;

        tx.commit().await?;
        Ok(FreezeResult::Frozen)
    }

    /// Settle the batch's hold: charge `spent` and return the remainder.
    ///
    /// Idempotent by batch: a settled hold is left untouched and
    /// [`FinalizeResult::AlreadySettled`] is returned. A `spent` above the
    /// held amount is clamped to the hold.
    pub async fn finalize(
        pool: &PgPool,
        batch_job_id: DbId,
        user_id: DbId,
        spent: Credits,
    ) -> Result<FinalizeResult, sqlx::Error> {
        let mut tx = pool.begin().await?;

        Self::lock_account(&mut tx, user_id).await?;

        let query = format!(
            "SELECT {HOLD_COLUMNS} FROM credit_holds \
             WHERE batch_job_id = $1 AND user_id = $2 \
             FOR UPDATE"
        );
        let hold = sqlx::query_as::<_, CreditHold>(&query)
            .bind(batch_job_id)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(hold) = hold else {
            return Ok(FinalizeResult::NoHold);
        };
        if hold.status_id == CreditHoldStatus::Settled.id() {
            return Ok(FinalizeResult::AlreadySettled);
        }

        if spent > hold.amount {
            tracing::warn!(
                batch_id = batch_job_id,
                spent,
                held = hold.amount,
                "Spend exceeds hold, charging the held amount",
            );
        }
        let spent = spent.clamp(0, hold.amount);
        let released = hold.amount - spent;

        sqlx::query(
            "UPDATE credit_accounts \
             SET frozen = frozen - $2, balance = balance + $3, updated_at = NOW() \
             WHERE user_id = $1",
        )
        .bind(user_id)
        .bind(hold.amount)
        .bind(released)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE credit_holds SET spent = $2, status_id = $3, settled_at = NOW() \
             WHERE batch_job_id = $1",
        )
        .bind(batch_job_id)
        .bind(spent)
        .bind(CreditHoldStatus::Settled.id())
        .execute(&mut *tx)
        .await?;

        if spent > 0 {
            Self::insert_entry(&mut tx, user_id, Some(batch_job_id), entry_kind::SPEND, spent)
                .await?;
        }
        if released > 0 {
            Self::insert_entry(
                &mut tx,
                user_id,
                Some(batch_job_id),
                entry_kind::RELEASE,
                released,
            )
            .await?;
        }

        tx.commit().await?;
        Ok(FinalizeResult::Settled { spent, released })
    }

    // ---- private helpers ----

    /// Lock the user's account row, creating an empty account if none exists.
    async fn lock_account(
        tx: &mut Transaction<'_, Postgres>,
        user_id: DbId,
    ) -> Result<CreditAccount, sqlx::Error> {
        sqlx::query("INSERT INTO credit_accounts (user_id) VALUES ($1) ON CONFLICT DO NOTHING")
            .bind(user_id)
            .execute(&mut **tx)
            .await?;

        let query = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM credit_accounts WHERE user_id = $1 FOR UPDATE"
        );
        sqlx::query_as::<_, CreditAccount>(&query)
            .bind(user_id)
            .fetch_one(&mut **tx)
            .await
    }

    async fn insert_entry(
        tx: &mut Transaction<'_, Postgres>,
        user_id: DbId,
        batch_job_id: Option<DbId>,
        kind: &str,
        amount: Credits,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO credit_ledger_entries (user_id, batch_job_id, kind, amount) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(user_id)
        .bind(batch_job_id)
        .bind(kind)
        .bind(amount)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

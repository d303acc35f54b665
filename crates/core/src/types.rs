/// Batch, task and user keys are PostgreSQL BIGSERIAL / BIGINT.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Credit amounts. Signed so ledger deltas can be expressed directly.
pub type Credits = i64;

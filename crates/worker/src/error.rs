/// Failure of a [`JobStore`](crate::store::JobStore) or
/// [`CreditLedger`](crate::store::CreditLedger) call.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Backend unavailable for a reason other than a database error.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Errors that end a whole invocation.
///
/// Everything narrower is contained at task or batch scope and reported
/// through row state, not through this type.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Failed to claim batches: {0}")]
    Claim(#[source] StoreError),
}

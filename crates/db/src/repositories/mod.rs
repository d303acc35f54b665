//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods
//! that accept `&PgPool` as the first argument.

pub mod batch_job_repo;
pub mod credit_ledger_repo;
pub mod video_task_repo;

pub use batch_job_repo::BatchJobRepo;
pub use credit_ledger_repo::CreditLedgerRepo;
pub use video_task_repo::VideoTaskRepo;

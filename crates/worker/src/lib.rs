//! Batch video-generation worker.
//!
//! One invocation runs the pipeline below over a handful of claimed batches:
//!
//! 1. [`scheduler`] -- atomically claim queued (or lease-expired) batches.
//! 2. [`escrow`] -- freeze the batch's credits, or close it as unfunded.
//! 3. [`dispatcher`] -- create remote tasks under a concurrency cap.
//! 4. [`completion`] -- poll in-flight tasks when no callback URL is public.
//! 5. [`reconciler`] -- settle batches whose tasks are all terminal.
//!
//! [`invocation::BatchWorker`] ties the steps together. All state lives in
//! the [`store::JobStore`] and [`store::CreditLedger`]; nothing is kept in
//! memory between invocations.

pub mod completion;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod escrow;
pub mod invocation;
pub mod reconciler;
pub mod scheduler;
pub mod store;

pub use config::WorkerConfig;
pub use error::{StoreError, WorkerError};
pub use invocation::{BatchWorker, InvocationReport};
pub use store::{CreditLedger, JobStore, PgCreditLedger, PgJobStore};

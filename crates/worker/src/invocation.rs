//! Invocation orchestrator and the standalone timer loop.
//!
//! An invocation claims a few batches and walks each one, in claim order,
//! through escrow, dispatch, polling (poll mode only) and reconciliation.
//! Only a claim failure aborts the run; everything else is contained at
//! task or batch scope.

use std::sync::Arc;

use serde::Serialize;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;
use vidbatch_core::callback::CompletionMode;
use vidbatch_db::models::batch_job::BatchJob;
use vidbatch_db::models::status::VideoTaskStatus;
use vidbatch_provider::VideoProvider;

use crate::completion::poll_tasks;
use crate::config::WorkerConfig;
use crate::dispatcher::{dispatch_batch, stale_cutoff, DispatchContext};
use crate::error::WorkerError;
use crate::escrow::{secure_funds, EscrowOutcome};
use crate::reconciler;
use crate::scheduler::claim_batches;
use crate::store::{CreditLedger, JobStore, PgCreditLedger, PgJobStore};

/// Summary of one invocation, returned by the trigger endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InvocationReport {
    pub invocation_id: Uuid,
    /// `"webhook"` or `"poll"`.
    pub mode: &'static str,
    /// Batches claimed.
    pub claimed: usize,
    /// Batches whose credits are held.
    pub frozen: usize,
    /// Batches closed because their credits could not be frozen.
    pub freeze_failed: usize,
    /// Resumed batches left open because the ledger could not be reached.
    pub deferred: usize,
    /// Batches with at least one dispatch attempt.
    pub dispatched: usize,
    /// Batches with at least one in-flight task polled.
    pub polled: usize,
    /// Batches settled by this invocation.
    pub settled: usize,
    pub tasks_dispatched: usize,
    pub tasks_dispatch_failed: usize,
    pub tasks_polled: usize,
    pub tasks_completed: usize,
}

/// Runs invocations against a job store, credit ledger and provider.
pub struct BatchWorker {
    store: Arc<dyn JobStore>,
    ledger: Arc<dyn CreditLedger>,
    provider: Arc<dyn VideoProvider>,
    config: WorkerConfig,
}

impl BatchWorker {
    pub fn new(
        store: Arc<dyn JobStore>,
        ledger: Arc<dyn CreditLedger>,
        provider: Arc<dyn VideoProvider>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            store,
            ledger,
            provider,
            config,
        }
    }

    /// Worker backed by PostgreSQL for both jobs and credits.
    pub fn postgres(pool: PgPool, provider: Arc<dyn VideoProvider>, config: WorkerConfig) -> Self {
        Self::new(
            Arc::new(PgJobStore::new(pool.clone())),
            Arc::new(PgCreditLedger::new(pool)),
            provider,
            config,
        )
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Run the invocation on a fixed interval until the token is cancelled.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.interval);
        tracing::info!(
            interval_secs = self.config.interval.as_secs(),
            claim_limit = self.config.claim_limit,
            task_concurrency = self.config.task_concurrency,
            "Batch worker started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Batch worker shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.run_invocation().await {
                        tracing::error!(error = %e, "Invocation failed");
                    }
                }
            }
        }
    }

    /// Run one invocation.
    ///
    /// The completion mode is fixed up front and applies to every batch in
    /// the run.
    pub async fn run_invocation(&self) -> Result<InvocationReport, WorkerError> {
        let mode = self.config.completion_mode();
        let invocation_id = Uuid::now_v7();
        let span = tracing::info_span!(
            "invocation",
            invocation_id = %invocation_id,
            mode = mode.as_str(),
        );

        async {
            let mut report = InvocationReport {
                invocation_id,
                mode: mode.as_str(),
                ..InvocationReport::default()
            };

            let batches = claim_batches(
                self.store.as_ref(),
                self.config.claim_limit,
                self.config.lease_secs,
            )
            .await?;
            report.claimed = batches.len();

            for batch in &batches {
                self.process_batch(batch, &mode, &mut report).await;
            }

            tracing::info!(
                claimed = report.claimed,
                frozen = report.frozen,
                freeze_failed = report.freeze_failed,
                deferred = report.deferred,
                dispatched = report.dispatched,
                polled = report.polled,
                settled = report.settled,
                "Invocation finished",
            );
            Ok::<_, WorkerError>(report)
        }
        .instrument(span)
        .await
    }

    async fn process_batch(
        &self,
        batch: &BatchJob,
        mode: &CompletionMode,
        report: &mut InvocationReport,
    ) {
        let store = self.store.as_ref();
        let ledger = self.ledger.as_ref();

        match secure_funds(store, ledger, batch).await {
            EscrowOutcome::Funded => report.frozen += 1,
            EscrowOutcome::Unfunded { closed, .. } => {
                report.freeze_failed += 1;
                if !closed {
                    self.release(batch).await;
                }
                return;
            }
            EscrowOutcome::Deferred { .. } => {
                report.deferred += 1;
                self.release(batch).await;
                return;
            }
        }

        let tasks = match store.list_tasks(batch.id).await {
            Ok(tasks) => tasks,
            Err(e) => {
                tracing::error!(batch_id = batch.id, error = %e, "Failed to read batch tasks");
                match reconciler::abandon(store, ledger, batch).await {
                    Ok(Some(_)) => report.settled += 1,
                    Ok(None) => {}
                    Err(e) => {
                        tracing::error!(batch_id = batch.id, error = %e, "Failed to abandon batch");
                        self.release(batch).await;
                    }
                }
                return;
            }
        };

        let ctx = DispatchContext {
            store,
            provider: self.provider.as_ref(),
            mode,
            signing_secret: self.config.webhook_signing_secret.as_deref(),
            concurrency: self.config.task_concurrency,
            stale_before: stale_cutoff(self.config.lease_secs),
        };
        let dispatch = dispatch_batch(&ctx, &tasks).await;
        if dispatch.attempted() > 0 {
            report.dispatched += 1;
        }
        report.tasks_dispatched += dispatch.dispatched;
        report.tasks_dispatch_failed += dispatch.failed;

        if mode.is_poll() {
            match store
                .list_tasks_with_status(batch.id, &[VideoTaskStatus::Processing])
                .await
            {
                Ok(in_flight) => {
                    let stats = poll_tasks(store, self.provider.as_ref(), &in_flight).await;
                    if stats.polled > 0 {
                        report.polled += 1;
                    }
                    report.tasks_polled += stats.polled;
                    report.tasks_completed += stats.completed;
                }
                Err(e) => {
                    tracing::warn!(batch_id = batch.id, error = %e, "Failed to list in-flight tasks");
                }
            }
        }

        match reconciler::reconcile(store, ledger, batch).await {
            Ok(Some(_)) => report.settled += 1,
            Ok(None) => self.release(batch).await,
            Err(e) => {
                tracing::warn!(
                    batch_id = batch.id,
                    error = %e,
                    "Reconciliation failed, leaving batch for a later invocation",
                );
                self.release(batch).await;
            }
        }
    }

    async fn release(&self, batch: &BatchJob) {
        if let Err(e) = self.store.release_batch(batch.id).await {
            tracing::warn!(batch_id = batch.id, error = %e, "Failed to release batch lease");
        }
    }
}

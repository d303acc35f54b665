//! In-memory fakes for the worker's store, ledger and provider seams.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use vidbatch_core::settlement::Settlement;
use vidbatch_core::types::{Credits, DbId};
use vidbatch_db::models::batch_job::BatchJob;
use vidbatch_db::models::credit::{FinalizeResult, FreezeResult};
use vidbatch_db::models::status::{BatchJobStatus, SettlementStatus, VideoTaskStatus};
use vidbatch_db::models::video_task::VideoTask;
use vidbatch_provider::{CreateTaskRequest, ProviderError, ResultEnvelope, VideoProvider};
use vidbatch_worker::{BatchWorker, CreditLedger, JobStore, StoreError, WorkerConfig};

// ---------------------------------------------------------------------------
// Row builders
// ---------------------------------------------------------------------------

pub fn new_batch(id: DbId, user_id: DbId, total_count: i32, cost_per_video: Credits) -> BatchJob {
    let now = Utc::now();
    BatchJob {
        id,
        user_id,
        status_id: BatchJobStatus::Queued.id(),
        settlement_status_id: SettlementStatus::Pending.id(),
        total_count,
        cost_per_video,
        success_count: 0,
        failed_count: 0,
        credits_spent: 0,
        claim_count: 0,
        claimed_at: None,
        lease_expires_at: None,
        completed_at: None,
        created_at: now + chrono::Duration::milliseconds(id),
        updated_at: now,
    }
}

pub fn new_task(id: DbId, batch_job_id: DbId, batch_index: i32, model: &str) -> VideoTask {
    let now = Utc::now();
    VideoTask {
        id,
        batch_job_id,
        batch_index,
        model: model.to_string(),
        prompt: format!("prompt {id}"),
        reference_url: None,
        aspect_ratio: Some("16:9".to_string()),
        duration: Some(10),
        meta: json!({}),
        grsai_task_id: None,
        status_id: VideoTaskStatus::Pending.id(),
        progress: 0,
        video_url: None,
        error_message: None,
        completed_at: None,
        created_at: now,
        updated_at: now,
    }
}

/// Remote id the scripted provider assigns to a task by default.
pub fn remote_id(task_id: DbId) -> String {
    format!("remote-{task_id}")
}

// ---------------------------------------------------------------------------
// Job store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryStore {
    pub batches: Mutex<Vec<BatchJob>>,
    pub tasks: Mutex<Vec<VideoTask>>,
    pub fail_claim: AtomicBool,
    /// `list_tasks` calls with an index at or above this fail.
    pub fail_list_tasks_from: AtomicUsize,
    pub list_tasks_calls: AtomicUsize,
    pub settle_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        let store = Self::default();
        store.fail_list_tasks_from.store(usize::MAX, Ordering::SeqCst);
        Arc::new(store)
    }

    /// Insert a batch with `models.len()` tasks; task ids are `batch_id * 100 + index`.
    pub fn seed(&self, batch_id: DbId, user_id: DbId, cost: Credits, models: &[&str]) {
        self.batches
            .lock()
            .unwrap()
            .push(new_batch(batch_id, user_id, models.len() as i32, cost));
        let mut tasks = self.tasks.lock().unwrap();
        for (i, model) in models.iter().enumerate() {
            tasks.push(new_task(batch_id * 100 + i as DbId, batch_id, i as i32, model));
        }
    }

    pub fn batch(&self, id: DbId) -> BatchJob {
        self.batches
            .lock()
            .unwrap()
            .iter()
            .find(|b| b.id == id)
            .cloned()
            .expect("batch exists")
    }

    pub fn task(&self, id: DbId) -> VideoTask {
        self.tasks
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .expect("task exists")
    }

    pub fn update_task(&self, id: DbId, f: impl FnOnce(&mut VideoTask)) {
        let mut tasks = self.tasks.lock().unwrap();
        let task = tasks.iter_mut().find(|t| t.id == id).expect("task exists");
        f(task);
    }

    fn with_task<T>(&self, id: DbId, f: impl FnOnce(&mut VideoTask) -> T) -> Result<T, StoreError> {
        let mut tasks = self.tasks.lock().unwrap();
        let task = tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| StoreError::Unavailable(format!("no task {id}")))?;
        Ok(f(task))
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn claim(&self, limit: i64, lease_secs: i64) -> Result<Vec<BatchJob>, StoreError> {
        if self.fail_claim.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("claim refused".into()));
        }
        let now = Utc::now();
        let mut batches = self.batches.lock().unwrap();
        batches.sort_by_key(|b| (b.created_at, b.id));

        let mut claimed = Vec::new();
        for batch in batches.iter_mut() {
            if claimed.len() as i64 >= limit {
                break;
            }
            let claimable = batch.status_id == BatchJobStatus::Queued.id()
                || (batch.status_id == BatchJobStatus::Processing.id()
                    && batch.lease_expires_at.map_or(true, |at| at < now));
            if claimable {
                batch.status_id = BatchJobStatus::Processing.id();
                batch.claim_count += 1;
                batch.claimed_at = Some(now);
                batch.lease_expires_at = Some(now + chrono::Duration::seconds(lease_secs));
                claimed.push(batch.clone());
            }
        }
        Ok(claimed)
    }

    async fn list_tasks(&self, batch_id: DbId) -> Result<Vec<VideoTask>, StoreError> {
        let call = self.list_tasks_calls.fetch_add(1, Ordering::SeqCst);
        if call >= self.fail_list_tasks_from.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("task read refused".into()));
        }
        let mut tasks: Vec<VideoTask> = self
            .tasks
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.batch_job_id == batch_id)
            .cloned()
            .collect();
        tasks.sort_by_key(|t| t.batch_index);
        Ok(tasks)
    }

    async fn list_tasks_with_status(
        &self,
        batch_id: DbId,
        statuses: &[VideoTaskStatus],
    ) -> Result<Vec<VideoTask>, StoreError> {
        let mut tasks: Vec<VideoTask> = self
            .tasks
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.batch_job_id == batch_id)
            .filter(|t| statuses.iter().any(|s| s.id() == t.status_id))
            .cloned()
            .collect();
        tasks.sort_by_key(|t| t.batch_index);
        Ok(tasks)
    }

    async fn mark_task_processing(&self, task_id: DbId) -> Result<bool, StoreError> {
        self.with_task(task_id, |t| {
            if t.is_dispatchable() {
                t.status_id = VideoTaskStatus::Processing.id();
                t.updated_at = Utc::now();
                true
            } else {
                false
            }
        })
    }

    async fn record_remote_id(&self, task_id: DbId, remote_id: &str) -> Result<bool, StoreError> {
        self.with_task(task_id, |t| {
            if t.status_id == VideoTaskStatus::Processing.id() {
                t.grsai_task_id = Some(remote_id.to_string());
                t.error_message = None;
                true
            } else {
                false
            }
        })
    }

    async fn fail_task(&self, task_id: DbId, reason: &str) -> Result<bool, StoreError> {
        self.with_task(task_id, |t| {
            if t.status_id == VideoTaskStatus::Processing.id() {
                t.status_id = VideoTaskStatus::Failed.id();
                t.error_message = Some(reason.to_string());
                t.video_url = None;
                t.completed_at = Some(Utc::now());
                true
            } else {
                false
            }
        })
    }

    async fn succeed_task(&self, task_id: DbId, video_url: &str) -> Result<bool, StoreError> {
        self.with_task(task_id, |t| {
            if t.status_id == VideoTaskStatus::Processing.id() {
                t.status_id = VideoTaskStatus::Succeeded.id();
                t.video_url = Some(video_url.to_string());
                t.error_message = None;
                t.progress = 100;
                t.completed_at = Some(Utc::now());
                true
            } else {
                false
            }
        })
    }

    async fn record_progress(&self, task_id: DbId, progress: i16) -> Result<(), StoreError> {
        self.with_task(task_id, |t| {
            if t.status_id == VideoTaskStatus::Processing.id() {
                t.progress = progress;
            }
        })
    }

    async fn settle_batch(
        &self,
        batch_id: DbId,
        settlement: &Settlement,
    ) -> Result<bool, StoreError> {
        self.settle_calls.fetch_add(1, Ordering::SeqCst);
        let mut batches = self.batches.lock().unwrap();
        let Some(batch) = batches.iter_mut().find(|b| b.id == batch_id) else {
            return Ok(false);
        };
        if batch.status_id != BatchJobStatus::Processing.id() {
            return Ok(false);
        }
        batch.status_id = BatchJobStatus::from(settlement.outcome).id();
        batch.settlement_status_id = SettlementStatus::from(settlement.kind).id();
        batch.success_count = settlement.success_count;
        batch.failed_count = settlement.failed_count;
        batch.credits_spent = settlement.credits_spent;
        batch.completed_at = Some(Utc::now());
        batch.lease_expires_at = None;
        Ok(true)
    }

    async fn release_batch(&self, batch_id: DbId) -> Result<(), StoreError> {
        let mut batches = self.batches.lock().unwrap();
        if let Some(batch) = batches
            .iter_mut()
            .find(|b| b.id == batch_id && b.status_id == BatchJobStatus::Processing.id())
        {
            batch.lease_expires_at = None;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Credit ledger
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hold {
    pub user_id: DbId,
    pub amount: Credits,
    pub spent: Option<Credits>,
}

#[derive(Default)]
pub struct MemoryLedger {
    pub balances: Mutex<HashMap<DbId, Credits>>,
    pub holds: Mutex<HashMap<DbId, Hold>>,
    pub fail_freeze: AtomicBool,
    pub freeze_calls: AtomicUsize,
    pub finalize_calls: Mutex<Vec<(DbId, Credits)>>,
}

impl MemoryLedger {
    pub fn with_balance(user_id: DbId, balance: Credits) -> Arc<Self> {
        let ledger = Self::default();
        ledger.balances.lock().unwrap().insert(user_id, balance);
        Arc::new(ledger)
    }

    pub fn balance(&self, user_id: DbId) -> Credits {
        self.balances.lock().unwrap().get(&user_id).copied().unwrap_or(0)
    }

    pub fn hold(&self, batch_id: DbId) -> Option<Hold> {
        self.holds.lock().unwrap().get(&batch_id).copied()
    }
}

#[async_trait]
impl CreditLedger for MemoryLedger {
    async fn freeze(
        &self,
        batch_id: DbId,
        user_id: DbId,
        amount: Credits,
    ) -> Result<FreezeResult, StoreError> {
        self.freeze_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_freeze.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("ledger down".into()));
        }
        let mut holds = self.holds.lock().unwrap();
        if holds.contains_key(&batch_id) {
            return Ok(FreezeResult::AlreadyFrozen);
        }
        let mut balances = self.balances.lock().unwrap();
        let balance = balances.entry(user_id).or_insert(0);
        if *balance < amount {
            return Ok(FreezeResult::InsufficientBalance {
                balance: *balance,
                required: amount,
            });
        }
        *balance -= amount;
        holds.insert(
            batch_id,
            Hold {
                user_id,
                amount,
                spent: None,
            },
        );
        Ok(FreezeResult::Frozen)
    }

    async fn finalize(
        &self,
        batch_id: DbId,
        user_id: DbId,
        spent: Credits,
    ) -> Result<FinalizeResult, StoreError> {
        self.finalize_calls.lock().unwrap().push((batch_id, spent));
        let mut holds = self.holds.lock().unwrap();
        let Some(hold) = holds.get_mut(&batch_id) else {
            return Ok(FinalizeResult::NoHold);
        };
        if hold.spent.is_some() {
            return Ok(FinalizeResult::AlreadySettled);
        }
        let spent = spent.clamp(0, hold.amount);
        let released = hold.amount - spent;
        hold.spent = Some(spent);
        *self.balances.lock().unwrap().entry(user_id).or_insert(0) += released;
        Ok(FinalizeResult::Settled { spent, released })
    }
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// Scripted creation response for one task, keyed by prompt.
#[derive(Debug, Clone)]
pub enum CreateScript {
    MissingId,
    HttpError(u16),
}

/// Scripted result response for one remote task.
#[derive(Debug, Clone)]
pub enum ResultScript {
    Envelope(serde_json::Value),
    TransportError,
}

#[derive(Default)]
pub struct ScriptedProvider {
    /// Overrides keyed by prompt; unscripted prompts get `remote-<task id>`.
    pub create_scripts: Mutex<HashMap<String, CreateScript>>,
    /// Results keyed by remote id; unscripted ids report `running`.
    pub result_scripts: Mutex<HashMap<String, ResultScript>>,
    pub create_calls: Mutex<Vec<CreateTaskRequest>>,
    pub fetch_calls: Mutex<Vec<String>>,
    pub create_delay: Mutex<Option<Duration>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script_create(&self, task_id: DbId, script: CreateScript) {
        self.create_scripts
            .lock()
            .unwrap()
            .insert(format!("prompt {task_id}"), script);
    }

    pub fn script_result(&self, task_id: DbId, script: ResultScript) {
        self.result_scripts
            .lock()
            .unwrap()
            .insert(remote_id(task_id), script);
    }

    pub fn succeed(&self, task_id: DbId) {
        self.script_result(
            task_id,
            ResultScript::Envelope(json!({
                "code": 0,
                "data": {
                    "id": remote_id(task_id),
                    "status": "succeeded",
                    "results": [{"url": format!("https://cdn.example.com/{task_id}.mp4")}]
                }
            })),
        );
    }

    pub fn fail(&self, task_id: DbId, reason: &str) {
        self.script_result(
            task_id,
            ResultScript::Envelope(json!({
                "code": 0,
                "data": {"id": remote_id(task_id), "status": "failed", "failure_reason": reason}
            })),
        );
    }

    pub fn create_count(&self) -> usize {
        self.create_calls.lock().unwrap().len()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_calls.lock().unwrap().len()
    }
}

fn prompt_of(request: &CreateTaskRequest) -> &str {
    match request {
        CreateTaskRequest::Sora(body) => &body.prompt,
        CreateTaskRequest::Veo(body) => &body.prompt,
    }
}

#[async_trait]
impl VideoProvider for ScriptedProvider {
    async fn create_task(&self, request: &CreateTaskRequest) -> Result<String, ProviderError> {
        self.create_calls.lock().unwrap().push(request.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let delay = *self.create_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let prompt = prompt_of(request).to_string();
        let script = self.create_scripts.lock().unwrap().get(&prompt).cloned();
        match script {
            Some(CreateScript::MissingId) => Err(ProviderError::MissingTaskId),
            Some(CreateScript::HttpError(status)) => Err(ProviderError::ApiError {
                status,
                body: "upstream unavailable".into(),
            }),
            None => {
                let task_id = prompt.trim_start_matches("prompt ");
                Ok(format!("remote-{task_id}"))
            }
        }
    }

    async fn fetch_result(&self, remote_task_id: &str) -> Result<ResultEnvelope, ProviderError> {
        self.fetch_calls.lock().unwrap().push(remote_task_id.to_string());
        let script = self.result_scripts.lock().unwrap().get(remote_task_id).cloned();
        match script {
            Some(ResultScript::Envelope(value)) => {
                Ok(serde_json::from_value(value).expect("scripted envelope is valid"))
            }
            Some(ResultScript::TransportError) => Err(ProviderError::ApiError {
                status: 504,
                body: "gateway timeout".into(),
            }),
            None => Ok(serde_json::from_value(json!({
                "code": 0,
                "data": {"id": remote_task_id, "status": "running", "progress": 30}
            }))
            .expect("running envelope is valid")),
        }
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

pub fn poll_config() -> WorkerConfig {
    WorkerConfig::default()
}

pub fn webhook_config() -> WorkerConfig {
    WorkerConfig {
        public_base_url: Some("https://videos.example.com".into()),
        webhook_signing_secret: Some("hook-secret".into()),
        ..WorkerConfig::default()
    }
}

pub fn worker(
    store: &Arc<MemoryStore>,
    ledger: &Arc<MemoryLedger>,
    provider: &Arc<ScriptedProvider>,
    config: WorkerConfig,
) -> BatchWorker {
    BatchWorker::new(store.clone(), ledger.clone(), provider.clone(), config)
}

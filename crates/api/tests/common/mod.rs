#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use vidbatch_api::config::ServerConfig;
use vidbatch_api::router::build_app_router;
use vidbatch_api::state::AppState;
use vidbatch_core::types::DbId;
use vidbatch_db::models::batch_job::{BatchJob, CreateBatchJob};
use vidbatch_db::models::video_task::CreateVideoTask;
use vidbatch_db::repositories::{BatchJobRepo, VideoTaskRepo};
use vidbatch_provider::GrsaiApi;
use vidbatch_worker::{BatchWorker, WorkerConfig};

pub const CRON_SECRET: &str = "cron-secret";
pub const SIGNING_SECRET: &str = "hook-secret";

/// Test `ServerConfig` with a cron secret and a webhook signing secret.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        request_timeout_secs: 30,
        cron_secret: Some(CRON_SECRET.to_string()),
        webhook_signing_secret: Some(SIGNING_SECRET.to_string()),
    }
}

/// Build the app with a poll-mode worker whose provider lives at
/// `provider_url`.
pub fn build_app(pool: PgPool, config: ServerConfig, provider_url: &str) -> Router {
    let provider = GrsaiApi::with_client(
        reqwest::Client::new(),
        provider_url.to_string(),
        "test-key".to_string(),
    );
    let worker = BatchWorker::postgres(pool.clone(), Arc::new(provider), WorkerConfig::default());

    build_app_router(AppState {
        pool,
        config: Arc::new(config),
        worker: Arc::new(worker),
    })
}

/// App whose provider is never reachable; for tests that make no remote calls.
pub fn build_test_app(pool: PgPool) -> Router {
    build_app(pool, test_config(), "http://127.0.0.1:9")
}

pub async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Insert a queued batch of `sora-2` tasks for `user_id` at 10 credits each.
pub async fn seed_batch(pool: &PgPool, user_id: DbId, tasks: usize) -> BatchJob {
    let input = CreateBatchJob {
        user_id,
        cost_per_video: 10,
        tasks: (0..tasks)
            .map(|i| CreateVideoTask {
                model: "sora-2".to_string(),
                prompt: format!("prompt {i}"),
                reference_url: None,
                aspect_ratio: Some("16:9".to_string()),
                duration: Some(10),
                meta: None,
            })
            .collect(),
    };
    BatchJobRepo::create_with_tasks(pool, &input).await.unwrap()
}

/// Put the first task of `batch_id` in flight under `remote_id`.
pub async fn dispatch_first_task(pool: &PgPool, batch_id: DbId, remote_id: &str) -> DbId {
    let task = VideoTaskRepo::list_by_batch(pool, batch_id)
        .await
        .unwrap()
        .remove(0);
    assert!(VideoTaskRepo::mark_processing(pool, task.id).await.unwrap());
    assert!(VideoTaskRepo::record_remote_id(pool, task.id, remote_id)
        .await
        .unwrap());
    task.id
}

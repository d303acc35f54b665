//! HTTP-level tests for the provider client against a mock server.

use assert_matches::assert_matches;
use serde_json::json;
use vidbatch_provider::{build_request, GrsaiApi, ProviderError, RemoteOutcome, TaskParams};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn client(server: &MockServer) -> GrsaiApi {
    GrsaiApi::with_client(reqwest::Client::new(), server.uri(), "test-key".to_string())
}

fn sora_request() -> vidbatch_provider::CreateTaskRequest {
    let meta = json!({});
    build_request(
        TaskParams {
            model: "sora-2",
            prompt: "city at night",
            reference_url: None,
            aspect_ratio: Some("16:9"),
            duration: Some(15),
            meta: &meta,
        },
        "-1".to_string(),
    )
    .unwrap()
}

// ---------------------------------------------------------------------------
// Test: Create task
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_task_returns_remote_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/video/sora-video"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "sora-2",
            "duration": 15,
            "size": "small",
            "webHook": "-1"
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"code": 0, "msg": "success", "data": {"id": "remote-123"}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let id = client(&server).create_task(&sora_request()).await.unwrap();
    assert_eq!(id, "remote-123");
}

#[tokio::test]
async fn create_task_without_id_is_missing_task_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/video/sora-video"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 0, "data": {}})))
        .mount(&server)
        .await;

    let err = client(&server).create_task(&sora_request()).await.unwrap_err();
    assert_matches!(err, ProviderError::MissingTaskId);
}

#[tokio::test]
async fn create_task_business_error_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/video/sora-video"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"code": -1, "msg": "insufficient quota"})),
        )
        .mount(&server)
        .await;

    let err = client(&server).create_task(&sora_request()).await.unwrap_err();
    assert_matches!(err, ProviderError::Rejected { code: -1, ref msg } if msg == "insufficient quota");
}

#[tokio::test]
async fn create_task_http_error_keeps_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/video/sora-video"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let err = client(&server).create_task(&sora_request()).await.unwrap_err();
    assert_matches!(err, ProviderError::ApiError { status: 502, ref body } if body == "bad gateway");
}

// ---------------------------------------------------------------------------
// Test: Fetch result
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fetch_result_parses_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/draw/result"))
        .and(body_partial_json(json!({"id": "remote-123"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "data": {"id": "remote-123", "status": "succeeded", "results": [{"url": "https://cdn/x.mp4"}]}
        })))
        .mount(&server)
        .await;

    let envelope = client(&server).fetch_result("remote-123").await.unwrap();
    assert_eq!(
        envelope.interpret(),
        RemoteOutcome::Succeeded {
            video_url: "https://cdn/x.mp4".to_string()
        }
    );
}

#[tokio::test]
async fn fetch_result_unparseable_body_is_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/draw/result"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = client(&server).fetch_result("remote-123").await.unwrap_err();
    assert_matches!(err, ProviderError::Request(_));
}

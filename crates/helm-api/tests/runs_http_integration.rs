use httpmock::prelude::*;
use serde_json::json;

use helm_api::{ApiConfig, ApiError, RunStatus, RunsClient};

fn client_for(server: &MockServer) -> RunsClient {
    RunsClient::new(ApiConfig::new(server.base_url())).expect("runs client")
}

#[tokio::test]
async fn fetch_status_sends_bearer_header_and_parses_report() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/agent-run/run-42")
            .header("authorization", "Bearer test-token");

        then.status(200).json_body(json!({
            "id": "run-42",
            "status": "processing",
            "started_at": "2026-01-05T10:00:00Z",
            "metadata": {"agent": "researcher"}
        }));
    });

    let report = client_for(&server)
        .fetch_status("run-42", "test-token")
        .await
        .expect("status report");

    mock.assert();
    assert_eq!(report.id, "run-42");
    assert_eq!(report.status, RunStatus::Processing);
    assert!(report.completed_at.is_none());
}

#[tokio::test]
async fn fetch_status_maps_auth_rejection_to_not_authenticated() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/agent-run/run-42");
        then.status(401).body("token expired");
    });

    let error = client_for(&server)
        .fetch_status("run-42", "stale-token")
        .await
        .expect_err("auth rejection");

    assert!(error.is_not_authenticated());
}

#[tokio::test]
async fn fetch_status_surfaces_server_errors_with_body() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/agent-run/run-42");
        then.status(500).body("execution engine unavailable");
    });

    let error = client_for(&server)
        .fetch_status("run-42", "test-token")
        .await
        .expect_err("server error");

    match error {
        ApiError::HttpStatus { status, body } => {
            assert_eq!(status, 500);
            assert!(body.contains("unavailable"));
        }
        other => panic!("expected HttpStatus, got {other:?}"),
    }
}

#[tokio::test]
async fn stop_run_posts_to_the_stop_path() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/agent-run/run-42/stop")
            .header("authorization", "Bearer test-token");
        then.status(202);
    });

    client_for(&server)
        .stop_run("run-42", "test-token")
        .await
        .expect("stop accepted");

    mock.assert();
}

#[tokio::test]
async fn stop_run_failure_is_surfaced_to_the_caller() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/agent-run/run-42/stop");
        then.status(409).body("run already finishing");
    });

    let error = client_for(&server)
        .stop_run("run-42", "test-token")
        .await
        .expect_err("stop conflict");

    match error {
        ApiError::HttpStatus { status, .. } => assert_eq!(status, 409),
        other => panic!("expected HttpStatus, got {other:?}"),
    }
}

#[tokio::test]
async fn stream_request_carries_event_stream_accept_header() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/agent-run/run-42/stream")
            .header("authorization", "Bearer test-token")
            .header("accept", "text/event-stream");
        then.status(200)
            .header("content-type", "text/event-stream")
            .body("data: {\"type\":\"log\",\"message\":\"hello\"}\n\n");
    });

    let response = client_for(&server)
        .stream_request("run-42", "test-token")
        .send()
        .await
        .expect("stream response");

    mock.assert();
    assert!(response.status().is_success());
}

//! HTTP front end contract: status mapping and JSON body shape.

#![cfg(feature = "http")]

mod common;

use std::sync::Arc;

use axum::body::to_bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use common::scratch;
use taskrune::http::{read_file, run_task, ReadParams, RunParams};

async fn body_json(resp: Response) -> serde_json::Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn run(agent: &Arc<taskrune::Agent>, task: &str) -> Response {
    run_task(State(agent.clone()), Query(RunParams { task: task.to_string() })).await
}

#[tokio::test]
async fn run_success_is_200() {
    let s = scratch();
    s.write("dates.txt", "2024-01-03\n");
    let agent = Arc::new(s.agent.clone());

    let resp = run(&agent, "count Wednesdays in dates.txt").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["result"], "Found 1 wednesdays.");
}

#[tokio::test]
async fn run_failures_map_to_status_codes() {
    let s = scratch();
    let agent = Arc::new(s.agent.clone());

    let resp = run(&agent, "dance the tango").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(body["status"], "error");
    assert_eq!(body["error"], "Bad Request");
    assert_eq!(body["details"], "unknown task");

    let resp = run(&agent, "read first 2 lines of ../secret.txt").await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = run(&agent, "read first 2 lines of absent.txt").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = run(&agent, "").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn read_returns_content_or_empty_404() {
    let s = scratch();
    s.write("notes.txt", "hello");
    let agent = Arc::new(s.agent.clone());

    let resp = read_file(State(agent.clone()), Query(ReadParams { path: "notes.txt".into() })).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"hello");

    let resp = read_file(State(agent.clone()), Query(ReadParams { path: "/data/notes.txt".into() })).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"hello");

    for path in ["missing.txt", "../secret.txt", "/etc/passwd", "/data/../secret.txt", ""] {
        let resp = read_file(State(agent.clone()), Query(ReadParams { path: path.into() })).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{path}");
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.is_empty());
    }
}

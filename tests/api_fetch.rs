//! JSON download handler against a local HTTP server.

#![cfg(feature = "http")]

mod common;

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use common::{scratch, scratch_with};
use tokio_util::sync::CancellationToken;

use taskrune::handlers::builtin_registry;
use taskrune::{AgentConfig, FailureKind, TaskOutcome};

async fn serve() -> SocketAddr {
    let app = Router::new()
        .route("/items", get(|| async { Json(serde_json::json!({"items": [1, 2], "ok": true})) }))
        .route("/broken", get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }))
        .route("/text", get(|| async { "plain words, not json" }))
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                "late"
            }),
        );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn saves_json_with_four_space_indent() {
    let addr = serve().await;
    let s = scratch();
    let outcome = s
        .agent
        .invoke(&format!("fetch data from the API at http://{addr}/items and save it"))
        .await;
    assert_eq!(outcome.artifact(), Some("api-data.json"), "{outcome:?}");
    assert_eq!(
        s.read("api-data.json"),
        "{\n    \"items\": [\n        1,\n        2\n    ],\n    \"ok\": true\n}"
    );
}

#[tokio::test]
async fn error_status_is_upstream_failure() {
    let addr = serve().await;
    let s = scratch();
    let outcome = s.agent.invoke(&format!("fetch api data from http://{addr}/broken")).await;
    match outcome {
        TaskOutcome::Failure { kind, details } => {
            assert_eq!(kind, FailureKind::UpstreamFailure);
            assert!(details.contains("500"), "{details}");
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(!s.root().join("api-data.json").exists());
}

#[tokio::test]
async fn non_json_body_is_upstream_failure() {
    let addr = serve().await;
    let s = scratch();
    let outcome = s.agent.invoke(&format!("fetch api data from http://{addr}/text")).await;
    assert_eq!(outcome.kind(), Some(FailureKind::UpstreamFailure));
    assert!(!s.root().join("api-data.json").exists());
}

#[tokio::test]
async fn missing_url_is_bad_request() {
    let s = scratch();
    let outcome = s.agent.invoke("fetch the api data please").await;
    assert_eq!(outcome.kind(), Some(FailureKind::BadRequest));
}

#[tokio::test]
async fn slow_server_hits_the_deadline() {
    let addr = serve().await;
    let base = AgentConfig { exec_timeout_secs: 1, ..AgentConfig::default() };
    let s = scratch_with(builtin_registry().unwrap(), base);

    let started = Instant::now();
    let outcome = s.agent.invoke(&format!("fetch api data from http://{addr}/slow")).await;
    assert_eq!(outcome.kind(), Some(FailureKind::UpstreamFailure));
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn cancellation_stops_the_request() {
    let addr = serve().await;
    let s = scratch();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let outcome = s
        .agent
        .invoke_with_cancel(&format!("fetch api data from http://{addr}/slow"), cancel)
        .await;
    assert_eq!(outcome.kind(), Some(FailureKind::UpstreamFailure));
    assert!(started.elapsed() < Duration::from_secs(10));
}

//! HTTP front end: `POST /run?task=...` and `GET /read?path=...`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::agent::{Agent, ReadOutcome};
use crate::outcome::{FailureKind, TaskOutcome};
use crate::schema::TaskResponse;

type SharedAgent = Arc<Agent>;

#[derive(Debug, Deserialize)]
pub struct RunParams {
    #[serde(default)]
    pub task: String,
}

#[derive(Debug, Deserialize)]
pub struct ReadParams {
    #[serde(default)]
    pub path: String,
}

pub fn router(agent: Arc<Agent>) -> Router {
    Router::new()
        .route("/", get(liveness))
        .route("/run", post(run_task))
        .route("/read", get(read_file))
        .with_state(agent)
}

pub async fn serve(addr: SocketAddr, agent: Arc<Agent>) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "taskrune listening");
    axum::serve(listener, router(agent)).await
}

pub fn status_for(outcome: &TaskOutcome) -> StatusCode {
    match outcome.kind() {
        None => StatusCode::OK,
        Some(FailureKind::BadRequest) => StatusCode::BAD_REQUEST,
        Some(FailureKind::NotFound) => StatusCode::NOT_FOUND,
        Some(FailureKind::SecurityViolation) => StatusCode::FORBIDDEN,
        Some(FailureKind::UpstreamFailure | FailureKind::Internal) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn liveness() -> Json<serde_json::Value> {
    Json(json!({"status": "ok", "service": "taskrune"}))
}

pub async fn run_task(State(agent): State<SharedAgent>, Query(params): Query<RunParams>) -> Response {
    let cancel = CancellationToken::new();
    // Dropping the request (client went away) cancels running tools.
    let guard = cancel.clone().drop_guard();
    let outcome = agent.invoke_with_cancel(&params.task, cancel).await;
    guard.disarm();
    (status_for(&outcome), Json(TaskResponse::from(&outcome))).into_response()
}

pub async fn read_file(State(agent): State<SharedAgent>, Query(params): Query<ReadParams>) -> Response {
    match agent.read_file(&params.path).await {
        ReadOutcome::Content(text) => {
            (StatusCode::OK, [(header::CONTENT_TYPE, "text/plain; charset=utf-8")], text).into_response()
        }
        ReadOutcome::NotFound => StatusCode::NOT_FOUND.into_response(),
        ReadOutcome::Failed(details) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"status": "error", "error": "Internal Server Error", "details": details})),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (TaskOutcome::success("ok", None), StatusCode::OK),
            (TaskOutcome::failure(FailureKind::BadRequest, ""), StatusCode::BAD_REQUEST),
            (TaskOutcome::failure(FailureKind::NotFound, ""), StatusCode::NOT_FOUND),
            (TaskOutcome::failure(FailureKind::SecurityViolation, ""), StatusCode::FORBIDDEN),
            (TaskOutcome::failure(FailureKind::UpstreamFailure, ""), StatusCode::INTERNAL_SERVER_ERROR),
            (TaskOutcome::failure(FailureKind::Internal, ""), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (outcome, status) in cases {
            assert_eq!(status_for(&outcome), status, "{outcome:?}");
        }
    }
}

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::{redirect, Client, Url};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{extract, to_indented_json};
use crate::handler::{Handler, HandlerContext};
use crate::outcome::{Completed, TaskError};
use crate::registry::TaskText;

const OUTPUT: &str = "api-data.json";
const USER_AGENT: &str = concat!("taskrune/", env!("CARGO_PKG_VERSION"));
const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

static API_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").expect("static regex"));

/// Downloads a JSON document and stores it re-indented as `api-data.json`.
#[derive(Debug, Default)]
pub struct ApiFetch;

#[async_trait]
impl Handler for ApiFetch {
    async fn handle(&self, task: &TaskText, ctx: &HandlerContext) -> Result<Completed, TaskError> {
        let url = api_url(task.normalized())?;

        let client = Client::builder()
            .timeout(ctx.deadline())
            .redirect(redirect::Policy::limited(3))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| TaskError::Internal(anyhow::Error::new(e).context("building HTTP client")))?;

        debug!(url = %url, "fetching API data");
        let body = tokio::select! {
            res = fetch_body(&client, url.clone()) => res?,
            _ = ctx.cancel_token().cancelled() => {
                warn!(url = %url, "API fetch cancelled");
                return Err(TaskError::Upstream(format!("request to {url} was cancelled")));
            }
        };

        let value: Value = serde_json::from_slice(&body)
            .map_err(|e| TaskError::Upstream(format!("{url} did not return valid JSON: {e}")))?;
        let artifact = ctx.write_artifact(OUTPUT, &to_indented_json(&value)?).await?;
        info!(url = %url, bytes = body.len(), artifact = %artifact, "API data saved");
        Ok(Completed::new(format!("API data saved to {artifact}.")).with_artifact(artifact))
    }
}

fn api_url(text: &str) -> Result<Url, TaskError> {
    let raw = API_URL
        .find(text)
        .map(|m| extract::target(m.as_str()))
        .ok_or_else(|| TaskError::BadRequest("No API URL provided".to_string()))?;
    let url = Url::parse(&raw).map_err(|e| TaskError::BadRequest(format!("invalid API URL: {e}")))?;
    if url.host_str().is_none() {
        return Err(TaskError::BadRequest(format!("API URL has no host: {raw}")));
    }
    Ok(url)
}

async fn fetch_body(client: &Client, url: Url) -> Result<Vec<u8>, TaskError> {
    let upstream = |e: reqwest::Error| {
        if e.is_timeout() {
            TaskError::Upstream(format!("request to {url} timed out"))
        } else {
            TaskError::Upstream(format!("request to {url} failed: {e}"))
        }
    };

    let response = client.get(url.clone()).send().await.map_err(upstream)?;
    let status = response.status();
    if !status.is_success() {
        return Err(TaskError::Upstream(format!("{url} answered with status {}", status.as_u16())));
    }
    if response.content_length().is_some_and(|len| len > MAX_BODY_BYTES as u64) {
        return Err(TaskError::Upstream(format!("{url} response exceeds {MAX_BODY_BYTES} bytes")));
    }
    let body = response.bytes().await.map_err(upstream)?;
    if body.len() > MAX_BODY_BYTES {
        return Err(TaskError::Upstream(format!("{url} response exceeds {MAX_BODY_BYTES} bytes")));
    }
    Ok(body.to_vec())
}

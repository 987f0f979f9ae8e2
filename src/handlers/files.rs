//! Plain file utilities: directory listing, head, tail and SHA-256.

use std::io::ErrorKind;
use std::sync::LazyLock;

use anyhow::Context;
use async_trait::async_trait;
use regex::Regex;
use sha2::{Digest, Sha256};

use super::extract;
use crate::handler::{Handler, HandlerContext};
use crate::outcome::{Completed, TaskError};
use crate::registry::TaskText;

static LIST_FILES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)list files in directory (.+)").expect("static regex"));
static HEAD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)read first (\d+) lines of (.+)").expect("static regex"));
static TAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)read last (\d+) lines of (.+)").expect("static regex"));
static HASH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)compute sha-?256 hash of (.+)").expect("static regex"));

#[derive(Debug, Default)]
pub struct ListFiles;

#[async_trait]
impl Handler for ListFiles {
    async fn handle(&self, task: &TaskText, ctx: &HandlerContext) -> Result<Completed, TaskError> {
        let caps = LIST_FILES
            .captures(task.normalized())
            .ok_or_else(|| TaskError::BadRequest("No valid directory provided".to_string()))?;
        let dir = ctx.resolve(&extract::target(&caps[1]))?;
        let shown = ctx.display(&dir);

        match tokio::fs::metadata(&dir).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(TaskError::NotFound(format!("{shown} is not a directory"))),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(TaskError::NotFound(format!("{shown} does not exist")));
            }
            Err(e) => return Err(anyhow::Error::new(e).context(format!("inspecting {shown}")).into()),
        }
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .with_context(|| format!("listing {shown}"))?;
        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .with_context(|| format!("listing {shown}"))?
        {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();

        let body: String = names.iter().map(|n| format!("{n}\n")).collect();
        let artifact = ctx.write_artifact("files-list.txt", body.as_bytes()).await?;
        Ok(Completed::new(format!("File list saved to {artifact}.")).with_artifact(artifact))
    }
}

/// Leading lines of a file, stopping early at the first blank line.
#[derive(Debug, Default)]
pub struct HeadLines;

#[async_trait]
impl Handler for HeadLines {
    async fn handle(&self, task: &TaskText, ctx: &HandlerContext) -> Result<Completed, TaskError> {
        let caps = HEAD.captures(task.normalized()).ok_or_else(|| {
            TaskError::BadRequest("No valid file or number of lines provided".to_string())
        })?;
        let n = extract::count(&caps[1], "line count")?;
        let (_, text) = ctx.read_to_string(&extract::target(&caps[2])).await?;

        let lines: Vec<&str> = text
            .lines()
            .map(str::trim)
            .take(n)
            .take_while(|l| !l.is_empty())
            .collect();
        let artifact = ctx.write_artifact("head.txt", lines.join("\n").as_bytes()).await?;
        Ok(Completed::new(format!("First {n} lines written to {artifact}.")).with_artifact(artifact))
    }
}

#[derive(Debug, Default)]
pub struct TailLines;

#[async_trait]
impl Handler for TailLines {
    async fn handle(&self, task: &TaskText, ctx: &HandlerContext) -> Result<Completed, TaskError> {
        let caps = TAIL.captures(task.normalized()).ok_or_else(|| {
            TaskError::BadRequest("No valid file or number of lines provided".to_string())
        })?;
        let n = extract::count(&caps[1], "line count")?;
        let target = extract::target(&caps[2]);
        let (_, text) = ctx.read_to_string(&target).await?;

        let all: Vec<&str> = text.lines().collect();
        let kept: Vec<&str> = all[all.len().saturating_sub(n)..]
            .iter()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .collect();
        if kept.is_empty() {
            return Err(TaskError::Upstream(format!(
                "{target} has no non-blank lines in its last {n}"
            )));
        }
        let artifact = ctx.write_artifact("tail.txt", kept.join("\n").as_bytes()).await?;
        Ok(Completed::new(format!("Last {n} lines written to {artifact}.")).with_artifact(artifact))
    }
}

#[derive(Debug, Default)]
pub struct Sha256File;

#[async_trait]
impl Handler for Sha256File {
    async fn handle(&self, task: &TaskText, ctx: &HandlerContext) -> Result<Completed, TaskError> {
        let caps = HASH
            .captures(task.normalized())
            .ok_or_else(|| TaskError::BadRequest("No valid file provided".to_string()))?;
        let (_, bytes) = ctx.read_bytes(&extract::target(&caps[1])).await?;
        let digest = hex::encode(Sha256::digest(&bytes));
        let artifact = ctx.write_artifact("hash.txt", digest.as_bytes()).await?;
        Ok(Completed::new(format!("SHA-256 hash written to {artifact}.")).with_artifact(artifact))
    }
}

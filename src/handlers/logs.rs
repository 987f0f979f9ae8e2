use std::sync::LazyLock;
use std::time::SystemTime;

use anyhow::Context;
use async_trait::async_trait;
use regex::Regex;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::handler::{Handler, HandlerContext};
use crate::outcome::{Completed, TaskError};
use crate::registry::TaskText;

pub const PATTERN: &str = r"\brecent\s+\.?log(?:s|\s+files|\s+entries)?\b";

const LOG_DIR: &str = "logs";
const OUTPUT: &str = "logs-recent.txt";
const DEFAULT_LIMIT: usize = 10;

static LIMIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s+most\s+recent").expect("static regex"));

/// First line of each of the most recently modified `*.log` files, newest first.
#[derive(Debug, Default)]
pub struct RecentLogs;

#[async_trait]
impl Handler for RecentLogs {
    async fn handle(&self, task: &TaskText, ctx: &HandlerContext) -> Result<Completed, TaskError> {
        let limit = match LIMIT.captures(task.normalized()) {
            Some(caps) => super::extract::count(&caps[1], "log count")?,
            None => DEFAULT_LIMIT,
        };
        let dir = ctx.resolve(LOG_DIR)?;
        let shown = ctx.display(&dir);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TaskError::NotFound(format!("{shown} does not exist")));
            }
            Err(e) => return Err(anyhow::Error::new(e).context(format!("listing {shown}")).into()),
        };

        let mut logs: Vec<(SystemTime, String)> = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .with_context(|| format!("listing {shown}"))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.ends_with(".log") {
                continue;
            }
            let modified = entry
                .metadata()
                .await
                .and_then(|m| m.modified())
                .with_context(|| format!("reading mtime of {name}"))?;
            logs.push((modified, name));
        }
        // Newest first; names break ties so reruns are stable.
        logs.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

        let mut first_lines = Vec::new();
        for (_, name) in logs.into_iter().take(limit) {
            let path = ctx.resolve(&format!("{LOG_DIR}/{name}"))?;
            let file = tokio::fs::File::open(&path)
                .await
                .with_context(|| format!("opening {name}"))?;
            let mut line = String::new();
            BufReader::new(file)
                .read_line(&mut line)
                .await
                .map_err(|e| TaskError::Upstream(format!("{name} is unreadable: {e}")))?;
            let line = line.trim();
            if !line.is_empty() {
                first_lines.push(line.to_string());
            }
        }

        let artifact = ctx.write_artifact(OUTPUT, first_lines.join("\n").as_bytes()).await?;
        Ok(Completed::new(format!("Extracted recent log entries to {artifact}.")).with_artifact(artifact))
    }
}

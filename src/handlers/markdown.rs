use std::collections::BTreeMap;

use anyhow::Context;
use async_trait::async_trait;

use crate::handler::{Handler, HandlerContext};
use crate::outcome::{Completed, TaskError};
use crate::registry::TaskText;

pub const PATTERN: &str = r"\bcreate\b.*\bindex\b";

const DOCS_DIR: &str = "docs";
const OUTPUT: &str = "docs/index.json";

/// Maps each `docs/*.md` file to its first level-one heading.
#[derive(Debug, Default)]
pub struct MarkdownIndex;

#[async_trait]
impl Handler for MarkdownIndex {
    async fn handle(&self, _task: &TaskText, ctx: &HandlerContext) -> Result<Completed, TaskError> {
        let dir = ctx.resolve(DOCS_DIR)?;
        let shown = ctx.display(&dir);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TaskError::NotFound(format!("{shown} does not exist")));
            }
            Err(e) => return Err(anyhow::Error::new(e).context(format!("listing {shown}")).into()),
        };

        let mut index = BTreeMap::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .with_context(|| format!("listing {shown}"))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.ends_with(".md") {
                continue;
            }
            let (_, text) = ctx.read_to_string(&format!("{DOCS_DIR}/{name}")).await?;
            if let Some(title) = first_h1(&text) {
                index.insert(name, title.to_string());
            }
        }

        let body = serde_json::to_vec_pretty(&index).map_err(|e| TaskError::Internal(e.into()))?;
        let artifact = ctx.write_artifact(OUTPUT, &body).await?;
        Ok(Completed::new(format!("Markdown index created at {artifact}.")).with_artifact(artifact))
    }
}

fn first_h1(text: &str) -> Option<&str> {
    text.lines()
        .map(str::trim)
        .find_map(|l| l.strip_prefix("# "))
        .map(str::trim)
}

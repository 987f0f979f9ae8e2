use std::io::ErrorKind;

use async_trait::async_trait;
use tracing::info;

use super::extract;
use crate::handler::{Handler, HandlerContext};
use crate::outcome::{Completed, TaskError};
use crate::registry::TaskText;

const DEFAULT_INPUT: &str = "format.md";

/// Formats a markdown file in place with the configured prettier binary.
#[derive(Debug, Default)]
pub struct PrettierFormat;

#[async_trait]
impl Handler for PrettierFormat {
    async fn handle(&self, task: &TaskText, ctx: &HandlerContext) -> Result<Completed, TaskError> {
        let input = extract::file_with_extension(task.normalized(), "md")
            .unwrap_or_else(|| DEFAULT_INPUT.to_string());
        let path = ctx.resolve(&input)?;
        let shown = ctx.display(&path);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return Err(TaskError::NotFound(format!("{shown} is not a file"))),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(TaskError::NotFound(format!("{shown} does not exist")));
            }
            Err(e) => return Err(anyhow::Error::new(e).context(format!("inspecting {shown}")).into()),
        }

        let spec = ctx
            .command(&ctx.tools().prettier)
            .arg("--write")
            .arg(path.to_string_lossy())
            .cwd(ctx.sandbox().root());
        let outcome = ctx.run_tool(&spec).await?;
        info!(file = %shown, duration_ms = outcome.duration_ms, "prettier finished");
        Ok(Completed::new(format!("{shown} formatted successfully.")).with_artifact(shown))
    }
}

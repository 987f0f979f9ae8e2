use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use super::extract;
use crate::handler::{Handler, HandlerContext};
use crate::outcome::{Completed, TaskError};
use crate::registry::TaskText;

pub const PATTERN: &str = r"\bextract\b.*(?:\bemail\s+sender\b|\bsender\S*\s+(?:email|address)\b)";

const DEFAULT_INPUT: &str = "email.txt";
const OUTPUT: &str = "email-sender.txt";

static FROM_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^from:\s*(?:[^<\n]*<)?([\w.+-]+@[\w-]+(?:\.[\w-]+)+)").expect("static regex")
});

/// Sender address from the `From:` header of a stored message.
#[derive(Debug, Default)]
pub struct EmailSender;

#[async_trait]
impl Handler for EmailSender {
    async fn handle(&self, task: &TaskText, ctx: &HandlerContext) -> Result<Completed, TaskError> {
        let input = extract::file_token(task.normalized())
            .filter(|t| t != OUTPUT)
            .unwrap_or_else(|| DEFAULT_INPUT.to_string());
        let (_, text) = ctx.read_to_string(&input).await?;
        let sender = FROM_HEADER
            .captures(&text)
            .map(|c| c[1].to_string())
            .ok_or_else(|| TaskError::Upstream(format!("no sender address in {input}")))?;
        let artifact = ctx.write_artifact(OUTPUT, sender.as_bytes()).await?;
        Ok(Completed::new(format!("Extracted sender email to {artifact}.")).with_artifact(artifact))
    }
}

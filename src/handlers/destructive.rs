use async_trait::async_trait;
use tracing::warn;

use super::extract;
use crate::handler::{Handler, HandlerContext};
use crate::outcome::{Completed, TaskError};
use crate::registry::TaskText;
use crate::sandbox::{Denial, SandboxDecision};

pub const PATTERN: &str = r"\b(delete|remove|erase)\b";

/// Refuses every request to delete data. The target is still run through
/// the sandbox so the reported reason matches what a real removal would hit.
#[derive(Debug, Default)]
pub struct DestructiveGuard;

#[async_trait]
impl Handler for DestructiveGuard {
    async fn handle(&self, task: &TaskText, ctx: &HandlerContext) -> Result<Completed, TaskError> {
        let (verb, rest) = split_at_verb(task.folded());
        let target = extract::file_token(rest).unwrap_or_else(|| {
            let rest = extract::target(rest);
            if rest.is_empty() { ".".to_string() } else { rest }
        });

        let reason = match ctx.sandbox().check_operation(verb, &target) {
            SandboxDecision::Denied(denial) => denial.reason(),
            SandboxDecision::Allowed(_) => Denial::Destructive.reason(),
        };
        warn!(verb, target = %target, reason, "destructive request refused");
        Err(TaskError::SecurityViolation(reason.to_string()))
    }
}

fn split_at_verb(folded: &str) -> (&str, &str) {
    for verb in ["delete", "remove", "erase"] {
        if let Some(pos) = folded.find(verb) {
            return (verb, &folded[pos + verb.len()..]);
        }
    }
    ("delete", folded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_at_verb() {
        assert_eq!(split_at_verb("please delete old.txt"), ("delete", " old.txt"));
        assert_eq!(split_at_verb("erase everything"), ("erase", " everything"));
    }
}

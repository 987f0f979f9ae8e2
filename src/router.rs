use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn, Instrument};

use crate::handler::{self, panic_message, HandlerContext, HandlerEnv};
use crate::observability::TaskTrace;
use crate::outcome::{FailureKind, TaskOutcome};
use crate::registry::{Registry, TaskText};

/// Picks the first registry entry whose predicate accepts the text and runs
/// its handler. Holds no per-request state.
#[derive(Clone)]
pub struct Router {
    registry: Arc<Registry>,
    env: Arc<HandlerEnv>,
}

impl Router {
    pub fn new(registry: Arc<Registry>, env: Arc<HandlerEnv>) -> Self {
        Self { registry, env }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub async fn route(&self, text: &str) -> TaskOutcome {
        self.route_with_cancel(text, CancellationToken::new()).await
    }

    /// Cancelling `cancel` terminates any external process the handler is
    /// waiting on.
    pub async fn route_with_cancel(&self, text: &str, cancel: CancellationToken) -> TaskOutcome {
        let trace = TaskTrace::new(text);
        let span = trace.span();
        let (handler_id, outcome) = self.dispatch(TaskText::new(text), cancel).instrument(span).await;
        trace.record_completion(handler_id.as_deref(), &outcome);
        outcome
    }

    async fn dispatch(&self, task: TaskText, cancel: CancellationToken) -> (Option<String>, TaskOutcome) {
        debug!(task = %task.as_str(), "routing task");
        if task.is_blank() {
            return (
                None,
                TaskOutcome::failure(FailureKind::BadRequest, "task description is required"),
            );
        }

        // Predicates are caller-supplied code; a panic there is still a fault
        // of this call, not of the process.
        let matched = std::panic::catch_unwind(AssertUnwindSafe(|| self.registry.first_match(&task)));
        let entry = match matched {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                return (None, TaskOutcome::failure(FailureKind::BadRequest, "unknown task"));
            }
            Err(panic) => {
                let msg = panic_message(panic.as_ref());
                warn!(panic = %msg, "predicate panicked");
                return (
                    None,
                    TaskOutcome::failure(FailureKind::Internal, "predicate fault"),
                );
            }
        };

        debug!(handler = %entry.id, "task matched");
        let ctx = HandlerContext::new(self.env.clone(), cancel);
        let outcome = handler::invoke(entry.handler.as_ref(), &task, &ctx).await;
        (Some(entry.id.to_string()), outcome)
    }
}

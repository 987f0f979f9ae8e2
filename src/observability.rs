//! Observability module for taskrune
//! Provides structured logging and per-task tracing

use std::time::Instant;

use sha2::{Digest, Sha256};
use tracing::{debug, error, info, instrument, warn, Span};
use tracing_subscriber::EnvFilter;

use crate::outcome::{FailureKind, TaskOutcome};

/// Initialize logging to stderr (RUST_LOG filter, TASKRUNE_LOG_JSON=1 for JSON lines)
pub fn init_observability() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let is_json = std::env::var("TASKRUNE_LOG_JSON").ok() == Some("1".to_string());

    if is_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_current_span(true)
            .try_init()?;
    } else {
        tracing_subscriber::fmt()
            .pretty()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init()?;
    }

    info!("taskrune observability initialized");
    Ok(())
}

/// Deterministic id for a task text: `t_` + 20 hex chars of its SHA-256.
pub fn task_id(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    let hexed = hex::encode(digest);
    format!("t_{}", &hexed[..20])
}

/// Structured per-task context
#[derive(Debug, Clone)]
pub struct TaskTrace {
    pub task_id: String,
    pub start_time: Instant,
}

impl TaskTrace {
    pub fn new(text: &str) -> Self {
        Self {
            task_id: task_id(text),
            start_time: Instant::now(),
        }
    }

    pub fn span(&self) -> Span {
        tracing::info_span!("task", task_id = %self.task_id)
    }

    #[instrument(skip(self, outcome), fields(task_id = %self.task_id))]
    pub fn record_completion(&self, handler_id: Option<&str>, outcome: &TaskOutcome) {
        let duration_ms = self.start_time.elapsed().as_millis() as u64;
        let status = outcome.kind().map(|k| k.as_str()).unwrap_or("success");

        info!(
            handler = handler_id.unwrap_or("-"),
            status = %status,
            duration_ms = duration_ms,
            "Task completed"
        );

        info!(
            metric_name = "taskrune_task_duration_ms",
            value = duration_ms,
            handler = handler_id.unwrap_or("-"),
            status = %status,
            "metric"
        );

        match outcome {
            TaskOutcome::Failure {
                kind: FailureKind::SecurityViolation,
                details,
            } => self.record_security_violation(handler_id.unwrap_or("-"), details),
            TaskOutcome::Failure {
                kind: kind @ (FailureKind::Internal | FailureKind::UpstreamFailure),
                details,
            } => self.record_error(*kind, details),
            _ => {}
        }
    }

    pub fn record_security_violation(&self, handler_id: &str, details: &str) {
        warn!(
            task_id = %self.task_id,
            handler = %handler_id,
            details = %details,
            "Sandbox violation"
        );

        info!(
            metric_name = "taskrune_security_violations_total",
            value = 1,
            handler = %handler_id,
            "metric"
        );
    }

    pub fn record_error(&self, kind: FailureKind, message: &str) {
        error!(
            task_id = %self.task_id,
            kind = %kind,
            message = %message,
            "Task error"
        );

        info!(
            metric_name = "taskrune_errors_total",
            value = 1,
            kind = %kind,
            "metric"
        );
    }
}

/// Log external process operations
pub fn log_process_operation(program: &str, operation: &str, success: bool) {
    if success {
        debug!(
            program = %program,
            operation = %operation,
            "Process operation succeeded"
        );
    } else {
        warn!(
            program = %program,
            operation = %operation,
            "Process operation failed"
        );
    }
}

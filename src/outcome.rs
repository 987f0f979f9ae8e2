//! Uniform task result contract.
//!
//! Every routed task ends in exactly one [`TaskOutcome`]. Handlers signal
//! foreseeable failures with [`TaskError`]; the harness turns those (and any
//! fault it catches) into a `Failure` with the matching [`FailureKind`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    BadRequest,
    NotFound,
    SecurityViolation,
    UpstreamFailure,
    Internal,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::BadRequest => "Bad Request",
            FailureKind::NotFound => "Not Found",
            FailureKind::SecurityViolation => "Security Violation",
            FailureKind::UpstreamFailure => "Upstream Failure",
            FailureKind::Internal => "Internal Server Error",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskOutcome {
    Success {
        message: String,
        /// Root-relative path of the derived output, when the task wrote one.
        artifact: Option<String>,
    },
    Failure {
        kind: FailureKind,
        details: String,
    },
}

impl TaskOutcome {
    pub fn success(message: impl Into<String>, artifact: Option<String>) -> Self {
        TaskOutcome::Success {
            message: message.into(),
            artifact,
        }
    }

    pub fn failure(kind: FailureKind, details: impl Into<String>) -> Self {
        TaskOutcome::Failure {
            kind,
            details: details.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Success { .. })
    }

    /// `None` for successes.
    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            TaskOutcome::Success { .. } => None,
            TaskOutcome::Failure { kind, .. } => Some(*kind),
        }
    }

    pub fn artifact(&self) -> Option<&str> {
        match self {
            TaskOutcome::Success { artifact, .. } => artifact.as_deref(),
            TaskOutcome::Failure { .. } => None,
        }
    }

    /// Applies `f` to the human-readable text (message or details).
    pub(crate) fn map_text(self, f: impl Fn(&str) -> String) -> Self {
        match self {
            TaskOutcome::Success { message, artifact } => TaskOutcome::Success {
                message: f(&message),
                artifact,
            },
            TaskOutcome::Failure { kind, details } => TaskOutcome::Failure {
                kind,
                details: f(&details),
            },
        }
    }
}

/// What a handler returns when it finishes its operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completed {
    pub message: String,
    pub artifact: Option<String>,
}

impl Completed {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            artifact: None,
        }
    }

    pub fn with_artifact(mut self, artifact: impl Into<String>) -> Self {
        self.artifact = Some(artifact.into());
        self
    }
}

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    SecurityViolation(String),
    #[error("{0}")]
    Upstream(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl TaskError {
    pub fn kind(&self) -> FailureKind {
        match self {
            TaskError::BadRequest(_) => FailureKind::BadRequest,
            TaskError::NotFound(_) => FailureKind::NotFound,
            TaskError::SecurityViolation(_) => FailureKind::SecurityViolation,
            TaskError::Upstream(_) => FailureKind::UpstreamFailure,
            TaskError::Internal(_) => FailureKind::Internal,
        }
    }
}

impl From<Result<Completed, TaskError>> for TaskOutcome {
    fn from(result: Result<Completed, TaskError>) -> Self {
        match result {
            Ok(done) => TaskOutcome::Success {
                message: done.message,
                artifact: done.artifact,
            },
            Err(err) => {
                let kind = err.kind();
                // `{:#}` keeps anyhow context chains on one line.
                let details = match &err {
                    TaskError::Internal(inner) => format!("{inner:#}"),
                    other => other.to_string(),
                };
                TaskOutcome::Failure { kind, details }
            }
        }
    }
}

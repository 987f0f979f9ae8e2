use std::io::ErrorKind;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use futures_util::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::ToolPaths;
use crate::outcome::{Completed, FailureKind, TaskError, TaskOutcome};
use crate::registry::TaskText;
use crate::sandbox::{CommandSpec, ExecError, ExecOutcome, Executor, Sandbox, SandboxDecision};

/// One concrete operation. Implementations pull their parameters out of the
/// task text and report foreseeable failures as [`TaskError`]; panics and
/// other faults are left to [`invoke`].
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, task: &TaskText, ctx: &HandlerContext) -> Result<Completed, TaskError>;
}

/// Process-wide collaborators shared by every request.
pub struct HandlerEnv {
    pub sandbox: Arc<Sandbox>,
    pub executor: Arc<dyn Executor>,
    pub tools: ToolPaths,
    pub exec_timeout: Duration,
    pub git_push: bool,
}

/// Per-request view handed to a handler.
#[derive(Clone)]
pub struct HandlerContext {
    env: Arc<HandlerEnv>,
    cancel: CancellationToken,
}

impl HandlerContext {
    pub fn new(env: Arc<HandlerEnv>, cancel: CancellationToken) -> Self {
        Self { env, cancel }
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.env.sandbox
    }

    pub fn tools(&self) -> &ToolPaths {
        &self.env.tools
    }

    pub fn git_push(&self) -> bool {
        self.env.git_push
    }

    /// Deadline applied to every external call a handler makes.
    pub fn deadline(&self) -> Duration {
        self.env.exec_timeout
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn display(&self, path: &Path) -> String {
        self.env.sandbox.display(path)
    }

    /// Clears `candidate` through the sandbox, returning the canonical path.
    pub fn resolve(&self, candidate: &str) -> Result<PathBuf, TaskError> {
        match self.env.sandbox.check_path(candidate) {
            SandboxDecision::Allowed(path) => Ok(path),
            SandboxDecision::Denied(denial) => {
                warn!(denial = ?denial, "sandbox denied path");
                Err(TaskError::SecurityViolation(denial.reason().to_string()))
            }
        }
    }

    pub async fn read_to_string(&self, candidate: &str) -> Result<(PathBuf, String), TaskError> {
        let path = self.resolve(candidate)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok((path, text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(TaskError::NotFound(format!(
                "{} does not exist",
                self.display(&path)
            ))),
            Err(e) if e.kind() == ErrorKind::InvalidData => Err(TaskError::Upstream(format!(
                "{} is not valid UTF-8 text",
                self.display(&path)
            ))),
            Err(e) => Err(TaskError::Internal(
                anyhow::Error::new(e).context(format!("reading {}", self.display(&path))),
            )),
        }
    }

    pub async fn read_bytes(&self, candidate: &str) -> Result<(PathBuf, Vec<u8>), TaskError> {
        let path = self.resolve(candidate)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok((path, bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(TaskError::NotFound(format!(
                "{} does not exist",
                self.display(&path)
            ))),
            Err(e) => Err(TaskError::Internal(
                anyhow::Error::new(e).context(format!("reading {}", self.display(&path))),
            )),
        }
    }

    /// Writes a derived output under the root. Writes are not atomic and two
    /// requests targeting the same file may interleave.
    pub async fn write_artifact(&self, candidate: &str, contents: &[u8]) -> Result<String, TaskError> {
        let path = self.resolve(candidate)?;
        let shown = self.display(&path);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating parent of {shown}"))?;
        }
        tokio::fs::write(&path, contents)
            .await
            .with_context(|| format!("writing {shown}"))?;
        debug!(artifact = %shown, bytes = contents.len(), "artifact written");
        Ok(shown)
    }

    /// Builds a command spec carrying the configured deadline.
    pub fn command(&self, program: &str) -> CommandSpec {
        CommandSpec::new(program, self.env.exec_timeout)
    }

    /// Runs an external program; any non-zero exit is an upstream failure.
    pub async fn run_tool(&self, spec: &CommandSpec) -> Result<ExecOutcome, TaskError> {
        if let Some(dir) = &spec.cwd {
            if !dir.starts_with(self.env.sandbox.root()) {
                return Err(TaskError::SecurityViolation(
                    "Access Denied: working directory outside the data root.".to_string(),
                ));
            }
        }
        let outcome = self
            .env
            .executor
            .exec(spec, &self.cancel)
            .await
            .map_err(|e| match e {
                ExecError::Spawn { program, .. } => {
                    TaskError::Upstream(format!("{program} could not be started"))
                }
                other => TaskError::Upstream(other.to_string()),
            })?;
        if !outcome.success() {
            return Err(TaskError::Upstream(format!(
                "{} exited with status {}: {}",
                spec.program,
                outcome.exit_code,
                outcome.stderr.trim()
            )));
        }
        Ok(outcome)
    }
}

/// Runs one handler and folds everything it can produce, panics included,
/// into a single [`TaskOutcome`]. The only place faults become `Internal`.
pub async fn invoke(handler: &dyn Handler, task: &TaskText, ctx: &HandlerContext) -> TaskOutcome {
    let result = AssertUnwindSafe(handler.handle(task, ctx)).catch_unwind().await;
    let outcome = match result {
        Ok(result) => TaskOutcome::from(result),
        Err(panic) => {
            let msg = panic_message(panic.as_ref());
            warn!(panic = %msg, "handler panicked");
            TaskOutcome::failure(FailureKind::Internal, "handler fault")
        }
    };
    outcome.map_text(|text| ctx.sandbox().redact(text))
}

pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

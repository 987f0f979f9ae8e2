use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::observability::log_process_operation;

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} timed out after {}s", .after.as_secs())]
    Timeout { program: String, after: Duration },
    #[error("{program} was cancelled")]
    Cancelled { program: String },
    #[error("waiting on {program} failed: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// One external program invocation. Paths in `args` and `cwd` must already
/// have been cleared by the sandbox.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub timeout: Duration,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            timeout,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutcome {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

impl ExecOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

#[async_trait]
pub trait Executor: Send + Sync {
    async fn exec(
        &self,
        spec: &CommandSpec,
        cancel: &CancellationToken,
    ) -> Result<ExecOutcome, ExecError>;
}

/// Runs programs directly on the host with a deadline and cancellation.
#[derive(Debug, Default, Clone)]
pub struct NativeExecutor;

#[async_trait]
impl Executor for NativeExecutor {
    async fn exec(
        &self,
        spec: &CommandSpec,
        cancel: &CancellationToken,
    ) -> Result<ExecOutcome, ExecError> {
        let started = Instant::now();
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &spec.cwd {
            cmd.current_dir(dir);
        }

        let child = cmd.spawn().map_err(|source| {
            log_process_operation(&spec.program, "spawn", false);
            ExecError::Spawn {
                program: spec.program.clone(),
                source,
            }
        })?;
        debug!(program = %spec.program, args = ?spec.args, "spawned external process");

        // Dropping the wait future drops the child, and kill_on_drop reaps it.
        let output = tokio::select! {
            res = child.wait_with_output() => res.map_err(|source| ExecError::Wait {
                program: spec.program.clone(),
                source,
            })?,
            _ = tokio::time::sleep(spec.timeout) => {
                warn!(program = %spec.program, timeout_ms = spec.timeout.as_millis() as u64, "external process timed out");
                log_process_operation(&spec.program, "timeout", false);
                return Err(ExecError::Timeout { program: spec.program.clone(), after: spec.timeout });
            }
            _ = cancel.cancelled() => {
                warn!(program = %spec.program, "external process cancelled");
                log_process_operation(&spec.program, "cancel", false);
                return Err(ExecError::Cancelled { program: spec.program.clone() });
            }
        };

        let outcome = ExecOutcome {
            // Signal-terminated children report no code.
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            duration_ms: started.elapsed().as_millis() as u64,
        };
        log_process_operation(&spec.program, "exit", outcome.success());
        Ok(outcome)
    }
}

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use taskrune::handlers::builtin_registry;
use taskrune::sandbox::{CommandSpec, ExecError, ExecOutcome, Executor};
use taskrune::{Agent, AgentConfig, Registry};

/// Executor that records every command and answers with a fixed exit code.
#[derive(Default)]
pub struct StubExecutor {
    pub calls: Mutex<Vec<CommandSpec>>,
    pub exit_code: i32,
}

impl StubExecutor {
    pub fn failing(exit_code: i32) -> Self {
        Self { calls: Mutex::new(Vec::new()), exit_code }
    }

    pub fn programs(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|c| format!("{} {}", c.program, c.args.join(" ")))
            .collect()
    }
}

#[async_trait]
impl Executor for StubExecutor {
    async fn exec(&self, spec: &CommandSpec, _cancel: &CancellationToken) -> Result<ExecOutcome, ExecError> {
        self.calls.lock().unwrap().push(spec.clone());
        Ok(ExecOutcome {
            exit_code: self.exit_code,
            stdout: String::new(),
            stderr: if self.exit_code == 0 { String::new() } else { "stub failure".to_string() },
            duration_ms: 0,
        })
    }
}

pub struct Scratch {
    pub dir: TempDir,
    pub agent: Agent,
    pub executor: Arc<StubExecutor>,
}

impl Scratch {
    pub fn root(&self) -> &Path {
        self.agent.sandbox().root()
    }

    pub fn write(&self, rel: &str, contents: &str) {
        let path = self.root().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    pub fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.root().join(rel)).unwrap()
    }
}

/// Agent over a fresh temp root with the built-in handlers and a stub executor.
pub fn scratch() -> Scratch {
    scratch_with(builtin_registry().unwrap(), AgentConfig::default())
}

pub fn scratch_with(registry: Registry, base: AgentConfig) -> Scratch {
    let dir = tempfile::tempdir().unwrap();
    let config = AgentConfig { root: dir.path().join("data"), ..base };
    let executor = Arc::new(StubExecutor::default());
    let agent = Agent::with_parts(&config, registry, executor.clone()).unwrap();
    Scratch { dir, agent, executor }
}

/// Handler that counts its invocations and succeeds with its own label.
pub struct Counting {
    pub label: &'static str,
    pub hits: Arc<AtomicUsize>,
}

impl Counting {
    pub fn new(label: &'static str) -> (Self, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        (Self { label, hits: hits.clone() }, hits)
    }
}

#[async_trait]
impl taskrune::Handler for Counting {
    async fn handle(
        &self,
        _task: &taskrune::TaskText,
        _ctx: &taskrune::HandlerContext,
    ) -> Result<taskrune::Completed, taskrune::TaskError> {
        self.hits.fetch_add(1, Ordering::SeqCst);
        Ok(taskrune::Completed::new(self.label))
    }
}

//! Entry point tying configuration, sandbox, registry and executor together.

use std::io::ErrorKind;
use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::AgentConfig;
use crate::handler::HandlerEnv;
use crate::handlers::builtin_registry;
use crate::outcome::TaskOutcome;
use crate::registry::{Registry, RegistryError};
use crate::router::Router;
use crate::sandbox::{Executor, NativeExecutor, Sandbox, SandboxDecision, SandboxError};

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("failed to create data root {path}: {source}")]
    CreateRoot {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Sandbox(#[from] SandboxError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Result of a raw file read through the sandbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Content(String),
    /// Missing, or refused by the sandbox. The two are indistinguishable to callers.
    NotFound,
    Failed(String),
}

#[derive(Clone)]
pub struct Agent {
    router: Router,
    sandbox: Arc<Sandbox>,
}

impl Agent {
    /// Agent with the built-in handlers and native process execution.
    pub fn new(config: &AgentConfig) -> Result<Self, AgentError> {
        Self::with_parts(config, builtin_registry()?, Arc::new(NativeExecutor))
    }

    pub fn with_parts(
        config: &AgentConfig,
        registry: Registry,
        executor: Arc<dyn Executor>,
    ) -> Result<Self, AgentError> {
        std::fs::create_dir_all(&config.root).map_err(|source| AgentError::CreateRoot {
            path: config.root.display().to_string(),
            source,
        })?;
        let mut sandbox = Sandbox::with_markers(&config.root, config.destructive_markers.iter().cloned())?;
        if let Some(prefix) = &config.mount_prefix {
            sandbox = sandbox.with_mount(prefix);
        }
        let sandbox = Arc::new(sandbox);
        let env = Arc::new(HandlerEnv {
            sandbox: sandbox.clone(),
            executor,
            tools: config.tools.clone(),
            exec_timeout: config.exec_timeout(),
            git_push: config.git_push,
        });
        info!(
            root = %sandbox.root().display(),
            handlers = registry.len(),
            exec_timeout_secs = config.exec_timeout_secs,
            "agent ready"
        );
        Ok(Self {
            router: Router::new(Arc::new(registry), env),
            sandbox,
        })
    }

    pub fn registry(&self) -> &Registry {
        self.router.registry()
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    pub async fn invoke(&self, text: &str) -> TaskOutcome {
        self.router.route(text).await
    }

    pub async fn invoke_with_cancel(&self, text: &str, cancel: CancellationToken) -> TaskOutcome {
        self.router.route_with_cancel(text, cancel).await
    }

    pub async fn read_file(&self, candidate: &str) -> ReadOutcome {
        let path = match self.sandbox.check_path(candidate) {
            SandboxDecision::Allowed(path) => path,
            SandboxDecision::Denied(denial) => {
                debug!(denial = ?denial, "read refused");
                return ReadOutcome::NotFound;
            }
        };
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => ReadOutcome::Content(text),
            Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::PermissionDenied) => {
                ReadOutcome::NotFound
            }
            Err(e) => ReadOutcome::Failed(self.sandbox.redact(&e.to_string())),
        }
    }
}

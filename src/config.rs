//! Startup configuration: defaults, then an optional YAML file, then
//! `TASKRUNE_*` environment overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ports::{EnvError, EnvironmentPort};
use crate::sandbox::{DEFAULT_DESTRUCTIVE_MARKERS, DEFAULT_MOUNT_PREFIX};

pub const ENV_CONFIG: &str = "TASKRUNE_CONFIG";
pub const ENV_ROOT: &str = "TASKRUNE_ROOT";
pub const ENV_EXEC_TIMEOUT: &str = "TASKRUNE_EXEC_TIMEOUT_SECS";
pub const ENV_PRETTIER: &str = "TASKRUNE_PRETTIER";
pub const ENV_GIT: &str = "TASKRUNE_GIT";
pub const ENV_GIT_PUSH: &str = "TASKRUNE_GIT_PUSH";
pub const ENV_MOUNT: &str = "TASKRUNE_MOUNT";

const DEFAULT_EXEC_TIMEOUT_SECS: u64 = 30;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("config {path} is malformed: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error(transparent)]
    Env(#[from] EnvError),
    #[error("exec timeout must be at least one second")]
    ZeroTimeout,
    #[error("mount prefix must be an absolute path below /: {0}")]
    Mount(String),
}

/// External programs some handlers drive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPaths {
    pub prettier: String,
    pub git: String,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            prettier: "prettier".to_string(),
            git: "git".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Data root; relative values are taken from the working directory.
    pub root: PathBuf,
    /// Absolute prefix in task text that stands for `root`; `None` disables it.
    pub mount_prefix: Option<String>,
    pub exec_timeout_secs: u64,
    pub destructive_markers: Vec<String>,
    pub tools: ToolPaths,
    pub git_push: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("data"),
            mount_prefix: Some(DEFAULT_MOUNT_PREFIX.to_string()),
            exec_timeout_secs: DEFAULT_EXEC_TIMEOUT_SECS,
            destructive_markers: DEFAULT_DESTRUCTIVE_MARKERS
                .iter()
                .map(|m| m.to_string())
                .collect(),
            tools: ToolPaths::default(),
            git_push: false,
        }
    }
}

impl AgentConfig {
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    pub fn exec_timeout(&self) -> Duration {
        Duration::from_secs(self.exec_timeout_secs)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let shown = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: shown.clone(),
            source,
        })?;
        serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse { path: shown, source })
    }

    /// Full layered load. `file` wins over `TASKRUNE_CONFIG`.
    pub fn load(file: Option<&Path>, env: &dyn EnvironmentPort) -> Result<Self, ConfigError> {
        let from_env = optional_var(env, ENV_CONFIG)?.map(PathBuf::from);
        let mut cfg = match file.map(Path::to_path_buf).or(from_env) {
            Some(path) => Self::from_yaml_file(&path)?,
            None => Self::default(),
        };
        cfg.apply_env(env)?;
        if cfg.root.is_relative() {
            cfg.root = PathBuf::from(env.current_dir()?).join(&cfg.root);
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn apply_env(&mut self, env: &dyn EnvironmentPort) -> Result<(), ConfigError> {
        if let Some(root) = optional_var(env, ENV_ROOT)? {
            self.root = PathBuf::from(root);
        }
        if let Some(mount) = optional_var(env, ENV_MOUNT)? {
            self.mount_prefix = match mount.trim() {
                "off" | "none" => None,
                prefix => Some(prefix.to_string()),
            };
        }
        if let Some(raw) = optional_var(env, ENV_EXEC_TIMEOUT)? {
            self.exec_timeout_secs = raw
                .trim()
                .parse()
                .map_err(|_| EnvError::InvalidValue(ENV_EXEC_TIMEOUT.to_string(), raw.clone()))?;
        }
        if let Some(prettier) = optional_var(env, ENV_PRETTIER)? {
            self.tools.prettier = prettier;
        }
        if let Some(git) = optional_var(env, ENV_GIT)? {
            self.tools.git = git;
        }
        if let Some(raw) = optional_var(env, ENV_GIT_PUSH)? {
            self.git_push = matches!(raw.trim(), "1" | "true" | "yes");
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.exec_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if let Some(prefix) = &self.mount_prefix {
            let path = Path::new(prefix);
            if !path.is_absolute() || path.parent().is_none() {
                return Err(ConfigError::Mount(prefix.clone()));
            }
        }
        Ok(())
    }
}

fn optional_var(env: &dyn EnvironmentPort, key: &str) -> Result<Option<String>, EnvError> {
    match env.get_var(key) {
        Ok(v) if v.trim().is_empty() => Ok(None),
        Ok(v) => Ok(Some(v)),
        Err(EnvError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

use std::collections::HashMap;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnvError {
    #[error("Environment variable not found: {0}")]
    NotFound(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Read-only view of the process environment used when loading configuration.
pub trait EnvironmentPort: Send + Sync {
    fn get_var(&self, key: &str) -> Result<String, EnvError>;
    fn current_dir(&self) -> Result<String, EnvError>;
}

/// Fixed environment, handy for tests and embedding.
#[derive(Debug, Default, Clone)]
pub struct MapEnv {
    vars: HashMap<String, String>,
    cwd: String,
}

impl MapEnv {
    pub fn new(cwd: impl Into<String>) -> Self {
        Self {
            vars: HashMap::new(),
            cwd: cwd.into(),
        }
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_string(), value.to_string());
        self
    }
}

impl EnvironmentPort for MapEnv {
    fn get_var(&self, key: &str) -> Result<String, EnvError> {
        self.vars
            .get(key)
            .cloned()
            .ok_or_else(|| EnvError::NotFound(key.to_string()))
    }

    fn current_dir(&self) -> Result<String, EnvError> {
        Ok(self.cwd.clone())
    }
}

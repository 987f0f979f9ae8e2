use crate::ports::{env::EnvError, EnvironmentPort};

pub struct StdEnvAdapter;

impl EnvironmentPort for StdEnvAdapter {
    fn get_var(&self, key: &str) -> Result<String, EnvError> {
        std::env::var(key).map_err(|e| match e {
            std::env::VarError::NotPresent => EnvError::NotFound(key.to_string()),
            std::env::VarError::NotUnicode(_) => {
                EnvError::InvalidValue(key.to_string(), "invalid UTF-8".to_string())
            }
        })
    }

    fn current_dir(&self) -> Result<String, EnvError> {
        std::env::current_dir()
            .map_err(|e| EnvError::InvalidValue("current_dir".to_string(), e.to_string()))
            .and_then(|p| {
                p.to_str()
                    .ok_or_else(|| {
                        EnvError::InvalidValue(
                            "current_dir".to_string(),
                            "invalid UTF-8".to_string(),
                        )
                    })
                    .map(|s| s.to_string())
            })
    }
}

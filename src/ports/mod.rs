pub mod env;

pub use env::{EnvError, EnvironmentPort, MapEnv};

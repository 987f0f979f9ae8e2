pub mod std_adapters;

pub use std_adapters::StdEnvAdapter;

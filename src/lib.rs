//! Free-text task automation over a sandboxed data root.
//!
//! A [`Router`] matches task text against an ordered [`Registry`] of
//! predicates and runs the first matching [`Handler`]. Handlers reach the
//! filesystem and external programs only through the [`Sandbox`].

pub mod adapters;
pub mod agent;
pub mod config;
pub mod handler;
pub mod handlers;
#[cfg(feature = "http")]
pub mod http;
pub mod observability;
pub mod outcome;
pub mod ports;
pub mod registry;
pub mod router;
pub mod sandbox;
pub mod schema;

pub use agent::{Agent, AgentError, ReadOutcome};
pub use config::AgentConfig;
pub use handler::{Handler, HandlerContext, HandlerEnv};
pub use outcome::{Completed, FailureKind, TaskError, TaskOutcome};
pub use registry::{Predicate, Registry, TaskText};
pub use router::Router;
pub use sandbox::{Sandbox, SandboxDecision};

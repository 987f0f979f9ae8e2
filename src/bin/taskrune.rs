use clap::{Parser, Subcommand};
use std::path::PathBuf;
#[cfg(feature = "http")]
use std::sync::Arc;

use taskrune::adapters::StdEnvAdapter;
use taskrune::agent::{Agent, ReadOutcome};
use taskrune::config::AgentConfig;
use taskrune::observability::init_observability;
use taskrune::outcome::{FailureKind, TaskOutcome};
use taskrune::schema::TaskResponse;

#[derive(Parser, Debug)]
#[command(name = "taskrune", version)]
struct Cli {
    /// YAML config file (overrides TASKRUNE_CONFIG)
    #[arg(long = "config", global = true)]
    config: Option<PathBuf>,
    /// Data root (overrides config and TASKRUNE_ROOT)
    #[arg(long = "root", global = true)]
    root: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Route one task description and print the JSON result
    Run { task: String },
    /// Print a file from the data root
    Read { path: String },
    /// Serve the HTTP front end
    #[cfg(feature = "http")]
    Serve {
        #[arg(long = "addr", default_value = "127.0.0.1:8000")]
        addr: std::net::SocketAddr,
    },
}

fn exit_code(outcome: &TaskOutcome) -> i32 {
    match outcome.kind() {
        None => 0,
        Some(FailureKind::BadRequest) => 1,
        Some(FailureKind::SecurityViolation) => 3,
        Some(FailureKind::Internal) => 4,
        Some(FailureKind::NotFound) => 5,
        Some(FailureKind::UpstreamFailure) => 6,
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = init_observability() {
        eprintln!("warning: logging not initialized: {e}");
    }

    let mut config = match AgentConfig::load(cli.config.as_deref(), &StdEnvAdapter) {
        Ok(c) => c,
        Err(e) => { eprintln!("error: {e}"); std::process::exit(4); }
    };
    if let Some(root) = cli.root { config.root = root; }

    let rt = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => { eprintln!("error: failed to start runtime: {e}"); std::process::exit(4); }
    };
    let code = rt.block_on(async move {
        let agent = match Agent::new(&config) {
            Ok(a) => a,
            Err(e) => { eprintln!("error: {e}"); return 4; }
        };
        match cli.command {
            Commands::Run { task } => {
                let outcome = agent.invoke(&task).await;
                match serde_json::to_string_pretty(&TaskResponse::from(&outcome)) {
                    Ok(body) => println!("{body}"),
                    Err(e) => { eprintln!("error: output encoding failed: {e}"); return 4; }
                }
                exit_code(&outcome)
            }
            Commands::Read { path } => match agent.read_file(&path).await {
                ReadOutcome::Content(text) => { print!("{text}"); 0 }
                ReadOutcome::NotFound => { eprintln!("not found: {path}"); 5 }
                ReadOutcome::Failed(details) => { eprintln!("error: {details}"); 4 }
            },
            #[cfg(feature = "http")]
            Commands::Serve { addr } => match taskrune::http::serve(addr, Arc::new(agent)).await {
                Ok(()) => 0,
                Err(e) => { eprintln!("serve error: {e}"); 4 }
            },
        }
    });
    std::process::exit(code);
}

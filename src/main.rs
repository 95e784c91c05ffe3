//! Readiness coordinator entrypoint.
//!
//! Wraps a service's command so it only starts once its dependency is up.
//!
//! # Architecture Overview
//!
//! ```text
//!   coordinator [OPTIONS] <HOST> <COMMAND> [ARGS]...
//!        │
//!        ▼
//!   ┌─────────┐   file + env + flags   ┌────────────┐
//!   │   cli   │───────────────────────▶│   config   │
//!   └─────────┘                        └─────┬──────┘
//!                                            ▼
//!   ┌──────────────────────────────────────────────────────────┐
//!   │  health::ReadinessGate                                    │
//!   │    probe (tcp | postgres | http | exec) under timeout     │
//!   │    fail → log to stderr → resilience::RetryState → sleep  │
//!   │    SIGTERM/SIGINT → lifecycle::Shutdown → Aborted         │
//!   └──────────────────────────┬───────────────────────────────┘
//!                              ▼ Ready
//!   ┌──────────────────────────────────────────────────────────┐
//!   │  lifecycle::handoff                                       │
//!   │    replace: exec(2) the command                           │
//!   │    spawn:   child + signal forwarding + exit code         │
//!   └──────────────────────────────────────────────────────────┘
//! ```

use std::ffi::OsString;

use clap::Parser;

use readiness_gate::cli::ProbeArgs;
use readiness_gate::config::{HandoffStrategy, ObservabilityConfig};
use readiness_gate::lifecycle::startup::EXIT_CONFIG;
use readiness_gate::lifecycle::{signals, ArgumentVector, Coordinator, Shutdown};
use readiness_gate::observability::init_logging;

#[derive(Parser, Debug)]
#[command(name = "coordinator", version)]
#[command(about = "Wait for a dependency to accept connections, then run a command")]
struct Cli {
    #[command(flatten)]
    probe: ProbeArgs,

    /// How to hand off once ready
    #[arg(long, value_enum)]
    strategy: Option<HandoffStrategy>,

    /// Dependency host: host, host:port or [v6]:port
    host: String,

    /// Command to run once the dependency is ready
    #[arg(
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_parser = clap::value_parser!(OsString)
    )]
    command: Vec<OsString>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    let code = run(cli).await;
    std::process::exit(code);
}

async fn run(cli: Cli) -> i32 {
    let mut resolved = match cli.probe.resolve(&cli.host) {
        Ok(resolved) => resolved,
        Err(e) => {
            init_logging(&ObservabilityConfig::default());
            tracing::error!(error = %e, "Invalid configuration");
            return EXIT_CONFIG;
        }
    };
    if let Some(strategy) = cli.strategy {
        resolved.config.handoff.strategy = strategy;
    }

    init_logging(&resolved.config.observability);
    resolved.log_notices();
    let config = resolved.config;

    let argv = match ArgumentVector::new(cli.command) {
        Ok(argv) => argv,
        Err(e) => {
            tracing::error!(error = %e, "Invalid command");
            return EXIT_CONFIG;
        }
    };

    let coordinator = match Coordinator::from_config(&config) {
        Ok(coordinator) => coordinator,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return EXIT_CONFIG;
        }
    };

    let shutdown = Shutdown::new();
    let _signals = match signals::install(shutdown.clone()) {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "Signal handlers unavailable; wait cannot be interrupted");
            None
        }
    };

    coordinator.run(&argv, &shutdown).await
}

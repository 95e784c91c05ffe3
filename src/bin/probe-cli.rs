use std::time::Duration;

use clap::Parser;
use serde::Serialize;

use readiness_gate::cli::ProbeArgs;
use readiness_gate::health::{
    build_probe, ProbeTarget, ReadinessGate, ReadinessOutcome, ReadinessReport,
};
use readiness_gate::lifecycle::{signals, Shutdown};
use readiness_gate::observability::init_logging;
use readiness_gate::resilience::RetryPolicy;

#[derive(Parser)]
#[command(name = "probe-cli")]
#[command(about = "Probe a dependency and print its readiness as JSON", long_about = None)]
struct Cli {
    #[command(flatten)]
    probe: ProbeArgs,

    /// Run the configured retry loop instead of a single probe
    #[arg(long)]
    wait: bool,

    /// Dependency host: host, host:port or [v6]:port
    host: String,
}

#[derive(Serialize)]
struct ProbeSummary<'a> {
    dependency: &'a str,
    address: String,
    kind: &'static str,
    outcome: &'static str,
    attempts: u32,
    elapsed_ms: u64,
    error: Option<String>,
}

impl<'a> ProbeSummary<'a> {
    fn new(target: &'a ProbeTarget, report: ReadinessReport) -> Self {
        let error = match &report.outcome {
            ReadinessOutcome::Ready => None,
            ReadinessOutcome::TimedOut => report.last_error.clone(),
            ReadinessOutcome::Aborted(reason) => Some(reason.clone()),
        };
        Self {
            dependency: target.name(),
            address: target.address(),
            kind: target.kind().as_str(),
            outcome: report.outcome.as_str(),
            attempts: report.attempts,
            elapsed_ms: duration_ms(report.elapsed),
            error,
        }
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let resolved = cli.probe.resolve(&cli.host)?;
    let config = &resolved.config;
    init_logging(&config.observability);
    resolved.log_notices();

    let target = ProbeTarget::from_config(&config.target)?;
    let probe = build_probe(&target)?;

    let mut policy = RetryPolicy::from_config(&config.retry);
    if !cli.wait {
        policy = policy.with_max_attempts(1);
    }

    let shutdown = Shutdown::new();
    let _signals = signals::install(shutdown.clone())?;

    let report = ReadinessGate::new(probe.as_ref(), policy)
        .with_shutdown(shutdown.subscribe())
        .run()
        .await;
    let ready = report.outcome.is_ready();

    println!("{}", serde_json::to_string_pretty(&ProbeSummary::new(&target, report))?);

    if !ready {
        std::process::exit(1);
    }
    Ok(())
}

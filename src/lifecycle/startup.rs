//! Startup orchestration.
//!
//! # Responsibilities
//! - Turn a validated config into a probe, a retry policy and a strategy
//! - Gate the wrapped command on the dependency's readiness
//! - Map every outcome to the process exit code
//!
//! # Exit codes
//! - wrapped command's own code (spawn) or the command itself (replace)
//! - 1: the command could not be launched
//! - 124: a configured bound was reached before readiness
//! - 130: a termination signal arrived while waiting

use thiserror::Error;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::{ConfigError, GateConfig, HandoffStrategy};
use crate::health::{build_probe, Probe, ProbeError, ProbeTarget, ReadinessGate, ReadinessOutcome};
use crate::lifecycle::handoff::{self, ArgumentVector, EXIT_LAUNCH_FAILURE};
use crate::lifecycle::Shutdown;
use crate::resilience::RetryPolicy;

/// Exit code when a bound is reached, as `timeout(1)` reports it.
pub const EXIT_TIMED_OUT: i32 = 124;

/// Exit code when the wait is aborted by a signal.
pub const EXIT_ABORTED: i32 = 130;

/// Exit code for configuration errors.
pub const EXIT_CONFIG: i32 = 1;

/// Errors that prevent the coordinator from starting its wait.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("cannot build probe: {0}")]
    Probe(#[from] ProbeError),
}

/// Wait-then-handoff for one process start.
pub struct Coordinator {
    probe: Box<dyn Probe>,
    policy: RetryPolicy,
    strategy: HandoffStrategy,
}

impl Coordinator {
    pub fn new(probe: Box<dyn Probe>, policy: RetryPolicy, strategy: HandoffStrategy) -> Self {
        Self {
            probe,
            policy,
            strategy,
        }
    }

    pub fn from_config(config: &GateConfig) -> Result<Self, StartupError> {
        let target = ProbeTarget::from_config(&config.target)?;
        let probe = build_probe(&target)?;

        tracing::debug!(
            dependency = %target.name(),
            address = %target.address(),
            kind = %target.kind(),
            interval_ms = config.retry.interval_ms,
            max_attempts = ?config.retry.max_attempts,
            max_duration_secs = ?config.retry.max_duration_secs,
            strategy = ?config.handoff.strategy,
            "Configuration loaded"
        );

        Ok(Self::new(
            probe,
            RetryPolicy::from_config(&config.retry),
            config.handoff.strategy,
        ))
    }

    /// Wait for readiness, then hand off. Returns the exit code to use.
    ///
    /// With the replace strategy a successful handoff never returns.
    pub async fn run(self, argv: &ArgumentVector, shutdown: &Shutdown) -> i32 {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("coordinator", %run_id);

        async move {
            let outcome = ReadinessGate::new(self.probe.as_ref(), self.policy)
                .with_shutdown(shutdown.subscribe())
                .await_ready()
                .await;

            match outcome {
                ReadinessOutcome::Ready => match handoff::exec(argv, self.strategy).await {
                    Ok(code) => code,
                    Err(e) => {
                        tracing::error!(error = %e, "Launch failed");
                        EXIT_LAUNCH_FAILURE
                    }
                },
                ReadinessOutcome::TimedOut => {
                    tracing::error!(dependency = %self.probe.name(), "Dependency not ready in time");
                    EXIT_TIMED_OUT
                }
                ReadinessOutcome::Aborted(reason) => {
                    tracing::warn!(reason = %reason, "Aborted before dependency was ready");
                    EXIT_ABORTED
                }
            }
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProbeKind;
    use async_trait::async_trait;
    use std::ffi::OsString;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    struct CountingProbe {
        ready_after: u32,
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl Probe for CountingProbe {
        fn name(&self) -> &str {
            "postgres"
        }

        fn kind(&self) -> ProbeKind {
            ProbeKind::Postgres
        }

        async fn probe(&self) -> Result<(), ProbeError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n > self.ready_after {
                Ok(())
            } else {
                Err(ProbeError::Rejected {
                    code: "57P03".into(),
                    message: "the database system is starting up".into(),
                })
            }
        }
    }

    fn coordinator(ready_after: u32, policy: RetryPolicy) -> (Coordinator, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        let probe = CountingProbe {
            ready_after,
            calls: calls.clone(),
        };
        (
            Coordinator::new(Box::new(probe), policy, HandoffStrategy::Spawn),
            calls,
        )
    }

    fn argv(parts: &[&str]) -> ArgumentVector {
        ArgumentVector::new(parts.iter().map(OsString::from).collect()).unwrap()
    }

    #[tokio::test]
    async fn test_ready_then_spawn_returns_child_code() {
        let (coordinator, calls) = coordinator(2, RetryPolicy::unbounded(Duration::from_millis(5)));
        let code = coordinator
            .run(&argv(&["sh", "-c", "exit 42"]), &Shutdown::new())
            .await;
        assert_eq!(code, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_launch_failure_exit_code() {
        let (coordinator, _) = coordinator(0, RetryPolicy::unbounded(Duration::from_millis(5)));
        let code = coordinator
            .run(&argv(&["/nonexistent/service-binary"]), &Shutdown::new())
            .await;
        assert_eq!(code, EXIT_LAUNCH_FAILURE);
    }

    #[tokio::test]
    async fn test_bound_reached_exit_code() {
        let policy = RetryPolicy::unbounded(Duration::from_millis(5)).with_max_attempts(3);
        let (coordinator, calls) = coordinator(u32::MAX, policy);
        let code = coordinator.run(&argv(&["true"]), &Shutdown::new()).await;
        assert_eq!(code, EXIT_TIMED_OUT);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_aborted_exit_code() {
        let shutdown = Shutdown::new();
        shutdown.trigger("received SIGTERM");
        let (coordinator, _) = coordinator(u32::MAX, RetryPolicy::unbounded(Duration::from_secs(60)));
        let code = coordinator.run(&argv(&["true"]), &shutdown).await;
        assert_eq!(code, EXIT_ABORTED);
    }

    #[test]
    fn test_from_config_requires_host() {
        assert!(matches!(
            Coordinator::from_config(&GateConfig::default()),
            Err(StartupError::Config(_))
        ));
    }
}

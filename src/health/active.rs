//! Active readiness waiting.
//!
//! # Responsibilities
//! - Probe the dependency until it is ready or a bound is reached
//! - Log every failed attempt to the diagnostic stream
//! - Exit promptly when shutdown is requested, mid-probe or mid-sleep

use std::time::{Duration, Instant};

use tracing::Instrument;

use crate::health::probe::Probe;
use crate::health::state::{ReadinessOutcome, ReadinessReport};
use crate::lifecycle::ShutdownListener;
use crate::resilience::timeouts::with_timeout;
use crate::resilience::{RetryDecision, RetryPolicy, RetryState};

/// Blocks until a dependency is ready. One gate per wait; no state survives it.
pub struct ReadinessGate<'a> {
    probe: &'a dyn Probe,
    policy: RetryPolicy,
    shutdown: Option<ShutdownListener>,
}

impl<'a> ReadinessGate<'a> {
    pub fn new(probe: &'a dyn Probe, policy: RetryPolicy) -> Self {
        Self {
            probe,
            policy,
            shutdown: None,
        }
    }

    /// Abort the wait when `listener` fires.
    pub fn with_shutdown(mut self, listener: ShutdownListener) -> Self {
        self.shutdown = Some(listener);
        self
    }

    /// Wait for readiness and return only the outcome.
    pub async fn await_ready(self) -> ReadinessOutcome {
        self.run().await.outcome
    }

    /// Wait for readiness and report how the wait went.
    pub async fn run(self) -> ReadinessReport {
        let Self {
            probe,
            policy,
            mut shutdown,
        } = self;
        let name = probe.name();
        let span = tracing::info_span!("wait", dependency = %name, kind = %probe.kind());

        async move {
            let started = Instant::now();
            let mut retry = RetryState::new(&policy);
            let mut attempts = 0u32;
            let mut last_error = None;

            let report = |outcome, attempts, last_error| ReadinessReport {
                outcome,
                attempts,
                elapsed: started.elapsed(),
                last_error,
            };

            if !policy.initial_delay.is_zero() {
                if let Err(reason) = sleep_or_shutdown(policy.initial_delay, &mut shutdown).await {
                    return report(ReadinessOutcome::Aborted(reason), attempts, last_error);
                }
            }

            loop {
                attempts += 1;

                let result = tokio::select! {
                    result = with_timeout(policy.probe_timeout, probe.probe()) => result,
                    reason = wait_shutdown(&mut shutdown) => {
                        tracing::info!(attempt = attempts, reason = %reason, "Wait aborted during probe");
                        return report(ReadinessOutcome::Aborted(reason), attempts, last_error);
                    }
                };

                let err = match result {
                    Ok(()) => {
                        tracing::debug!(attempt = attempts, "{} is up", name);
                        return report(ReadinessOutcome::Ready, attempts, last_error);
                    }
                    Err(err) => err,
                };

                match retry.record_failure() {
                    RetryDecision::Retry(delay) => {
                        tracing::warn!(
                            attempt = attempts,
                            error = %err,
                            "{} is unavailable - retrying",
                            name
                        );
                        last_error = Some(err.to_string());
                        if let Err(reason) = sleep_or_shutdown(delay, &mut shutdown).await {
                            tracing::info!(attempt = attempts, reason = %reason, "Wait aborted");
                            return report(ReadinessOutcome::Aborted(reason), attempts, last_error);
                        }
                    }
                    RetryDecision::Exhausted => {
                        tracing::error!(
                            attempt = attempts,
                            error = %err,
                            elapsed_ms = retry.elapsed().as_millis() as u64,
                            "{} is unavailable - giving up",
                            name
                        );
                        last_error = Some(err.to_string());
                        return report(ReadinessOutcome::TimedOut, attempts, last_error);
                    }
                }
            }
        }
        .instrument(span)
        .await
    }
}

async fn wait_shutdown(listener: &mut Option<ShutdownListener>) -> String {
    match listener {
        Some(listener) => listener.recv().await,
        None => std::future::pending().await,
    }
}

async fn sleep_or_shutdown(
    delay: Duration,
    listener: &mut Option<ShutdownListener>,
) -> Result<(), String> {
    tokio::select! {
        _ = tokio::time::sleep(delay) => Ok(()),
        reason = wait_shutdown(listener) => Err(reason),
    }
}

//! Retry policy and per-run retry bookkeeping.
//!
//! # Responsibilities
//! - Describe how often and how long to keep probing
//! - Decide after each failure whether another attempt is allowed
//! - Clamp the last sleep so a duration bound is met, never undershot
//!
//! # Design Decisions
//! - No bound means retry forever; callers opt into that explicitly
//! - Attempt bound counts probes, not sleeps: `max_attempts = n` → n probes
//! - Duration bound is checked after a failed probe, so `TimedOut` is only
//!   reported once the deadline has actually passed

use std::time::{Duration, Instant};

use crate::config::RetryConfig;
use crate::resilience::backoff::Backoff;

/// Default per-attempt probe timeout.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// How a readiness wait retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub backoff: Backoff,
    pub max_attempts: Option<u32>,
    pub max_duration: Option<Duration>,
    pub probe_timeout: Duration,
    pub initial_delay: Duration,
}

impl RetryPolicy {
    /// Fixed interval, retry forever.
    pub fn unbounded(interval: Duration) -> Self {
        Self {
            backoff: Backoff::Fixed(interval),
            max_attempts: None,
            max_duration: None,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            initial_delay: Duration::ZERO,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            backoff: Backoff::from_config(config),
            max_attempts: config.max_attempts,
            max_duration: config.max_duration_secs.map(Duration::from_secs),
            probe_timeout: Duration::from_millis(config.probe_timeout_ms),
            initial_delay: Duration::from_millis(config.initial_delay_ms),
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    pub fn with_max_duration(mut self, duration: Duration) -> Self {
        self.max_duration = Some(duration);
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// True when either an attempt or a duration bound is set.
    pub fn is_bounded(&self) -> bool {
        self.max_attempts.is_some() || self.max_duration.is_some()
    }
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep for the given delay, then probe again.
    Retry(Duration),
    /// A configured bound has been reached.
    Exhausted,
}

/// Mutable bookkeeping for a single wait.
#[derive(Debug)]
pub struct RetryState<'a> {
    policy: &'a RetryPolicy,
    started: Instant,
    deadline: Option<Instant>,
    failures: u32,
}

impl<'a> RetryState<'a> {
    pub fn new(policy: &'a RetryPolicy) -> Self {
        let started = Instant::now();
        Self {
            policy,
            started,
            deadline: policy.max_duration.map(|d| started + d),
            failures: 0,
        }
    }

    /// Record a failed attempt and decide whether to continue.
    pub fn record_failure(&mut self) -> RetryDecision {
        self.failures = self.failures.saturating_add(1);

        if let Some(max) = self.policy.max_attempts {
            if self.failures >= max {
                return RetryDecision::Exhausted;
            }
        }

        let mut delay = self.policy.backoff.delay(self.failures);
        if let Some(deadline) = self.deadline {
            let now = Instant::now();
            if now >= deadline {
                return RetryDecision::Exhausted;
            }
            delay = delay.min(deadline - now);
        }

        RetryDecision::Retry(delay)
    }

    /// Number of failed attempts so far.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

//! Delay strategies between probe attempts.

use std::time::Duration;
use rand::Rng;

use crate::config::{BackoffKind, RetryConfig};

/// Delay strategy between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay after every failure.
    Fixed(Duration),
    /// Doubling delay with jitter, capped at `max`.
    Exponential { base: Duration, max: Duration },
}

impl Backoff {
    pub fn from_config(config: &RetryConfig) -> Self {
        let base = Duration::from_millis(config.interval_ms);
        match config.backoff {
            BackoffKind::Fixed => Backoff::Fixed(base),
            BackoffKind::Exponential => Backoff::Exponential {
                base,
                max: Duration::from_millis(config.max_delay_ms),
            },
        }
    }

    /// Delay to wait after the `failures`-th consecutive failure (1-based).
    pub fn delay(&self, failures: u32) -> Duration {
        match *self {
            Backoff::Fixed(interval) => interval,
            Backoff::Exponential { base, max } => calculate_backoff(
                failures,
                base.as_millis() as u64,
                max.as_millis() as u64,
            ),
        }
    }
}

/// Calculate exponential backoff delay with jitter.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let delay_ms = base_ms.saturating_mul(exponential_base);
    let capped_delay = delay_ms.min(max_ms);

    // Apply jitter (0 to 10% of the delay)
    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}

//! Readiness outcomes.
//!
//! # States
//! - Ready: the probe succeeded; hand off to the wrapped command
//! - TimedOut: a configured bound was reached; the caller decides fatality
//! - Aborted: shutdown was requested while waiting

use std::fmt;
use std::time::Duration;

/// Result of a readiness wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadinessOutcome {
    Ready,
    TimedOut,
    Aborted(String),
}

impl ReadinessOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, ReadinessOutcome::Ready)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReadinessOutcome::Ready => "ready",
            ReadinessOutcome::TimedOut => "timed_out",
            ReadinessOutcome::Aborted(_) => "aborted",
        }
    }
}

impl fmt::Display for ReadinessOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadinessOutcome::Aborted(reason) => write!(f, "aborted: {reason}"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Outcome plus the bookkeeping of the wait that produced it.
#[derive(Debug, Clone)]
pub struct ReadinessReport {
    pub outcome: ReadinessOutcome,
    /// Probe calls made, including the successful one.
    pub attempts: u32,
    pub elapsed: Duration,
    /// Error from the most recent failed attempt.
    pub last_error: Option<String>,
}

//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Probe attempt:
//!     → timeouts.rs (enforce per-attempt deadline)
//!     → On failure: retries.rs (check bounds, pick next delay)
//!     → backoff.rs (fixed interval, or exponential with jitter)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every probe has a deadline
//! - Probe failures are always retryable; only bounds stop the loop
//! - Fixed interval is the default backoff

pub mod backoff;
pub mod retries;
pub mod timeouts;

pub use backoff::Backoff;
pub use retries::{RetryDecision, RetryPolicy, RetryState};

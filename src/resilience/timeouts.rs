//! Timeout enforcement for probe attempts.
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from other probe errors
//! - A timed-out probe is dropped, which closes its socket or kills its child

use std::future::Future;
use std::time::Duration;

use crate::health::ProbeError;

/// Run a probe future under a deadline.
pub async fn with_timeout<T, F>(timeout: Duration, fut: F) -> Result<T, ProbeError>
where
    F: Future<Output = Result<T, ProbeError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(ProbeError::Timeout(timeout)),
    }
}

//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, bounds > 0)
//! - Check that each probe kind has the settings it needs
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GateConfig → Result<(), Vec<ValidationError>>
//! - Runs after file, environment and CLI layers are merged

use thiserror::Error;

use crate::config::schema::{BackoffKind, GateConfig, ProbeKind};

/// A single semantic problem with the merged configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("target host is missing")]
    MissingHost,

    #[error("target port must be non-zero")]
    ZeroPort,

    #[error("retry.{0} must be greater than zero")]
    ZeroValue(&'static str),

    #[error("retry.max_delay_ms ({max}) is smaller than retry.interval_ms ({interval})")]
    MaxDelayBelowInterval { max: u64, interval: u64 },

    #[error("exec probes require target.command")]
    MissingCommand,

    #[error("http probes require target.http_path to start with '/' (got {0:?})")]
    InvalidHttpPath(String),
}

/// Validate a merged configuration.
pub fn validate_config(config: &GateConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let target = &config.target;
    let retry = &config.retry;

    match target.host.as_deref() {
        None | Some("") => errors.push(ValidationError::MissingHost),
        Some(_) => {}
    }
    if target.port == Some(0) {
        errors.push(ValidationError::ZeroPort);
    }

    if retry.interval_ms == 0 {
        errors.push(ValidationError::ZeroValue("interval_ms"));
    }
    if retry.probe_timeout_ms == 0 {
        errors.push(ValidationError::ZeroValue("probe_timeout_ms"));
    }
    if retry.max_attempts == Some(0) {
        errors.push(ValidationError::ZeroValue("max_attempts"));
    }
    if retry.max_duration_secs == Some(0) {
        errors.push(ValidationError::ZeroValue("max_duration_secs"));
    }
    if retry.backoff == BackoffKind::Exponential && retry.max_delay_ms < retry.interval_ms {
        errors.push(ValidationError::MaxDelayBelowInterval {
            max: retry.max_delay_ms,
            interval: retry.interval_ms,
        });
    }

    match target.kind {
        ProbeKind::Exec => {
            if target.command.as_deref().map_or(true, |c| c.trim().is_empty()) {
                errors.push(ValidationError::MissingCommand);
            }
        }
        ProbeKind::Http => {
            if !target.http_path.starts_with('/') {
                errors.push(ValidationError::InvalidHttpPath(target.http_path.clone()));
            }
        }
        ProbeKind::Tcp | ProbeKind::Postgres => {}
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

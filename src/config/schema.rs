//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the coordinator.
//! All types derive Serde traits for deserialization from config files.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Root configuration for the readiness coordinator.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GateConfig {
    /// Dependency to probe.
    pub target: TargetConfig,

    /// Retry loop settings.
    pub retry: RetryConfig,

    /// How control is handed to the wrapped command.
    pub handoff: HandoffConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Probe mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProbeKind {
    /// TCP connect succeeds.
    Tcp,
    /// Postgres startup handshake is accepted.
    #[default]
    Postgres,
    /// HTTP GET returns 2xx.
    Http,
    /// Shell command exits 0.
    Exec,
}

impl ProbeKind {
    /// Port used when the host argument carries none.
    pub fn default_port(self) -> u16 {
        match self {
            ProbeKind::Http => 80,
            ProbeKind::Tcp | ProbeKind::Postgres | ProbeKind::Exec => 5432,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProbeKind::Tcp => "tcp",
            ProbeKind::Postgres => "postgres",
            ProbeKind::Http => "http",
            ProbeKind::Exec => "exec",
        }
    }
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target dependency configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Display name used in diagnostics (defaults to the host).
    pub name: Option<String>,

    /// Host to probe. Normally supplied on the command line.
    pub host: Option<String>,

    /// Port to probe. Falls back to the kind's default.
    pub port: Option<u16>,

    /// Probe mechanism.
    pub kind: ProbeKind,

    /// Connection user (Postgres).
    pub user: Option<String>,

    /// Connection password (Postgres). Prefer `POSTGRES_PASSWORD` over the file.
    pub password: Option<String>,

    /// Database name (Postgres). Defaults to the user name.
    pub database: Option<String>,

    /// Request path for HTTP probes.
    pub http_path: String,

    /// Shell command for exec probes.
    pub command: Option<String>,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            name: None,
            host: None,
            port: None,
            kind: ProbeKind::default(),
            user: None,
            password: None,
            database: None,
            http_path: "/".to_string(),
            command: None,
        }
    }
}

/// Backoff strategy between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    /// Constant `interval_ms` between attempts.
    #[default]
    Fixed,
    /// Doubling delay from `interval_ms` up to `max_delay_ms`, with jitter.
    Exponential,
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Delay between attempts in milliseconds.
    pub interval_ms: u64,

    /// Give up after this many probes. Unbounded when absent.
    pub max_attempts: Option<u32>,

    /// Give up after this many seconds. Unbounded when absent.
    pub max_duration_secs: Option<u64>,

    /// Per-attempt probe timeout in milliseconds.
    pub probe_timeout_ms: u64,

    /// Delay before the first probe in milliseconds.
    pub initial_delay_ms: u64,

    /// Backoff strategy.
    pub backoff: BackoffKind,

    /// Cap for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            max_attempts: None,
            max_duration_secs: None,
            probe_timeout_ms: 2000,
            initial_delay_ms: 0,
            backoff: BackoffKind::Fixed,
            max_delay_ms: 30_000,
        }
    }
}

/// Handoff strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum HandoffStrategy {
    /// Replace the coordinator's process image (`exec`).
    #[default]
    Replace,
    /// Spawn a child, forward signals, propagate its exit code.
    Spawn,
}

/// Handoff configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct HandoffConfig {
    pub strategy: HandoffStrategy,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    #[default]
    Compact,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    pub log_level: String,

    /// Log line format.
    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
        }
    }
}

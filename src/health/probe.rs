//! Probe abstraction and target description.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{ConfigError, ProbeKind, TargetConfig};
use crate::health::{exec::ExecProbe, http::HttpProbe, postgres::PostgresProbe, tcp::TcpProbe};

/// User assumed when none is configured, as libpq does for the stock image.
pub const DEFAULT_USER: &str = "postgres";

/// A single readiness check against a dependency.
///
/// Implementations perform one attempt and return. Timeouts and retries are
/// applied by the caller.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Dependency name used in diagnostics.
    fn name(&self) -> &str;

    /// Mechanism used by this probe.
    fn kind(&self) -> ProbeKind;

    /// Run one attempt. `Ok(())` means the dependency is ready.
    async fn probe(&self) -> Result<(), ProbeError>;
}

/// Why an attempt did not succeed. Always transient from the coordinator's view.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("connection failed: {0}")]
    Connect(#[source] std::io::Error),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("server rejected connection: {message} (SQLSTATE {code})")]
    Rejected { code: String, message: String },

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("probe command failed: {0}")]
    CommandFailed(String),
}

/// Connection parameters for authenticated probes.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: Option<String>,
    pub database: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("database", &self.database)
            .finish()
    }
}

/// The dependency being waited on. Immutable once built.
#[derive(Debug, Clone)]
pub struct ProbeTarget {
    name: String,
    host: String,
    port: u16,
    kind: ProbeKind,
    credentials: Credentials,
    http_path: String,
    command: Option<String>,
}

impl ProbeTarget {
    pub fn from_config(config: &TargetConfig) -> Result<Self, ConfigError> {
        let host = config
            .host
            .clone()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ConfigError::Host(String::new()))?;
        let user = config.user.clone().unwrap_or_else(|| DEFAULT_USER.to_string());
        let database = config.database.clone().unwrap_or_else(|| user.clone());

        Ok(Self {
            name: config.name.clone().unwrap_or_else(|| host.clone()),
            port: config.port.unwrap_or_else(|| config.kind.default_port()),
            kind: config.kind,
            credentials: Credentials {
                user,
                password: config.password.clone(),
                database,
            },
            http_path: config.http_path.clone(),
            command: config.command.clone(),
            host,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn kind(&self) -> ProbeKind {
        self.kind
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn http_path(&self) -> &str {
        &self.http_path
    }

    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }

    /// `host:port`, bracketing IPv6 literals.
    pub fn address(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

/// Build the probe matching the target's kind.
pub fn build_probe(target: &ProbeTarget) -> Result<Box<dyn Probe>, ProbeError> {
    let probe: Box<dyn Probe> = match target.kind() {
        ProbeKind::Tcp => Box::new(TcpProbe::new(target.clone())),
        ProbeKind::Postgres => Box::new(PostgresProbe::new(target.clone())),
        ProbeKind::Http => Box::new(HttpProbe::new(target.clone())?),
        ProbeKind::Exec => Box::new(ExecProbe::new(target.clone())),
    };
    Ok(probe)
}

//! Command-line options shared by `coordinator` and `probe-cli`.

use std::path::PathBuf;

use clap::Args;

use crate::config::{
    apply_env, load_config, split_host_port, validate_config, ConfigError, GateConfig, ProbeKind,
    CONFIG_ENV,
};

/// Probe and retry flags. Each one overrides the config file and environment.
#[derive(Debug, Clone, Default, Args)]
pub struct ProbeArgs {
    /// TOML config file (also READINESS_CONFIG)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Probe mechanism
    #[arg(long, value_enum)]
    pub kind: Option<ProbeKind>,

    /// Dependency name used in log lines (defaults to the host)
    #[arg(long)]
    pub name: Option<String>,

    /// Port to probe (overrides host:port)
    #[arg(long)]
    pub port: Option<u16>,

    /// Delay between attempts
    #[arg(long, value_name = "MS")]
    pub interval_ms: Option<u64>,

    /// Give up after this many probes
    #[arg(long, value_name = "N")]
    pub max_attempts: Option<u32>,

    /// Give up after this many seconds
    #[arg(long, value_name = "SECS")]
    pub max_duration_secs: Option<u64>,

    /// Per-attempt probe timeout
    #[arg(long, value_name = "MS")]
    pub probe_timeout_ms: Option<u64>,

    /// Request path for http probes
    #[arg(long, value_name = "PATH")]
    pub http_path: Option<String>,

    /// Shell command for exec probes (implies --kind exec)
    #[arg(long, value_name = "SHELL")]
    pub probe_cmd: Option<String>,
}

/// A validated config plus notices about environment variables that were skipped.
///
/// Logging is configured from the result, so notices are logged by the caller.
#[derive(Debug)]
pub struct Resolved {
    pub config: GateConfig,
    pub notices: Vec<String>,
}

impl Resolved {
    /// Emit the skipped-variable notices. Call after logging is initialized.
    pub fn log_notices(&self) {
        for notice in &self.notices {
            tracing::warn!("{}", notice);
        }
    }
}

impl ProbeArgs {
    /// Merge file, process environment and flags into a validated config.
    pub fn resolve(&self, host: &str) -> Result<Resolved, ConfigError> {
        self.resolve_with(host, |key| std::env::var(key).ok())
    }

    /// As [`resolve`](Self::resolve), reading the environment through `lookup`.
    pub fn resolve_with<F>(&self, host: &str, lookup: F) -> Result<Resolved, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = self
            .config
            .clone()
            .or_else(|| lookup(CONFIG_ENV).filter(|p| !p.is_empty()).map(PathBuf::from));
        let mut config = match path {
            Some(path) => load_config(&path)?,
            None => GateConfig::default(),
        };

        let notices = apply_env(&mut config, &lookup);
        self.apply(&mut config, host)?;

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(Resolved { config, notices })
    }

    fn apply(&self, config: &mut GateConfig, host: &str) -> Result<(), ConfigError> {
        let (host, host_port) = split_host_port(host)?;
        let target = &mut config.target;
        let retry = &mut config.retry;

        target.host = Some(host);
        if let Some(port) = self.port.or(host_port) {
            target.port = Some(port);
        }
        if let Some(name) = &self.name {
            target.name = Some(name.clone());
        }
        if let Some(path) = &self.http_path {
            target.http_path = path.clone();
        }
        if let Some(command) = &self.probe_cmd {
            target.command = Some(command.clone());
            target.kind = ProbeKind::Exec;
        }
        if let Some(kind) = self.kind {
            target.kind = kind;
        }

        if let Some(interval) = self.interval_ms {
            retry.interval_ms = interval;
        }
        if let Some(attempts) = self.max_attempts {
            retry.max_attempts = Some(attempts);
        }
        if let Some(secs) = self.max_duration_secs {
            retry.max_duration_secs = Some(secs);
        }
        if let Some(timeout) = self.probe_timeout_ms {
            retry.probe_timeout_ms = timeout;
        }

        Ok(())
    }
}

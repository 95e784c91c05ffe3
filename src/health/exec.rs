//! Shell command probe.
//!
//! Runs the configured command through `sh -c` with the target's connection
//! parameters exported as libpq variables, so `psql -c '\q'` or `pg_isready`
//! work without extra flags. stdout is discarded; stderr feeds the diagnostic.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::config::ProbeKind;
use crate::health::probe::{Probe, ProbeError, ProbeTarget};

/// Ready when the command exits 0.
pub struct ExecProbe {
    target: ProbeTarget,
}

impl ExecProbe {
    pub fn new(target: ProbeTarget) -> Self {
        Self { target }
    }

    fn command(&self) -> Result<Command, ProbeError> {
        let script = self
            .target
            .command()
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ProbeError::CommandFailed("no probe command configured".into()))?;

        let credentials = self.target.credentials();
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(script)
            .env("PGHOST", self.target.host())
            .env("PGPORT", self.target.port().to_string())
            .env("PGUSER", &credentials.user)
            .env("PGDATABASE", &credentials.database)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(password) = &credentials.password {
            cmd.env("PGPASSWORD", password);
        }
        Ok(cmd)
    }
}

#[async_trait]
impl Probe for ExecProbe {
    fn name(&self) -> &str {
        self.target.name()
    }

    fn kind(&self) -> ProbeKind {
        ProbeKind::Exec
    }

    async fn probe(&self) -> Result<(), ProbeError> {
        let output = self
            .command()?
            .output()
            .await
            .map_err(|e| ProbeError::CommandFailed(format!("failed to spawn: {e}")))?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let detail = stderr.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("").trim();
        let status = output
            .status
            .code()
            .map_or_else(|| "killed by signal".to_string(), |c| format!("exit status {c}"));

        Err(ProbeError::CommandFailed(if detail.is_empty() {
            status
        } else {
            format!("{status}: {detail}")
        }))
    }
}

//! Handing control to the wrapped command.
//!
//! # Strategies
//! - Replace: `exec` the command so it takes over this process (pid, stdio,
//!   signals), the same shape as a shell `exec "$@"`
//! - Spawn: run the command as a child with inherited stdio, forward
//!   termination and user signals, exit with its status
//!
//! The argument vector is passed through as OS strings, never re-joined or
//! re-split.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::process::ExitStatus;

use thiserror::Error;
use tokio::process::Command;

use crate::config::HandoffStrategy;

/// Exit code when the wrapped command cannot be launched.
pub const EXIT_LAUNCH_FAILURE: i32 = 1;

/// The wrapped command, exactly as received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentVector(Vec<OsString>);

impl ArgumentVector {
    pub fn new(argv: Vec<OsString>) -> Result<Self, LaunchError> {
        if argv.is_empty() {
            return Err(LaunchError::EmptyCommand);
        }
        Ok(Self(argv))
    }

    pub fn program(&self) -> &OsStr {
        &self.0[0]
    }

    pub fn args(&self) -> &[OsString] {
        &self.0[1..]
    }
}

impl fmt::Display for ArgumentVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arg) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// The wrapped command could not be started. Fatal, never retried.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("no command given")]
    EmptyCommand,

    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to wait for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl LaunchError {
    fn spawn(argv: &ArgumentVector, source: std::io::Error) -> Self {
        LaunchError::Spawn {
            program: argv.program().to_string_lossy().into_owned(),
            source,
        }
    }
}

/// Hand off to `argv`.
///
/// With [`HandoffStrategy::Replace`] this only returns on failure. With
/// [`HandoffStrategy::Spawn`] it returns the exit code to propagate.
pub async fn exec(argv: &ArgumentVector, strategy: HandoffStrategy) -> Result<i32, LaunchError> {
    tracing::debug!(command = %argv, strategy = ?strategy, "Handing off");
    match strategy {
        HandoffStrategy::Replace => replace(argv).await,
        HandoffStrategy::Spawn => spawn(argv).await,
    }
}

#[cfg(unix)]
async fn replace(argv: &ArgumentVector) -> Result<i32, LaunchError> {
    use std::os::unix::process::CommandExt;

    // `exec` only returns on failure.
    let err = std::process::Command::new(argv.program())
        .args(argv.args())
        .exec();
    Err(LaunchError::spawn(argv, err))
}

#[cfg(not(unix))]
async fn replace(argv: &ArgumentVector) -> Result<i32, LaunchError> {
    tracing::warn!("Process replacement is unavailable on this platform, spawning instead");
    spawn(argv).await
}

async fn spawn(argv: &ArgumentVector) -> Result<i32, LaunchError> {
    let mut child = Command::new(argv.program())
        .args(argv.args())
        .spawn()
        .map_err(|e| LaunchError::spawn(argv, e))?;

    let forwarders = match child.id() {
        Some(pid) => forward_signals(pid),
        None => Vec::new(),
    };

    let status = child.wait().await;
    for task in forwarders {
        task.abort();
    }

    let status = status.map_err(|source| LaunchError::Wait {
        program: argv.program().to_string_lossy().into_owned(),
        source,
    })?;
    Ok(exit_code(status))
}

#[cfg(unix)]
const FORWARDED_SIGNALS: [libc::c_int; 6] = [
    libc::SIGINT,
    libc::SIGTERM,
    libc::SIGHUP,
    libc::SIGQUIT,
    libc::SIGUSR1,
    libc::SIGUSR2,
];

/// Signals a terminal sends to its whole foreground process group.
#[cfg(unix)]
const TERMINAL_SIGNALS: [libc::c_int; 2] = [libc::SIGINT, libc::SIGQUIT];

/// True when we are the foreground process group of the terminal on stdin.
/// The child shares our group, so Ctrl-C and Ctrl-\ already reach it.
#[cfg(unix)]
fn in_terminal_foreground() -> bool {
    // SAFETY: both calls only query process state; tcgetpgrp returns -1 when stdin is not a tty.
    unsafe { libc::tcgetpgrp(libc::STDIN_FILENO) == libc::getpgrp() }
}

/// Signals to relay to the child. Terminal-generated ones are skipped when
/// the terminal already delivers them, so the child never sees them twice.
/// A `kill -INT` aimed at us alone is then not relayed.
#[cfg(unix)]
fn signals_to_forward(terminal_foreground: bool) -> Vec<libc::c_int> {
    FORWARDED_SIGNALS
        .iter()
        .copied()
        .filter(|signo| !(terminal_foreground && TERMINAL_SIGNALS.contains(signo)))
        .collect()
}

#[cfg(unix)]
fn forward_signals(pid: u32) -> Vec<tokio::task::JoinHandle<()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let terminal_foreground = in_terminal_foreground();
    if terminal_foreground {
        tracing::debug!("Terminal delivers SIGINT/SIGQUIT to the child directly");
    }

    signals_to_forward(terminal_foreground)
        .into_iter()
        .filter_map(|signo| {
            let mut stream = match signal(SignalKind::from_raw(signo)) {
                Ok(stream) => stream,
                Err(e) => {
                    tracing::warn!(signal = signo, error = %e, "Cannot forward signal");
                    return None;
                }
            };
            Some(tokio::spawn(async move {
                while stream.recv().await.is_some() {
                    tracing::debug!(signal = signo, pid, "Forwarding signal to child");
                    // SAFETY: kill(2) has no memory-safety preconditions; a stale pid yields ESRCH.
                    unsafe {
                        libc::kill(pid as libc::pid_t, signo);
                    }
                }
            }))
        })
        .collect()
}

#[cfg(not(unix))]
fn forward_signals(_pid: u32) -> Vec<tokio::task::JoinHandle<()>> {
    Vec::new()
}

/// Shell convention: the child's code, or 128 + signal number.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signo) = status.signal() {
            return 128 + signo;
        }
    }
    EXIT_LAUNCH_FAILURE
}

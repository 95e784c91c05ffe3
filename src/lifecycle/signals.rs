//! OS signal handling.
//!
//! # Responsibilities
//! - Register SIGTERM/SIGINT handlers for the wait phase
//! - Translate the first signal into a shutdown trigger
//!
//! Signals that arrive after handoff are handled by `handoff.rs`: replaced
//! processes get default dispositions back from `exec`, spawned children get
//! signals forwarded.

use tokio::task::JoinHandle;

use crate::lifecycle::Shutdown;

/// Spawn a task that triggers `shutdown` on the first termination signal.
#[cfg(unix)]
pub fn install(shutdown: Shutdown) -> std::io::Result<JoinHandle<()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    let mut interrupt = signal(SignalKind::interrupt())?;

    Ok(tokio::spawn(async move {
        let name = tokio::select! {
            _ = terminate.recv() => "SIGTERM",
            _ = interrupt.recv() => "SIGINT",
        };
        tracing::info!(signal = name, "Termination signal received");
        shutdown.trigger(format!("received {name}"));
    }))
}

/// Spawn a task that triggers `shutdown` on Ctrl-C.
#[cfg(not(unix))]
pub fn install(shutdown: Shutdown) -> std::io::Result<JoinHandle<()>> {
    Ok(tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!(signal = "ctrl-c", "Termination signal received");
            shutdown.trigger("received ctrl-c");
        }
    }))
}

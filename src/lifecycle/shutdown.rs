//! Shutdown coordination for the coordinator.

use std::sync::Arc;

use tokio::sync::watch;

/// Coordinator for cooperative cancellation.
///
/// Latches the first trigger so listeners that subscribe late still observe it.
#[derive(Clone)]
pub struct Shutdown {
    /// Shared sender; `Some(reason)` once triggered.
    tx: Arc<watch::Sender<Option<String>>>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> ShutdownListener {
        ShutdownListener {
            rx: self.tx.subscribe(),
        }
    }

    /// Trigger the shutdown signal. Only the first reason is kept.
    pub fn trigger(&self, reason: impl Into<String>) {
        let reason = reason.into();
        self.tx.send_if_modified(|state| {
            if state.is_none() {
                *state = Some(reason);
                true
            } else {
                false
            }
        });
    }

    pub fn is_triggered(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// Get the number of active listeners.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving half held by long-running loops.
#[derive(Clone)]
pub struct ShutdownListener {
    rx: watch::Receiver<Option<String>>,
}

impl ShutdownListener {
    /// Wait until shutdown is triggered and return the reason.
    ///
    /// Never resolves if the coordinator is dropped without triggering.
    pub async fn recv(&mut self) -> String {
        let reason = match self.rx.wait_for(Option::is_some).await {
            Ok(state) => (*state).clone(),
            Err(_) => None,
        };
        match reason {
            Some(reason) => reason,
            None => std::future::pending().await,
        }
    }
}

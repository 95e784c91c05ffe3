//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validated config → Probe + RetryPolicy → wait → handoff or exit code
//!
//! Shutdown (shutdown.rs):
//!     Trigger → every listener's wait ends with Aborted
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT during the wait → Trigger shutdown
//!
//! Handoff (handoff.rs):
//!     Ready → exec (replace) or spawn + forward signals + propagate exit code
//! ```
//!
//! # Design Decisions
//! - Launch failure is the only fatal error; probe errors never escape the wait
//! - Shutdown latches so a signal that races startup is not lost

pub mod handoff;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use handoff::{ArgumentVector, LaunchError};
pub use shutdown::{Shutdown, ShutdownListener};
pub use startup::{Coordinator, StartupError};

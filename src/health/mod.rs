//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Probes (probe.rs + one file per kind):
//!     tcp.rs      → TCP connect
//!     postgres.rs → startup handshake
//!     http.rs     → GET, 2xx
//!     exec.rs     → sh -c, exit 0
//!
//! Wait loop (active.rs):
//!     Probe under timeout
//!     → Ready: return
//!     → Failure: log, ask RetryState, sleep (interruptible), repeat
//!
//! Outcome (state.rs):
//!     Ready | TimedOut | Aborted(reason)
//! ```
//!
//! # Design Decisions
//! - Probe errors are data, not control flow; they never escape the loop
//! - One probe per attempt, no concurrent probing
//! - Probe output never reaches stdout

pub mod active;
pub mod exec;
pub mod http;
pub mod postgres;
pub mod probe;
pub mod state;
pub mod tcp;

pub use active::ReadinessGate;
pub use probe::{build_probe, Credentials, Probe, ProbeError, ProbeTarget};
pub use state::{ReadinessOutcome, ReadinessReport};

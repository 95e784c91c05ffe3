//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Wait loop, probes, handoff:
//!     → logging.rs (structured events on stderr)
//!
//! Consumers:
//!     → container log driver (docker logs, compose output)
//! ```
//!
//! # Design Decisions
//! - One warning per failed attempt, silence on success at the default level
//! - JSON format for log shippers, compact for humans
//! - Every wait runs inside a span carrying a run ID and the dependency name

pub mod logging;

pub use logging::init_logging;

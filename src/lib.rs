//! Dependency readiness coordinator.
//!
//! Blocks a service's startup until a dependency (usually Postgres) accepts
//! connections, then hands the process over to the service's real command.

pub mod cli;
pub mod config;
pub mod health;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::GateConfig;
pub use health::{Probe, ProbeTarget, ReadinessGate, ReadinessOutcome};
pub use lifecycle::{ArgumentVector, Coordinator, Shutdown};
pub use resilience::RetryPolicy;

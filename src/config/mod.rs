//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs apply_env (DATABASE_URL, POSTGRES_*)
//!     → CLI flags (main.rs)
//!     → validation.rs (semantic checks)
//!     → GateConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once merged; each run starts fresh
//! - All fields have defaults to allow a config-less invocation
//! - Credentials come from the environment or the file, never from argv

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{apply_env, load_config, split_host_port, ConfigError, CONFIG_ENV};
pub use schema::{
    BackoffKind, GateConfig, HandoffConfig, HandoffStrategy, LogFormat, ObservabilityConfig,
    ProbeKind, RetryConfig, TargetConfig,
};
pub use validation::{validate_config, ValidationError};

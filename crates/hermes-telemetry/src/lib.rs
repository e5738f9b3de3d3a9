//! Logging for Hermes services.
//!
//! Every Hermes crate logs through [`tracing`]. This crate installs the
//! subscriber: an [`EnvFilter`](tracing_subscriber::EnvFilter) and a JSON or
//! pretty formatter, chosen from [`hermes_config::LoggingConfig`].
//!
//! ```rust,ignore
//! use hermes_telemetry::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::from(&config.logging))?;
//! tracing::info!(addr = %addr, "Server listening");
//! ```

#![warn(missing_docs)]

mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, fields, init_logging, LogConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

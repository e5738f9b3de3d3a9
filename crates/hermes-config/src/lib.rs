//! Typed configuration for Hermes.
//!
//! Configuration is layered: built-in defaults, then a TOML or JSON file,
//! then environment variables. Unknown fields are rejected.
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! http_addr = "0.0.0.0:8080"
//! shutdown_timeout_secs = 30
//! request_timeout_ms = 30000
//!
//! [dispatch]
//! input_buffer_size = 10240
//! max_body_size = 10485760
//! default_blocking = false
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```
//!
//! # Environment Variable Overrides
//!
//! Every value can be overridden with `PREFIX__SECTION__KEY`, e.g.
//! `HERMES__DISPATCH__MAX_BODY_SIZE=1048576` or `HERMES__LOGGING__FORMAT=pretty`.

#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::HermesConfig;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{DispatchConfig, LogFormat, LoggingConfig, ServerConfig};

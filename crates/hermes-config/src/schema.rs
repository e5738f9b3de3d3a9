//! Configuration sections.

use hermes_core::DispatchSettings;
use serde::{Deserialize, Serialize};

/// HTTP listener settings.
///
/// # Example
///
/// ```
/// use hermes_config::ServerConfig;
///
/// let config = ServerConfig {
///     http_addr: "127.0.0.1:3000".to_string(),
///     ..Default::default()
/// };
/// assert_eq!(config.shutdown_timeout_secs, 30);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind address, e.g. `0.0.0.0:8080`.
    #[serde(default = "default_http_addr")]
    pub http_addr: String,

    /// How long in-flight connections get to finish on shutdown.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Time a request may take before it is answered with 504.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            request_timeout_ms: default_request_timeout(),
        }
    }
}

fn default_http_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_shutdown_timeout() -> u64 {
    30
}

fn default_request_timeout() -> u64 {
    30_000
}

/// Request body and execution settings of the engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Bodies up to this many bytes are read without leaving the event loop.
    #[serde(default = "default_input_buffer_size")]
    pub input_buffer_size: usize,

    /// Bodies over this many bytes are rejected with 413.
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,

    /// Run resource methods on the blocking executor unless they say
    /// otherwise.
    #[serde(default)]
    pub default_blocking: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            input_buffer_size: default_input_buffer_size(),
            max_body_size: default_max_body_size(),
            default_blocking: false,
        }
    }
}

impl DispatchConfig {
    /// The engine settings these values describe.
    pub fn to_settings(&self) -> DispatchSettings {
        DispatchSettings {
            input_buffer_size: self.input_buffer_size,
            max_body_size: self.max_body_size,
            default_blocking: self.default_blocking,
        }
    }
}

fn default_input_buffer_size() -> usize {
    10 * 1024
}

fn default_max_body_size() -> usize {
    10 * 1024 * 1024
}

/// Log format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Human-readable output for local development.
    Pretty,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info` or `hermes_core=debug,info`.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include ANSI colors (pretty format only).
    #[serde(default)]
    pub ansi_enabled: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            ansi_enabled: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_defaults_match_engine() {
        assert_eq!(DispatchConfig::default().to_settings(), DispatchSettings::default());
    }

    #[test]
    fn test_server_section_rejects_unknown_fields() {
        let result: Result<ServerConfig, _> = toml::from_str("port = 80");
        assert!(result.is_err());
    }

    #[test]
    fn test_log_format_lowercase() {
        let config: LoggingConfig = toml::from_str(r#"format = "pretty""#).unwrap();
        assert_eq!(config.format, LogFormat::Pretty);
        assert_eq!(config.level, "info");
    }
}

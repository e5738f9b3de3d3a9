//! The root configuration type.

use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, DispatchConfig, LogFormat, LoggingConfig, ServerConfig};

/// Complete Hermes configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to layer a file and environment
/// overrides on top of the defaults.
///
/// # Example
///
/// ```
/// use hermes_config::HermesConfig;
///
/// let config = HermesConfig::default();
/// assert_eq!(config.server.http_addr, "0.0.0.0:8080");
/// assert_eq!(config.dispatch.input_buffer_size, 10 * 1024);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct HermesConfig {
    /// Listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Engine settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl HermesConfig {
    /// Checks values serde cannot check.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - `server.http_addr` is not a socket address
    /// - `server.request_timeout_ms` is zero
    /// - either body size is zero
    /// - `dispatch.input_buffer_size` exceeds `dispatch.max_body_size`
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.socket_addr()?;

        if self.server.request_timeout_ms == 0 {
            return Err(ConfigError::invalid_value(
                "server.request_timeout_ms",
                "must be greater than zero",
            ));
        }
        if self.dispatch.input_buffer_size == 0 {
            return Err(ConfigError::invalid_value(
                "dispatch.input_buffer_size",
                "must be greater than zero",
            ));
        }
        if self.dispatch.max_body_size == 0 {
            return Err(ConfigError::invalid_value(
                "dispatch.max_body_size",
                "must be greater than zero",
            ));
        }
        if self.dispatch.input_buffer_size > self.dispatch.max_body_size {
            return Err(ConfigError::invalid_value(
                "dispatch.input_buffer_size",
                format!(
                    "{} exceeds dispatch.max_body_size ({})",
                    self.dispatch.input_buffer_size, self.dispatch.max_body_size
                ),
            ));
        }
        Ok(())
    }

    /// The parsed bind address.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server.http_addr.parse().map_err(|_| {
            ConfigError::invalid_value(
                "server.http_addr",
                format!("invalid socket address: {}", self.server.http_addr),
            )
        })
    }

    /// Shutdown grace period.
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout_secs)
    }

    /// Per-request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.server.request_timeout_ms)
    }

    /// A preset for local work: pretty colored debug logs.
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.server.http_addr = "127.0.0.1:8080".to_string();
        config.logging.level = "debug".to_string();
        config.logging.format = LogFormat::Pretty;
        config.logging.ansi_enabled = true;
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(HermesConfig::default().validate().is_ok());
        assert!(HermesConfig::development().validate().is_ok());
    }

    #[test]
    fn test_invalid_address() {
        let mut config = HermesConfig::default();
        config.server.http_addr = "localhost".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "server.http_addr"
        ));
    }

    #[test]
    fn test_zero_sizes_rejected() {
        let mut config = HermesConfig::default();
        config.dispatch.input_buffer_size = 0;
        assert!(config.validate().is_err());

        let mut config = HermesConfig::default();
        config.dispatch.max_body_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_buffer_larger_than_max_rejected() {
        let mut config = HermesConfig::default();
        config.dispatch.input_buffer_size = 2048;
        config.dispatch.max_body_size = 1024;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "dispatch.input_buffer_size"
        ));
    }

    #[test]
    fn test_durations() {
        let config = HermesConfig::default();
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(30));
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }
}

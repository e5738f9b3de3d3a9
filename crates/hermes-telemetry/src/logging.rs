//! Subscriber installation and shared field names.

use hermes_config::{LogFormat, LoggingConfig};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::{TelemetryError, TelemetryResult};

/// Logging setup.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,

    /// Emit JSON lines instead of the pretty format.
    pub json_format: bool,

    /// Use ANSI colors (pretty format only).
    pub ansi: bool,

    /// Log span close events with their busy/idle times.
    pub span_events: bool,

    /// Include thread IDs, useful to see offloads.
    pub thread_ids: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: true,
            ansi: false,
            span_events: false,
            thread_ids: false,
        }
    }
}

impl From<&LoggingConfig> for LogConfig {
    fn from(config: &LoggingConfig) -> Self {
        Self {
            level: config.level.clone(),
            json_format: config.format == LogFormat::Json,
            ansi: config.ansi_enabled,
            ..Self::default()
        }
    }
}

impl LogConfig {
    /// Pretty debug output with thread IDs and span timings.
    #[must_use]
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            json_format: false,
            ansi: true,
            span_events: true,
            thread_ids: true,
        }
    }
}

/// Installs the global subscriber.
///
/// `RUST_LOG`, when set, takes precedence over `config.level`.
///
/// # Errors
///
/// Fails if the directive is invalid or a subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => create_env_filter(&config.level)?,
    };

    let span_events = if config.span_events {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    if config.json_format {
        let layer = tracing_subscriber::fmt::layer()
            .json()
            .with_span_events(span_events)
            .with_thread_ids(config.thread_ids)
            .with_current_span(true)
            .with_filter(filter);
        tracing_subscriber::registry()
            .with(layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))
    } else {
        let layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_ansi(config.ansi)
            .with_span_events(span_events)
            .with_thread_ids(config.thread_ids)
            .with_filter(filter);
        tracing_subscriber::registry()
            .with(layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))
    }
}

/// Parses a filter directive such as `info` or `hermes_core=trace,info`.
pub fn create_env_filter(directive: &str) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(directive).map_err(|e| TelemetryError::InvalidFilter {
        directive: directive.to_string(),
        reason: e.to_string(),
    })
}

/// Field names shared by the server and engine log events.
pub mod fields {
    /// Request ID.
    pub const REQUEST_ID: &str = "request_id";

    /// HTTP method.
    pub const HTTP_METHOD: &str = "http.method";

    /// Request path.
    pub const HTTP_PATH: &str = "http.path";

    /// Response status code.
    pub const HTTP_STATUS: &str = "http.status_code";

    /// Elapsed time in milliseconds.
    pub const DURATION_MS: &str = "duration_ms";

    /// Peer address.
    pub const REMOTE_ADDR: &str = "remote_addr";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_logging_config() {
        let logging = LoggingConfig {
            level: "hermes_core=trace".to_string(),
            format: LogFormat::Pretty,
            ansi_enabled: true,
        };
        let config = LogConfig::from(&logging);
        assert_eq!(config.level, "hermes_core=trace");
        assert!(!config.json_format);
        assert!(config.ansi);
    }

    #[test]
    fn test_default_is_json() {
        let config = LogConfig::from(&LoggingConfig::default());
        assert!(config.json_format);
        assert_eq!(config.level, "info");
    }

    #[test]
    fn test_create_env_filter() {
        assert!(create_env_filter("info,hermes_handlers=debug").is_ok());
        assert!(matches!(
            create_env_filter("hermes_core=loud"),
            Err(TelemetryError::InvalidFilter { .. })
        ));
    }
}

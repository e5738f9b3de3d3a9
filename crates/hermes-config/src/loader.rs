//! Layered configuration loading.

use std::env;
use std::fs;
use std::path::Path;

use crate::{ConfigError, HermesConfig, LogFormat};

/// Builds a [`HermesConfig`] from layers, later layers winning:
/// 1. built-in defaults
/// 2. a TOML or JSON file
/// 3. environment variables named `PREFIX__SECTION__KEY`
///
/// # Example
///
/// ```no_run
/// use hermes_config::ConfigLoader;
///
/// # fn main() -> Result<(), hermes_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_dotenv()?
///     .with_optional_file("hermes.toml")?
///     .with_env_prefix("HERMES")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config: HermesConfig,
    env_prefix: Option<String>,
}

impl ConfigLoader {
    /// Starts from the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from [`HermesConfig::development`].
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = HermesConfig::development();
        self
    }

    /// Loads a file; the format follows the extension (`.toml` or `.json`).
    ///
    /// Sections and fields the file leaves out keep their defaults.
    /// Unknown fields are errors.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;
        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        self.config = parse(&content, &format)?;
        Ok(self)
    }

    /// Like [`with_file`](Self::with_file), but a missing file is skipped.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Loads configuration text in `format` (`"toml"` or `"json"`).
    ///
    /// ```
    /// use hermes_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string("[dispatch]\ninput_buffer_size = 1024\nmax_body_size = 4096", "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.dispatch.input_buffer_size, 1024);
    /// assert_eq!(config.dispatch.max_body_size, 4096);
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.config = parse(content, &format.to_lowercase())?;
        Ok(self)
    }

    /// Reads overrides from variables starting with `prefix` (uppercased).
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Loads a `.env` file from the working directory into the process
    /// environment, if there is one.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => Ok(self),
            Err(error) if error.not_found() => Ok(self),
            Err(error) => Err(error.into()),
        }
    }

    /// Applies environment overrides and validates.
    pub fn load(mut self) -> Result<HermesConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            let vars: Vec<(String, String)> = env::vars()
                .filter(|(k, _)| k.starts_with(&prefix))
                .collect();
            for (key, value) in vars {
                self.apply_env_var(&key, &value, &prefix)?;
            }
        }

        self.config.validate()?;
        Ok(self.config)
    }

    /// Returns the configuration as is, without overrides or validation.
    #[must_use]
    pub fn load_unvalidated(self) -> HermesConfig {
        self.config
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let Some(rest) = key.strip_prefix(prefix).and_then(|k| k.strip_prefix("__")) else {
            return Ok(());
        };
        let parts: Vec<&str> = rest.split("__").collect();

        let config = &mut self.config;
        match parts.as_slice() {
            ["SERVER", "HTTP_ADDR"] => config.server.http_addr = value.to_string(),
            ["SERVER", "SHUTDOWN_TIMEOUT_SECS"] => {
                config.server.shutdown_timeout_secs = parse_number(key, value)?;
            }
            ["SERVER", "REQUEST_TIMEOUT_MS"] => {
                config.server.request_timeout_ms = parse_number(key, value)?;
            }

            ["DISPATCH", "INPUT_BUFFER_SIZE"] => {
                config.dispatch.input_buffer_size = parse_number(key, value)?;
            }
            ["DISPATCH", "MAX_BODY_SIZE"] => {
                config.dispatch.max_body_size = parse_number(key, value)?;
            }
            ["DISPATCH", "DEFAULT_BLOCKING"] => {
                config.dispatch.default_blocking = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?;
            }

            ["LOGGING", "LEVEL"] => config.logging.level = value.to_string(),
            ["LOGGING", "FORMAT"] => {
                config.logging.format = match value.to_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'json' or 'pretty'",
                        ))
                    }
                };
            }
            ["LOGGING", "ANSI_ENABLED"] => {
                config.logging.ansi_enabled = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?;
            }

            // other tools may share the prefix
            _ => {}
        }
        Ok(())
    }
}

fn parse(content: &str, format: &str) -> Result<HermesConfig, ConfigError> {
    match format {
        "toml" => Ok(toml::from_str(content)?),
        "json" => Ok(serde_json::from_str(content)?),
        other => Err(ConfigError::UnsupportedFormat(other.to_string())),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loader_defaults() {
        let config = ConfigLoader::new().load().unwrap();
        assert_eq!(config, HermesConfig::default());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ConfigLoader::new()
            .with_string("[server]\nhttp_addr = \"127.0.0.1:3000\"", "toml")
            .unwrap()
            .load()
            .unwrap();
        assert_eq!(config.server.http_addr, "127.0.0.1:3000");
        assert_eq!(config.server.shutdown_timeout_secs, 30);
        assert_eq!(config.dispatch.max_body_size, 10 * 1024 * 1024);
    }

    #[test]
    fn test_json_string() {
        let config = ConfigLoader::new()
            .with_string(r#"{"dispatch": {"default_blocking": true}}"#, "JSON")
            .unwrap()
            .load()
            .unwrap();
        assert!(config.dispatch.default_blocking);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = ConfigLoader::new().with_string("[dispatch]\nbuffer = 1", "toml");
        assert!(matches!(result, Err(ConfigError::TomlError(_))));
    }

    #[test]
    fn test_unsupported_format() {
        let result = ConfigLoader::new().with_string("a: 1", "yaml");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(f)) if f == "yaml"));
    }

    #[test]
    fn test_missing_file() {
        let result = ConfigLoader::new().with_file("/nonexistent/hermes.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
        assert!(ConfigLoader::new()
            .with_optional_file("/nonexistent/hermes.toml")
            .is_ok());
    }

    #[test]
    fn test_validation_runs_on_load() {
        let result = ConfigLoader::new()
            .with_string("[dispatch]\ninput_buffer_size = 100\nmax_body_size = 10", "toml")
            .unwrap()
            .load();
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_small_body_limit_needs_small_buffer() {
        let alone = ConfigLoader::new()
            .with_string("[dispatch]\nmax_body_size = 4096", "toml")
            .unwrap()
            .load();
        assert!(matches!(
            alone,
            Err(ConfigError::InvalidValue { field, .. }) if field == "dispatch.input_buffer_size"
        ));

        let config = ConfigLoader::new()
            .with_string("[dispatch]\ninput_buffer_size = 1024\nmax_body_size = 4096", "toml")
            .unwrap()
            .load()
            .unwrap();
        assert_eq!(config.dispatch.input_buffer_size, 1024);
        assert_eq!(config.dispatch.max_body_size, 4096);
    }

    // Overrides are applied directly instead of through the process
    // environment, which tests running in parallel would share.
    #[test]
    fn test_env_overrides() {
        let mut loader = ConfigLoader::new();
        loader
            .apply_env_var("HERMES__SERVER__HTTP_ADDR", "127.0.0.1:9000", "HERMES")
            .unwrap();
        loader
            .apply_env_var("HERMES__DISPATCH__MAX_BODY_SIZE", " 2048 ", "HERMES")
            .unwrap();
        loader
            .apply_env_var("HERMES__DISPATCH__DEFAULT_BLOCKING", "yes", "HERMES")
            .unwrap();
        loader
            .apply_env_var("HERMES__LOGGING__FORMAT", "Pretty", "HERMES")
            .unwrap();

        let config = loader.load_unvalidated();
        assert_eq!(config.server.http_addr, "127.0.0.1:9000");
        assert_eq!(config.dispatch.max_body_size, 2048);
        assert!(config.dispatch.default_blocking);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_env_override_errors() {
        let mut loader = ConfigLoader::new();
        assert!(matches!(
            loader.apply_env_var("HERMES__SERVER__REQUEST_TIMEOUT_MS", "soon", "HERMES"),
            Err(ConfigError::EnvParseError { .. })
        ));
        assert!(loader
            .apply_env_var("HERMES__LOGGING__FORMAT", "xml", "HERMES")
            .is_err());
        assert!(loader
            .apply_env_var("HERMES__UNRELATED__KEY", "x", "HERMES")
            .is_ok());
        assert!(loader.apply_env_var("HERMESX", "x", "HERMES").is_ok());
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("ON"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}

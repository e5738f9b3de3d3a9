//! Wiring an application to its configuration.

use hermes_config::HermesConfig;
use hermes_handlers::{ApplicationBuilder, DeploymentError};
use hermes_server::{Lifecycle, Server, ServerError};
use hermes_telemetry::{init_logging, LogConfig, TelemetryError};
use thiserror::Error;

/// Failures while starting or running an application.
#[derive(Error, Debug)]
pub enum HermesError {
    /// Logging could not be installed.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    /// The resources do not form a valid deployment.
    #[error(transparent)]
    Deployment(#[from] DeploymentError),

    /// The server failed.
    #[error(transparent)]
    Server(#[from] ServerError),
}

/// Builds `application` with the dispatch settings from `config` and a
/// server with its address and timeouts.
///
/// Must be called inside a tokio runtime so dispatch runs on its executors.
pub fn prepare(
    application: ApplicationBuilder,
    config: &HermesConfig,
    lifecycle: Lifecycle,
) -> Result<Server, HermesError> {
    let dispatcher = application.settings(config.dispatch.to_settings()).build()?;
    Ok(Server::builder(dispatcher)
        .config(&config.server)
        .lifecycle(lifecycle)
        .build())
}

/// Installs logging, then serves `application` until SIGTERM or SIGINT.
pub async fn run(application: ApplicationBuilder, config: &HermesConfig) -> Result<(), HermesError> {
    init_logging(&LogConfig::from(&config.logging))?;
    let server = prepare(application, config, Lifecycle::new())?;
    tracing::info!(
        addr = %config.server.http_addr,
        max_body_size = config.dispatch.max_body_size,
        "Starting Hermes"
    );
    server.run().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermes_handlers::{ResourceClass, ResourceMethod};
    use hermes_core::Outcome;

    #[tokio::test]
    async fn test_prepare_applies_dispatch_settings() {
        let mut config = HermesConfig::default();
        config.dispatch.max_body_size = 128;
        let application = ApplicationBuilder::new().resource(
            ResourceClass::new("Ping", "/ping").method(ResourceMethod::get(|_| Ok(Outcome::ok("pong")))),
        );

        let server = prepare(application, &config, Lifecycle::new()).unwrap();
        assert_eq!(server.dispatcher().deployment().settings().max_body_size, 128);
    }

    #[tokio::test]
    async fn test_prepare_reports_bad_template() {
        let application = ApplicationBuilder::new().resource(
            ResourceClass::new("Broken", "/broken/{").method(ResourceMethod::get(|_| Ok(Outcome::empty()))),
        );
        let err = prepare(application, &HermesConfig::default(), Lifecycle::new()).unwrap_err();
        assert!(matches!(err, HermesError::Deployment(_)));
    }
}

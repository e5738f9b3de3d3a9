//! Deployment-wide collaborators shared by every request.

use std::future::Future;

use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;

use crate::error::RestError;
use crate::exception::ExceptionMappers;
use crate::executor::Executors;
use crate::lifecycle::ShutdownHooks;
use crate::locator::LocatorRegistry;
use crate::serialisers::Serialisers;

/// Per-request limits and defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchSettings {
    /// Bodies up to this size are accumulated on the event loop; larger ones
    /// switch to a blocking stream.
    pub input_buffer_size: usize,
    /// Bodies over this size are rejected with 413.
    pub max_body_size: usize,
    /// Whether methods without an explicit choice run on the blocking
    /// executor.
    pub default_blocking: bool,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            input_buffer_size: 10 * 1024,
            max_body_size: 10 * 1024 * 1024,
            default_blocking: false,
        }
    }
}

/// Everything a handler may consult that outlives a request.
#[derive(Debug)]
pub struct Deployment {
    serialisers: Serialisers,
    exception_mappers: ExceptionMappers,
    locators: LocatorRegistry,
    executors: Executors,
    runtime: Option<Handle>,
    settings: DispatchSettings,
    shutdown: ShutdownHooks,
}

impl Deployment {
    /// Starts a deployment with default codecs and no mappers.
    pub fn builder() -> DeploymentBuilder {
        DeploymentBuilder::default()
    }

    /// Entity readers and writers.
    pub fn serialisers(&self) -> &Serialisers {
        &self.serialisers
    }

    /// Exception mappers.
    pub fn exception_mappers(&self) -> &ExceptionMappers {
        &self.exception_mappers
    }

    /// Sub-resource route tables.
    pub fn locators(&self) -> &LocatorRegistry {
        &self.locators
    }

    /// The event-loop and blocking executors.
    pub fn executors(&self) -> &Executors {
        &self.executors
    }

    /// Limits and defaults.
    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    /// Hooks run by [`Deployment::close`].
    pub fn shutdown_hooks(&self) -> &ShutdownHooks {
        &self.shutdown
    }

    /// Spawns an async task on the deployment's runtime, or the ambient one.
    pub fn spawn<F>(&self, future: F) -> Result<(), RestError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = match &self.runtime {
            Some(handle) => handle.clone(),
            None => Handle::try_current().map_err(|e| {
                RestError::internal_with_source("no async runtime to spawn on", e)
            })?,
        };
        drop(handle.spawn(future));
        Ok(())
    }

    /// Runs the shutdown hooks, newest first.
    pub fn close(&self) {
        let closed = self.shutdown.run_all();
        tracing::info!(hooks = closed, "Deployment closed");
    }
}

/// Builder for [`Deployment`].
#[derive(Debug)]
pub struct DeploymentBuilder {
    serialisers: Serialisers,
    exception_mappers: ExceptionMappers,
    locators: LocatorRegistry,
    executors: Option<Executors>,
    runtime: Option<Handle>,
    settings: DispatchSettings,
    shutdown: ShutdownHooks,
}

impl Default for DeploymentBuilder {
    fn default() -> Self {
        Self {
            serialisers: Serialisers::with_defaults(),
            exception_mappers: ExceptionMappers::new(),
            locators: LocatorRegistry::new(),
            executors: None,
            runtime: None,
            settings: DispatchSettings::default(),
            shutdown: ShutdownHooks::new(),
        }
    }
}

impl DeploymentBuilder {
    /// Replaces the codec registry.
    #[must_use]
    pub fn serialisers(mut self, serialisers: Serialisers) -> Self {
        self.serialisers = serialisers;
        self
    }

    /// Mutable access to the codec registry.
    pub fn serialisers_mut(&mut self) -> &mut Serialisers {
        &mut self.serialisers
    }

    /// Replaces the exception mappers.
    #[must_use]
    pub fn exception_mappers(mut self, mappers: ExceptionMappers) -> Self {
        self.exception_mappers = mappers;
        self
    }

    /// Mutable access to the exception mappers.
    pub fn exception_mappers_mut(&mut self) -> &mut ExceptionMappers {
        &mut self.exception_mappers
    }

    /// Mutable access to the sub-resource registry.
    pub fn locators_mut(&mut self) -> &mut LocatorRegistry {
        &mut self.locators
    }

    /// Uses the given executors.
    #[must_use]
    pub fn executors(mut self, executors: Executors) -> Self {
        self.executors = Some(executors);
        self
    }

    /// Spawns body reads and async results on `handle`.
    #[must_use]
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Sets limits and defaults.
    #[must_use]
    pub fn settings(mut self, settings: DispatchSettings) -> Self {
        self.settings = settings;
        self
    }

    /// The current limits and defaults.
    pub fn current_settings(&self) -> &DispatchSettings {
        &self.settings
    }

    /// Hooks that will run when the deployment closes.
    pub fn shutdown_hooks(&self) -> &ShutdownHooks {
        &self.shutdown
    }

    /// Finishes the deployment.
    ///
    /// Without explicit executors, the runtime (given or ambient) backs both;
    /// outside any runtime everything runs inline.
    pub fn build(self) -> Deployment {
        let runtime = self.runtime.or_else(|| Handle::try_current().ok());
        let executors = self.executors.unwrap_or_else(|| match &runtime {
            Some(handle) => Executors::tokio(handle),
            None => Executors::inline(),
        });
        Deployment {
            serialisers: self.serialisers,
            exception_mappers: self.exception_mappers,
            locators: self.locators,
            executors,
            runtime,
            settings: self.settings,
            shutdown: self.shutdown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = DispatchSettings::default();
        assert_eq!(settings.input_buffer_size, 10 * 1024);
        assert_eq!(settings.max_body_size, 10 * 1024 * 1024);
        assert!(!settings.default_blocking);
    }

    #[test]
    fn test_build_outside_runtime_is_inline() {
        let deployment = Deployment::builder().build();
        assert!(deployment.executors().event_loop().is_event_loop());
        assert!(deployment.spawn(async {}).is_err());
    }

    #[tokio::test]
    async fn test_build_inside_runtime_uses_it() {
        let deployment = Deployment::builder().build();
        let (tx, rx) = tokio::sync::oneshot::channel();
        deployment
            .spawn(async move {
                let _ = tx.send(1);
            })
            .unwrap();
        assert_eq!(rx.await.unwrap(), 1);
    }

    #[test]
    fn test_close_runs_hooks() {
        let deployment = Deployment::builder().build();
        let (tx, rx) = std::sync::mpsc::channel();
        deployment
            .shutdown_hooks()
            .register("signal", move || tx.send(()).unwrap());
        deployment.close();
        assert!(rx.try_recv().is_ok());
    }
}

//! Startup and shutdown hooks.
//!
//! Startup hooks run in registration order before the listener accepts
//! connections; the first failure aborts startup. Shutdown hooks run in
//! reverse order after connections drained, and all of them run even if
//! some fail.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use thiserror::Error;

/// A failed lifecycle hook.
#[derive(Error, Debug)]
pub enum LifecycleError {
    /// A startup hook failed.
    #[error("Startup hook failed: {0}")]
    StartupFailed(String),

    /// One or more shutdown hooks failed.
    #[error("Shutdown hook failed: {0}")]
    ShutdownFailed(String),

    /// Error reported by a hook.
    #[error("{message}")]
    Hook {
        /// What went wrong.
        message: String,
        /// Underlying error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl LifecycleError {
    /// A hook error with a message only.
    pub fn new(message: impl Into<String>) -> Self {
        Self::Hook {
            message: message.into(),
            source: None,
        }
    }

    /// A hook error wrapping `source`.
    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Hook {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Result of a lifecycle hook.
pub type LifecycleResult<T = ()> = Result<T, LifecycleError>;

type Hook = Arc<dyn Fn() -> BoxFuture<'static, LifecycleResult> + Send + Sync>;

/// Hooks run around the server's lifetime.
///
/// ```rust
/// use hermes_server::Lifecycle;
///
/// let lifecycle = Lifecycle::new()
///     .on_startup("warm caches", || async { Ok(()) })
///     .on_shutdown("flush audit log", || async { Ok(()) });
/// assert_eq!(lifecycle.shutdown_hook_count(), 1);
/// ```
#[derive(Default)]
#[must_use]
pub struct Lifecycle {
    startup: Vec<(String, Hook)>,
    shutdown: Vec<(String, Hook)>,
}

impl fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifecycle")
            .field("startup", &self.startup.iter().map(|(n, _)| n).collect::<Vec<_>>())
            .field("shutdown", &self.shutdown.iter().map(|(n, _)| n).collect::<Vec<_>>())
            .finish()
    }
}

impl Lifecycle {
    /// No hooks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a startup hook.
    pub fn on_startup<F, Fut>(mut self, name: impl Into<String>, hook: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = LifecycleResult> + Send + 'static,
    {
        self.startup.push((name.into(), Arc::new(move || hook().boxed())));
        self
    }

    /// Adds a shutdown hook.
    pub fn on_shutdown<F, Fut>(mut self, name: impl Into<String>, hook: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = LifecycleResult> + Send + 'static,
    {
        self.shutdown.push((name.into(), Arc::new(move || hook().boxed())));
        self
    }

    /// Number of startup hooks.
    pub fn startup_hook_count(&self) -> usize {
        self.startup.len()
    }

    /// Number of shutdown hooks.
    pub fn shutdown_hook_count(&self) -> usize {
        self.shutdown.len()
    }

    /// Runs startup hooks in order, stopping at the first failure.
    pub async fn run_startup(&self) -> LifecycleResult {
        for (name, hook) in &self.startup {
            tracing::debug!(hook = %name, "Running startup hook");
            if let Err(e) = hook().await {
                tracing::error!(hook = %name, error = %e, "Startup hook failed");
                return Err(LifecycleError::StartupFailed(format!("{name}: {e}")));
            }
        }
        Ok(())
    }

    /// Runs every shutdown hook, newest first.
    pub async fn run_shutdown(&self) -> LifecycleResult {
        let mut errors = Vec::new();
        for (name, hook) in self.shutdown.iter().rev() {
            tracing::debug!(hook = %name, "Running shutdown hook");
            if let Err(e) = hook().await {
                tracing::error!(hook = %name, error = %e, "Shutdown hook failed");
                errors.push(format!("{name}: {e}"));
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(LifecycleError::ShutdownFailed(errors.join("; ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    type Order = Arc<Mutex<Vec<&'static str>>>;

    fn recording(order: &Order, name: &'static str) -> impl Fn() -> BoxFuture<'static, LifecycleResult> {
        let order = Arc::clone(order);
        move || {
            order.lock().unwrap().push(name);
            async { Ok(()) }.boxed()
        }
    }

    #[tokio::test]
    async fn test_empty_lifecycle() {
        let lifecycle = Lifecycle::new();
        assert!(lifecycle.run_startup().await.is_ok());
        assert!(lifecycle.run_shutdown().await.is_ok());
    }

    #[tokio::test]
    async fn test_hook_order() {
        let order = Order::default();
        let lifecycle = Lifecycle::new()
            .on_startup("a", recording(&order, "start a"))
            .on_startup("b", recording(&order, "start b"))
            .on_shutdown("a", recording(&order, "stop a"))
            .on_shutdown("b", recording(&order, "stop b"));

        lifecycle.run_startup().await.unwrap();
        lifecycle.run_shutdown().await.unwrap();
        assert_eq!(*order.lock().unwrap(), ["start a", "start b", "stop b", "stop a"]);
    }

    #[tokio::test]
    async fn test_startup_stops_at_failure() {
        let order = Order::default();
        let lifecycle = Lifecycle::new()
            .on_startup("broken", || async { Err(LifecycleError::new("no database")) })
            .on_startup("after", recording(&order, "after"));

        let err = lifecycle.run_startup().await.unwrap_err();
        assert!(err.to_string().contains("no database"));
        assert!(order.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_runs_all_hooks() {
        let order = Order::default();
        let lifecycle = Lifecycle::new()
            .on_shutdown("first", recording(&order, "first"))
            .on_shutdown("broken", || async { Err(LifecycleError::new("stuck")) });

        let err = lifecycle.run_shutdown().await.unwrap_err();
        assert!(matches!(err, LifecycleError::ShutdownFailed(ref m) if m.contains("broken")));
        assert_eq!(*order.lock().unwrap(), ["first"]);
    }
}

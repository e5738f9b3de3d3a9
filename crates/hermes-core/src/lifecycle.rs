//! Shutdown hooks for deployment-scoped resources.
//!
//! Filters, singletons and anything else created once per deployment
//! register a hook here; [`ShutdownHooks::run_all`] runs them in reverse
//! registration order when the application stops.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use parking_lot::Mutex;

type Hook = Box<dyn FnOnce() + Send>;

/// Hooks run once, last registered first.
#[derive(Default)]
pub struct ShutdownHooks {
    hooks: Mutex<Vec<(String, Hook)>>,
}

impl fmt::Debug for ShutdownHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownHooks")
            .field("pending", &self.len())
            .finish()
    }
}

impl ShutdownHooks {
    /// No hooks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a hook under a diagnostic name.
    pub fn register(&self, name: impl Into<String>, hook: impl FnOnce() + Send + 'static) {
        self.hooks.lock().push((name.into(), Box::new(hook)));
    }

    /// Number of hooks not yet run.
    pub fn len(&self) -> usize {
        self.hooks.lock().len()
    }

    /// Returns true if no hook is pending.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs every pending hook, newest first. A panicking hook is logged and
    /// does not stop the others. Returns how many hooks ran.
    pub fn run_all(&self) -> usize {
        let hooks = std::mem::take(&mut *self.hooks.lock());
        let count = hooks.len();
        for (name, hook) in hooks.into_iter().rev() {
            tracing::debug!(hook = %name, "Running shutdown hook");
            if panic::catch_unwind(AssertUnwindSafe(hook)).is_err() {
                tracing::error!(hook = %name, "Shutdown hook panicked");
            }
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_reverse_order() {
        let hooks = ShutdownHooks::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for i in 0..3 {
            let order = order.clone();
            hooks.register(format!("hook-{i}"), move || order.lock().push(i));
        }
        assert_eq!(hooks.run_all(), 3);
        assert_eq!(*order.lock(), vec![2, 1, 0]);
    }

    #[test]
    fn test_runs_once() {
        let hooks = ShutdownHooks::new();
        hooks.register("noop", || {});
        assert_eq!(hooks.run_all(), 1);
        assert_eq!(hooks.run_all(), 0);
        assert!(hooks.is_empty());
    }

    #[test]
    fn test_panicking_hook_does_not_stop_others() {
        let hooks = ShutdownHooks::new();
        let ran = Arc::new(Mutex::new(false));
        let flag = ran.clone();
        hooks.register("first", move || *flag.lock() = true);
        hooks.register("boom", || panic!("boom"));
        assert_eq!(hooks.run_all(), 2);
        assert!(*ran.lock());
    }
}

//! The single-step handler contract.

use std::sync::Arc;

use crate::context::RequestContext;
use crate::error::RestError;

/// One step of a handler chain.
///
/// A handler either finishes its work and returns, returns an error (the
/// run loop switches to the abort chain), or calls
/// [`RequestContext::suspend`] and arranges for the returned handle to be
/// resumed later.
pub trait RestHandler: Send + Sync {
    /// Runs the step against the context.
    fn handle(&self, ctx: &mut RequestContext) -> Result<(), RestError>;

    /// Whether the step must run on the event loop. The run loop moves the
    /// context back there first if it was offloaded.
    fn requires_event_loop(&self) -> bool {
        false
    }

    /// Name used in diagnostics.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// An ordered, immutable handler sequence shared by every request that
/// runs it.
pub type HandlerChain = Arc<[Arc<dyn RestHandler>]>;

/// Builds a [`HandlerChain`] from handlers in order.
pub fn chain(handlers: Vec<Arc<dyn RestHandler>>) -> HandlerChain {
    handlers.into()
}

/// A handler backed by a closure; see [`handler_fn`].
pub struct FnHandler<F> {
    f: F,
}

/// Wraps a closure as a [`RestHandler`].
pub fn handler_fn<F>(f: F) -> Arc<dyn RestHandler>
where
    F: Fn(&mut RequestContext) -> Result<(), RestError> + Send + Sync + 'static,
{
    Arc::new(FnHandler { f })
}

impl<F> RestHandler for FnHandler<F>
where
    F: Fn(&mut RequestContext) -> Result<(), RestError> + Send + Sync,
{
    fn handle(&self, ctx: &mut RequestContext) -> Result<(), RestError> {
        (self.f)(ctx)
    }

    fn name(&self) -> &'static str {
        "fn"
    }
}

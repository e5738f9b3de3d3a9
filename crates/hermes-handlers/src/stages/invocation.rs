//! Calling the resource method.

use std::fmt;
use std::sync::Arc;

use hermes_core::{Arguments, Outcome, RequestContext, RestError, RestHandler};

/// The resource method itself, as seen by the chain.
pub trait Invoker: Send + Sync {
    /// Calls the method with the converted parameters. `Err` is treated like
    /// [`Outcome::Fault`].
    fn invoke(&self, args: Arguments<'_>) -> Result<Outcome, RestError>;
}

/// An [`Invoker`] backed by a closure.
pub struct FnInvoker<F>(F);

impl<F> FnInvoker<F>
where
    F: Fn(Arguments<'_>) -> Result<Outcome, RestError> + Send + Sync,
{
    /// Wraps `f`.
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> Invoker for FnInvoker<F>
where
    F: Fn(Arguments<'_>) -> Result<Outcome, RestError> + Send + Sync,
{
    fn invoke(&self, args: Arguments<'_>) -> Result<Outcome, RestError> {
        (self.0)(args)
    }
}

/// Stores what an invocation (or an async container) produced: a value
/// becomes the result, an error response or fault becomes a failure.
pub(crate) fn store_outcome(ctx: &mut RequestContext, outcome: Outcome) -> Result<(), RestError> {
    match outcome {
        Outcome::Success(returned) => {
            ctx.set_result(returned);
            Ok(())
        }
        Outcome::ErrorResponse(response) => Err(RestError::web_application(response)),
        Outcome::Fault(error) => Err(error),
    }
}

/// Invokes the resource method and records its outcome.
pub struct InvocationHandler {
    invoker: Arc<dyn Invoker>,
}

impl fmt::Debug for InvocationHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationHandler").finish_non_exhaustive()
    }
}

impl InvocationHandler {
    /// Creates the stage.
    pub fn new(invoker: Arc<dyn Invoker>) -> Self {
        Self { invoker }
    }
}

impl RestHandler for InvocationHandler {
    fn handle(&self, ctx: &mut RequestContext) -> Result<(), RestError> {
        tracing::trace!(resource = ctx.target().name(), "Invoking resource method");
        let outcome = self.invoker.invoke(ctx.arguments())?;
        store_outcome(ctx, outcome)
    }

    fn name(&self) -> &'static str {
        "invocation"
    }
}

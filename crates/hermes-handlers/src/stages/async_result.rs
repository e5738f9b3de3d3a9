//! Unwrapping asynchronous results.
//!
//! Each stage passes through results that are not its container type.

use std::sync::Arc;

use hermes_core::{RequestContext, RestError, RestHandler, Returned};

use super::invocation::store_outcome;

/// Awaits a [`Returned::Future`] on the runtime and resumes with its
/// outcome.
#[derive(Debug, Default, Clone, Copy)]
pub struct FutureResultHandler;

impl RestHandler for FutureResultHandler {
    fn handle(&self, ctx: &mut RequestContext) -> Result<(), RestError> {
        let future = match ctx.take_result() {
            Some(Returned::Future(future)) => future,
            Some(other) => {
                ctx.set_result(other);
                return Ok(());
            }
            None => return Ok(()),
        };

        let handle = ctx.suspend();
        let deployment = Arc::clone(ctx.deployment());
        deployment.spawn(async move {
            let outcome = future.await;
            handle.resume_with(move |ctx| store_outcome(ctx, outcome));
        })
    }

    fn name(&self) -> &'static str {
        "future_result"
    }
}

/// Waits for a [`Returned::Deferred`] to be completed and resumes on the
/// event loop, whatever thread completed it.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeferredResultHandler;

impl RestHandler for DeferredResultHandler {
    fn handle(&self, ctx: &mut RequestContext) -> Result<(), RestError> {
        let deferred = match ctx.take_result() {
            Some(Returned::Deferred(deferred)) => deferred,
            Some(other) => {
                ctx.set_result(other);
                return Ok(());
            }
            None => return Ok(()),
        };

        let handle = ctx.suspend();
        let event_loop = Arc::clone(ctx.deployment().executors().event_loop());
        deferred.on_complete(move |outcome| {
            handle.resume_on_with(event_loop, move |ctx| store_outcome(ctx, outcome));
        });
        Ok(())
    }

    fn name(&self) -> &'static str {
        "deferred_result"
    }
}

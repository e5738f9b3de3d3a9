//! Offloading to the blocking executor.

use std::sync::Arc;

use hermes_core::{RequestContext, RestError, RestHandler};

/// Moves the rest of the chain onto the blocking executor.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlockingHandler;

impl RestHandler for BlockingHandler {
    fn handle(&self, ctx: &mut RequestContext) -> Result<(), RestError> {
        let blocking = Arc::clone(ctx.deployment().executors().blocking());
        ctx.suspend().resume_on(blocking);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "blocking"
    }
}

//! Chain steps running registered filters.

use std::fmt;
use std::sync::Arc;

use hermes_core::{RequestContext, RestError, RestHandler};

use crate::interceptor::{RequestFilter, ResponseFilter};

/// Runs one request filter.
pub struct RequestFilterHandler {
    filter: Arc<dyn RequestFilter>,
}

impl RequestFilterHandler {
    /// Wraps `filter`.
    pub fn new(filter: Arc<dyn RequestFilter>) -> Self {
        Self { filter }
    }
}

impl fmt::Debug for RequestFilterHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestFilterHandler").finish_non_exhaustive()
    }
}

impl RestHandler for RequestFilterHandler {
    fn handle(&self, ctx: &mut RequestContext) -> Result<(), RestError> {
        self.filter.filter(ctx)
    }

    fn name(&self) -> &'static str {
        "request_filter"
    }
}

/// Runs one response filter against the shaped response.
pub struct ResponseFilterHandler {
    filter: Arc<dyn ResponseFilter>,
}

impl ResponseFilterHandler {
    /// Wraps `filter`.
    pub fn new(filter: Arc<dyn ResponseFilter>) -> Self {
        Self { filter }
    }
}

impl fmt::Debug for ResponseFilterHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseFilterHandler").finish_non_exhaustive()
    }
}

impl RestHandler for ResponseFilterHandler {
    fn handle(&self, ctx: &mut RequestContext) -> Result<(), RestError> {
        let Some(mut response) = ctx.take_response() else {
            return Ok(());
        };
        let result = self.filter.filter(ctx, &mut response);
        if ctx.response().is_none() {
            ctx.set_response(response);
        }
        result
    }

    fn name(&self) -> &'static str {
        "response_filter"
    }
}

//! Mapping failures to responses on the abort chain.

use std::sync::Arc;

use hermes_core::{RequestContext, RestError, RestHandler};

/// First step of the abort chain: maps the recorded failure to a response.
///
/// Does nothing when no failure was recorded, as after
/// [`RequestContext::abort_with`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ExceptionHandler;

impl RestHandler for ExceptionHandler {
    fn handle(&self, ctx: &mut RequestContext) -> Result<(), RestError> {
        let Some(error) = ctx.take_error() else {
            return Ok(());
        };
        let request_id = ctx.request_id().to_string();
        if error.status_code().is_server_error() {
            tracing::error!(error = %error, "Request failed");
        } else {
            tracing::debug!(error = %error, "Request rejected");
        }

        let deployment = Arc::clone(ctx.deployment());
        let response = deployment
            .exception_mappers()
            .map(error, Some(&request_id));
        ctx.set_response(response);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "exception"
    }
}

//! Choosing the response media type from `Accept`.

use hermes_core::media;
use hermes_core::{RequestContext, RestError, RestHandler};
use mime::Mime;

/// For a resource producing one concrete type: checks the client accepts
/// it.
#[derive(Debug, Clone)]
pub struct FixedProducesHandler {
    media_type: Mime,
}

impl FixedProducesHandler {
    /// Produces `media_type`.
    pub fn new(media_type: Mime) -> Self {
        Self { media_type }
    }
}

impl RestHandler for FixedProducesHandler {
    fn handle(&self, ctx: &mut RequestContext) -> Result<(), RestError> {
        let accept = media::accept_of(ctx.headers());
        if media::best_score(&accept, std::slice::from_ref(&self.media_type)).is_none() {
            return Err(RestError::not_acceptable(format!(
                "resource produces {}",
                self.media_type
            )));
        }
        ctx.set_produces(self.media_type.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "fixed_produces"
    }
}

/// For a resource producing several types, or a wildcard: negotiates the
/// best one. A wildcard outcome is sent as `application/octet-stream`.
#[derive(Debug, Clone)]
pub struct VariableProducesHandler {
    produces: Vec<Mime>,
}

impl VariableProducesHandler {
    /// Negotiates among `produces`.
    pub fn new(produces: Vec<Mime>) -> Self {
        Self { produces }
    }
}

impl RestHandler for VariableProducesHandler {
    fn handle(&self, ctx: &mut RequestContext) -> Result<(), RestError> {
        let accept = media::accept_of(ctx.headers());
        let chosen = media::negotiate(&accept, &self.produces).ok_or_else(|| {
            let offered = self
                .produces
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            RestError::not_acceptable(format!("resource produces {offered}"))
        })?;
        ctx.set_produces(if media::is_wildcard(&chosen) {
            mime::APPLICATION_OCTET_STREAM
        } else {
            chosen
        });
        Ok(())
    }

    fn name(&self) -> &'static str {
        "variable_produces"
    }
}

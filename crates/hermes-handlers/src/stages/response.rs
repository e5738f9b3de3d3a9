//! Turning the invocation result into a response.

use hermes_core::{RequestContext, RestError, RestHandler, RestResponse, Returned};
use http::StatusCode;

/// Shapes the invocation result into a [`RestResponse`].
///
/// A response already installed (by an exception mapper or an aborting
/// filter) is kept as is. Otherwise bare values are wrapped in a 200, and a
/// result without entity is a 204. The negotiated media type is attached
/// when the response has an entity but no type of its own.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResponseHandler;

impl RestHandler for ResponseHandler {
    fn handle(&self, ctx: &mut RequestContext) -> Result<(), RestError> {
        if ctx.response().is_none() {
            let mut response = match ctx.take_result() {
                None | Some(Returned::Empty) => RestResponse::no_content(),
                Some(Returned::Entity(entity)) => RestResponse::ok().with_entity(entity),
                Some(Returned::Response(response)) => response,
                Some(other) => {
                    return Err(RestError::internal(format!(
                        "unhandled result {other:?} reached response shaping"
                    )))
                }
            };
            if response.entity().is_none() && response.status() == StatusCode::OK {
                response.set_status(StatusCode::NO_CONTENT);
            }
            ctx.set_response(response);
        }

        let produces = ctx.produces().cloned();
        if let (Some(response), Some(media_type)) = (ctx.response_mut(), produces) {
            if response.entity().is_some() && response.media_type().is_none() {
                response.set_media_type(media_type);
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "response"
    }
}

//! Decoding the request body into a parameter.

use std::sync::Arc;

use hermes_core::media;
use hermes_core::{RequestContext, RestError, RestHandler, TypeKey};

use super::input::BodyOverflow;

/// Reads the body with a reader registered for the parameter type and the
/// request `Content-Type`, and stores the value in slot `index`.
///
/// A missing `Content-Type` is read as `application/octet-stream`. A body
/// cut off for exceeding the maximum size fails with 413.
#[derive(Debug, Clone, Copy)]
pub struct RequestDeserializeHandler {
    index: usize,
    type_key: TypeKey,
}

impl RequestDeserializeHandler {
    /// Decodes into a value of type `type_key`, stored at `index`.
    pub fn new(index: usize, type_key: TypeKey) -> Self {
        Self { index, type_key }
    }
}

impl RestHandler for RequestDeserializeHandler {
    fn handle(&self, ctx: &mut RequestContext) -> Result<(), RestError> {
        let content_type = media::content_type_of(ctx.headers());
        let media_type = content_type
            .clone()
            .unwrap_or(mime::APPLICATION_OCTET_STREAM);

        let deployment = Arc::clone(ctx.deployment());
        let reader = deployment
            .serialisers()
            .find_readers(self.type_key, &media_type)
            .into_iter()
            .next()
            .ok_or_else(|| {
                RestError::unsupported_media_type(content_type.map(|m| m.to_string()))
            })?;

        let mut input = ctx.take_body().into_reader();
        let entity = reader.read(&mut input, &media_type).map_err(|error| {
            match ctx.extensions().get::<BodyOverflow>() {
                Some(overflow) if overflow.is_set() => RestError::PayloadTooLarge {
                    limit: ctx.deployment().settings().max_body_size,
                },
                _ => error,
            }
        })?;
        ctx.set_parameter(self.index, entity.into_inner())
    }

    fn name(&self) -> &'static str {
        "deserialize"
    }
}

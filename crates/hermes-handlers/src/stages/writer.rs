//! Encoding and sending the response.

use std::sync::Arc;

use bytes::Bytes;
use hermes_core::media;
use hermes_core::{RequestContext, RestError, RestHandler, RestResponse};
use http::header::{self, HeaderValue};
use http::Method;

/// Encodes the response entity and ends the exchange.
///
/// With a media type on the response, the writer is picked for that type
/// and the entity's runtime type. Without one, the type is negotiated from
/// `Accept` against what the writers for the entity can produce. HEAD
/// responses carry the headers, including `Content-Length`, but no body.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResponseWriterHandler;

impl RestHandler for ResponseWriterHandler {
    fn handle(&self, ctx: &mut RequestContext) -> Result<(), RestError> {
        let mut response = ctx
            .take_response()
            .unwrap_or_else(RestResponse::no_content);
        let body = encode(ctx, &mut response)?;

        let head = *ctx.method() == Method::HEAD;
        let exchange = ctx.exchange();
        exchange.set_status(response.status());
        let headers = exchange.headers_mut();
        for (name, value) in response.headers() {
            headers.append(name, value.clone());
        }
        if head {
            headers.insert(header::CONTENT_LENGTH, HeaderValue::from(body.len()));
            exchange.end(Bytes::new())
        } else {
            exchange.end(body)
        }
    }

    fn requires_event_loop(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "response_writer"
    }
}

fn encode(ctx: &RequestContext, response: &mut RestResponse) -> Result<Bytes, RestError> {
    let Some(entity) = response.take_entity() else {
        return Ok(Bytes::new());
    };
    let deployment = Arc::clone(ctx.deployment());
    let serialisers = deployment.serialisers();

    let (media_type, writer) = match response.media_type().cloned() {
        Some(media_type) => {
            let writer = serialisers
                .find_writers(entity.type_key(), &media_type)
                .into_iter()
                .next()
                .ok_or_else(|| {
                    RestError::internal(format!(
                        "no writer for {} as {media_type}",
                        entity.type_name()
                    ))
                })?;
            (media_type, writer)
        }
        None => serialisers
            .find_writer_no_media_type(&media::accept_of(ctx.headers()), &entity)
            .ok_or_else(|| {
                RestError::not_acceptable(format!(
                    "no acceptable representation of {}",
                    entity.type_name()
                ))
            })?,
    };

    let body = writer.write(entity, &media_type)?;
    if response.media_type().is_none() {
        response.set_media_type(media_type);
    }
    Ok(body)
}

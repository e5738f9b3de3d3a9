//! Reading the request body.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::BytesMut;
use futures_util::StreamExt;
use hermes_core::{
    BlockingBody, BodyStream, DispatchSettings, Executor, RequestBody, RequestContext, RestError,
    RestHandler, ResumeHandle,
};
use http::{header, Method};

/// Chunks buffered between the network and a blocking reader.
const STREAM_CHANNEL_CAPACITY: usize = 16;

/// Set once a streamed body went past the maximum size, so the reader's
/// I/O error can be reported as 413.
#[derive(Debug, Clone, Default)]
pub(crate) struct BodyOverflow(Arc<AtomicBool>);

impl BodyOverflow {
    pub(crate) fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn set(&self) {
        self.0.store(true, Ordering::Release);
    }
}

/// Accumulates the request body.
///
/// Bodies up to `input_buffer_size` are buffered without leaving the event
/// loop. Past that, the rest of the chain moves to the blocking executor and
/// reads the body through a [`BlockingBody`] fed by the network task. GET and
/// HEAD requests are left alone.
#[derive(Debug, Default, Clone, Copy)]
pub struct InputHandler;

impl RestHandler for InputHandler {
    fn handle(&self, ctx: &mut RequestContext) -> Result<(), RestError> {
        if *ctx.method() == Method::GET || *ctx.method() == Method::HEAD {
            return Ok(());
        }
        let settings = *ctx.deployment().settings();
        if let Some(length) = declared_length(ctx) {
            if length > settings.max_body_size {
                return Err(RestError::PayloadTooLarge {
                    limit: settings.max_body_size,
                });
            }
        }
        let Some(stream) = ctx.take_body_stream() else {
            return Ok(());
        };

        let blocking = Arc::clone(ctx.deployment().executors().blocking());
        let handle = ctx.suspend();
        let deployment = Arc::clone(ctx.deployment());
        deployment.spawn(read_body(stream, settings, blocking, handle))
    }

    fn name(&self) -> &'static str {
        "input"
    }
}

fn declared_length(ctx: &RequestContext) -> Option<usize> {
    ctx.headers()
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

async fn read_body(
    mut stream: BodyStream,
    settings: DispatchSettings,
    blocking: Arc<dyn Executor>,
    handle: ResumeHandle,
) {
    let mut buffer = BytesMut::new();
    loop {
        match stream.next().await {
            None => {
                let body = buffer.freeze();
                handle.resume_with(move |ctx| {
                    ctx.set_body(if body.is_empty() {
                        RequestBody::Empty
                    } else {
                        RequestBody::Buffered(body)
                    });
                    Ok(())
                });
                return;
            }
            Some(Err(error)) => {
                tracing::debug!(error = %error, "Connection closed while reading the body");
                handle.abort();
                return;
            }
            Some(Ok(chunk)) => {
                if buffer.len() + chunk.len() > settings.max_body_size {
                    handle.resume_error(RestError::PayloadTooLarge {
                        limit: settings.max_body_size,
                    });
                    return;
                }
                buffer.extend_from_slice(&chunk);
                if buffer.len() > settings.input_buffer_size {
                    break;
                }
            }
        }
    }

    tracing::debug!(
        buffered = buffer.len(),
        threshold = settings.input_buffer_size,
        "Body exceeds the buffer threshold; streaming to a blocking reader"
    );
    let mut total = buffer.len();
    let (body, tx) = BlockingBody::channel(buffer.freeze(), STREAM_CHANNEL_CAPACITY);
    let overflow = BodyOverflow::default();
    let flag = overflow.clone();
    handle.resume_on_with(blocking, move |ctx| {
        ctx.extensions_mut().insert(flag);
        ctx.set_body(RequestBody::Streaming(body));
        Ok(())
    });

    while let Some(item) = stream.next().await {
        let forwarded = match item {
            Ok(chunk) => {
                total += chunk.len();
                if total > settings.max_body_size {
                    overflow.set();
                    let _ = tx
                        .send(Err(io::Error::new(
                            io::ErrorKind::InvalidData,
                            format!("body exceeds {} bytes", settings.max_body_size),
                        )))
                        .await;
                    return;
                }
                tx.send(Ok(chunk)).await
            }
            Err(error) => {
                let _ = tx.send(Err(error)).await;
                return;
            }
        };
        if forwarded.is_err() {
            // reader gone
            return;
        }
    }
}

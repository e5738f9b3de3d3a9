//! The network primitives the engine rides on.
//!
//! A transport adapter (the hyper server, or the in-memory test exchange)
//! implements these two traits; the engine never sees sockets.

use std::io;

use bytes::Bytes;
use futures_util::stream::BoxStream;
use http::{HeaderMap, Method, StatusCode};

use crate::error::RestError;

/// Request body as a stream of chunks. An `Err` item means the connection
/// failed or closed mid-body.
pub type BodyStream = BoxStream<'static, Result<Bytes, io::Error>>;

/// Inbound side of one exchange.
pub trait ServerHttpRequest: Send {
    /// Request method.
    fn method(&self) -> &Method;

    /// Normalized path, without query string.
    fn path(&self) -> &str;

    /// Raw query string, without the `?`.
    fn query(&self) -> Option<&str>;

    /// Request headers.
    fn headers(&self) -> &HeaderMap;

    /// Takes the body stream; `None` once taken or if there is no body.
    fn take_body(&mut self) -> Option<BodyStream>;
}

/// Outbound side of one exchange.
pub trait ServerHttpResponse: Send {
    /// Sets the status; ignored once committed.
    fn set_status(&mut self, status: StatusCode);

    /// Response headers; changes after commit have no effect.
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Writes `body` and ends the exchange.
    fn end(&mut self, body: Bytes) -> Result<(), RestError>;

    /// Whether status and headers have been sent.
    fn is_committed(&self) -> bool;

    /// Whether the peer has gone away.
    fn is_closed(&self) -> bool;

    /// Drops the exchange without a (complete) response.
    fn abort(&mut self);
}

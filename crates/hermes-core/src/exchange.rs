//! Owned implementations of the exchange traits.
//!
//! [`InboundRequest`] holds a request whose head has been fully received;
//! [`ChannelResponse`] hands the finished response to whoever owns the
//! receiving end. The hyper server and the test harness both build on them.

use std::fmt;
use std::io;

use bytes::Bytes;
use futures_util::stream::{self, StreamExt};
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method, StatusCode, Uri};
use tokio::sync::oneshot;

use crate::error::RestError;
use crate::spi::{BodyStream, ServerHttpRequest, ServerHttpResponse};

/// A request head plus an optional body stream.
pub struct InboundRequest {
    method: Method,
    path: String,
    query: Option<String>,
    headers: HeaderMap,
    body: Option<BodyStream>,
}

impl fmt::Debug for InboundRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InboundRequest")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("query", &self.query)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

impl InboundRequest {
    /// A request for `target`, a path with an optional `?query`.
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query.to_string())),
            None => (target, None),
        };
        Self {
            method,
            path: normalize(path),
            query,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// A request from an already parsed head.
    pub fn from_parts(method: Method, uri: &Uri, headers: HeaderMap, body: Option<BodyStream>) -> Self {
        Self {
            method,
            path: normalize(uri.path()),
            query: uri.query().map(ToString::to_string),
            headers,
            body,
        }
    }

    /// Adds a header; invalid names or values are ignored.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    /// Uses `body` as a single-chunk body.
    #[must_use]
    pub fn with_body(self, body: impl Into<Bytes>) -> Self {
        self.with_chunks(vec![body.into()])
    }

    /// Uses `chunks` as the body, delivered one at a time.
    #[must_use]
    pub fn with_chunks(mut self, chunks: Vec<Bytes>) -> Self {
        self.body = Some(stream::iter(chunks.into_iter().map(Ok)).boxed());
        self
    }

    /// Uses an arbitrary body stream.
    #[must_use]
    pub fn with_body_stream(mut self, body: BodyStream) -> Self {
        self.body = Some(body);
        self
    }

    /// Mutable headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }
}

fn normalize(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

impl ServerHttpRequest for InboundRequest {
    fn method(&self) -> &Method {
        &self.method
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn take_body(&mut self) -> Option<BodyStream> {
        self.body.take()
    }
}

/// A finished response as handed over by [`ChannelResponse`].
#[derive(Debug, Clone)]
pub struct CompletedResponse {
    /// Status code.
    pub status: StatusCode,
    /// Headers.
    pub headers: HeaderMap,
    /// Full body.
    pub body: Bytes,
}

/// A response sink that sends the completed response over a oneshot
/// channel. Aborting drops the sender, so the receiver sees an error.
pub struct ChannelResponse {
    status: StatusCode,
    headers: HeaderMap,
    committed: bool,
    tx: Option<oneshot::Sender<CompletedResponse>>,
}

impl fmt::Debug for ChannelResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelResponse")
            .field("status", &self.status)
            .field("committed", &self.committed)
            .finish_non_exhaustive()
    }
}

impl ChannelResponse {
    /// Creates the sink and the receiver of its completed response.
    pub fn new() -> (Self, oneshot::Receiver<CompletedResponse>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                status: StatusCode::OK,
                headers: HeaderMap::new(),
                committed: false,
                tx: Some(tx),
            },
            rx,
        )
    }
}

impl ServerHttpResponse for ChannelResponse {
    fn set_status(&mut self, status: StatusCode) {
        if !self.committed {
            self.status = status;
        }
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn end(&mut self, body: Bytes) -> Result<(), RestError> {
        if self.committed {
            return Err(RestError::internal("response already ended"));
        }
        self.committed = true;
        let tx = self.tx.take().ok_or(RestError::Aborted)?;
        tx.send(CompletedResponse {
            status: self.status,
            headers: std::mem::take(&mut self.headers),
            body,
        })
        .map_err(|_| RestError::Aborted)
    }

    fn is_committed(&self) -> bool {
        self.committed
    }

    fn is_closed(&self) -> bool {
        self.tx.as_ref().map_or(true, oneshot::Sender::is_closed)
    }

    fn abort(&mut self) {
        self.tx = None;
    }
}

/// A body stream that fails with `kind` after yielding `chunks`.
pub fn failing_body(chunks: Vec<Bytes>, kind: io::ErrorKind) -> BodyStream {
    stream::iter(chunks.into_iter().map(Ok))
        .chain(stream::once(async move {
            Err(io::Error::new(kind, "connection closed"))
        }))
        .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_split() {
        let req = InboundRequest::new(Method::GET, "/widgets?sort=name&limit=5");
        assert_eq!(req.path(), "/widgets");
        assert_eq!(req.query(), Some("sort=name&limit=5"));

        let req = InboundRequest::new(Method::GET, "widgets");
        assert_eq!(req.path(), "/widgets");
        assert_eq!(req.query(), None);
    }

    #[test]
    fn test_headers() {
        let req = InboundRequest::new(Method::GET, "/")
            .with_header("Accept", "application/json")
            .with_header("bad header", "x");
        assert_eq!(req.headers().len(), 1);
        assert_eq!(req.headers()["accept"], "application/json");
    }

    #[tokio::test]
    async fn test_body_chunks() {
        let mut req = InboundRequest::new(Method::POST, "/")
            .with_chunks(vec![Bytes::from_static(b"ab"), Bytes::from_static(b"c")]);
        let body = req.take_body().unwrap();
        let chunks: Vec<_> = body.collect().await;
        assert_eq!(chunks.len(), 2);
        assert!(req.take_body().is_none());
    }

    #[tokio::test]
    async fn test_channel_response_end() {
        let (mut resp, rx) = ChannelResponse::new();
        resp.set_status(StatusCode::CREATED);
        resp.headers_mut()
            .insert("x-id", HeaderValue::from_static("1"));
        resp.end(Bytes::from_static(b"done")).unwrap();
        assert!(resp.is_committed());
        resp.set_status(StatusCode::IM_A_TEAPOT);
        assert!(resp.end(Bytes::new()).is_err());

        let done = rx.await.unwrap();
        assert_eq!(done.status, StatusCode::CREATED);
        assert_eq!(done.headers["x-id"], "1");
        assert_eq!(&done.body[..], b"done");
    }

    #[tokio::test]
    async fn test_channel_response_abort() {
        let (mut resp, rx) = ChannelResponse::new();
        assert!(!resp.is_closed());
        resp.abort();
        assert!(resp.is_closed());
        assert!(rx.await.is_err());
    }

    #[test]
    fn test_closed_when_receiver_dropped() {
        let (mut resp, rx) = ChannelResponse::new();
        drop(rx);
        assert!(resp.is_closed());
        assert!(matches!(resp.end(Bytes::new()), Err(RestError::Aborted)));
    }
}

//! Building requests for the test client.

use bytes::Bytes;
use hermes_core::exchange::InboundRequest;
use http::{header, Method};
use serde::Serialize;

use crate::error::TestError;

/// A request description turned into an engine request on send.
///
/// ```rust
/// use hermes_test::TestRequest;
///
/// let request = TestRequest::get("/widgets")
///     .query("sort", "name desc")
///     .accept("application/json");
/// assert_eq!(request.target(), "/widgets?sort=name%20desc");
/// ```
#[derive(Debug, Clone)]
#[must_use]
pub struct TestRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    body: Option<Vec<Bytes>>,
}

impl TestRequest {
    /// A request with `method` for `path`. A query string in `path` is kept.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// A GET request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// A POST request.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// A PUT request.
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    /// A DELETE request.
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// A HEAD request.
    pub fn head(path: impl Into<String>) -> Self {
        Self::new(Method::HEAD, path)
    }

    /// An OPTIONS request.
    pub fn options(path: impl Into<String>) -> Self {
        Self::new(Method::OPTIONS, path)
    }

    /// The method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path plus the encoded query parameters added with [`Self::query`].
    pub fn target(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let encoded = self
            .query
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        let separator = if self.path.contains('?') { '&' } else { '?' };
        format!("{}{separator}{encoded}", self.path)
    }

    /// Appends a query parameter.
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Appends a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets `Content-Type`.
    pub fn content_type(self, value: impl Into<String>) -> Self {
        self.header(header::CONTENT_TYPE.as_str(), value)
    }

    /// Sets `Accept`.
    pub fn accept(self, value: impl Into<String>) -> Self {
        self.header(header::ACCEPT.as_str(), value)
    }

    /// Uses `body` as a single-chunk body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(vec![body.into()]);
        self
    }

    /// Uses `chunks` as the body, delivered one chunk at a time.
    pub fn chunks<I, B>(mut self, chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        self.body = Some(chunks.into_iter().map(Into::into).collect());
        self
    }

    /// Serialises `value` as the body and sets a JSON content type.
    pub fn json<T: Serialize>(self, value: &T) -> Result<Self, TestError> {
        let body = serde_json::to_vec(value)?;
        Ok(self.content_type("application/json").body(body))
    }

    pub(crate) fn has_header(&self, name: &str) -> bool {
        self.headers.iter().any(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    /// The engine request this describes.
    pub fn into_inbound(self) -> InboundRequest {
        let target = self.target();
        let mut inbound = InboundRequest::new(self.method, &target);
        for (name, value) in &self.headers {
            inbound = inbound.with_header(name, value);
        }
        match self.body {
            Some(chunks) => inbound.with_chunks(chunks),
            None => inbound,
        }
    }
}

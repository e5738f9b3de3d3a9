//! Captured responses and assertions on them.

use std::fmt;

use bytes::Bytes;
use hermes_core::exchange::CompletedResponse;
use http::{header, HeaderMap, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::TestError;

/// A response the engine ended.
#[derive(Clone)]
pub struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl From<CompletedResponse> for TestResponse {
    fn from(completed: CompletedResponse) -> Self {
        Self::new(completed.status, completed.headers, completed.body)
    }
}

impl TestResponse {
    /// Wraps a status, headers and body.
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Status.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Status as a number.
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// All headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// A header value, if present and printable.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// `Content-Type`.
    pub fn content_type(&self) -> Option<&str> {
        self.header(header::CONTENT_TYPE.as_str())
    }

    /// Raw body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Body as UTF-8 text.
    pub fn text(&self) -> Result<String, TestError> {
        Ok(String::from_utf8(self.body.to_vec())?)
    }

    /// Body parsed as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TestError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// The `error.code` of a JSON error envelope.
    pub fn error_code(&self) -> Option<String> {
        let value: serde_json::Value = self.json().ok()?;
        value["error"]["code"].as_str().map(ToString::to_string)
    }

    /// # Panics
    ///
    /// Panics if the status differs.
    #[track_caller]
    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status,
            expected,
            "expected status {expected}, got {} with body {:?}",
            self.status,
            String::from_utf8_lossy(&self.body)
        );
        self
    }

    /// # Panics
    ///
    /// Panics if the header is missing or differs.
    #[track_caller]
    pub fn assert_header(&self, name: &str, expected: &str) -> &Self {
        match self.header(name) {
            Some(actual) => assert_eq!(actual, expected, "header '{name}'"),
            None => panic!("header '{name}' not found"),
        }
        self
    }

    /// Checks the media type of `Content-Type`, ignoring parameters.
    ///
    /// # Panics
    ///
    /// Panics if `Content-Type` is missing or has another essence.
    #[track_caller]
    pub fn assert_content_type(&self, expected: &str) -> &Self {
        let actual = self
            .content_type()
            .unwrap_or_else(|| panic!("Content-Type not set, expected '{expected}'"));
        let essence = actual.split(';').next().unwrap_or_default().trim();
        assert!(
            essence.eq_ignore_ascii_case(expected),
            "Content-Type: expected '{expected}', got '{actual}'"
        );
        self
    }

    /// # Panics
    ///
    /// Panics if the body is not UTF-8 or differs.
    #[track_caller]
    pub fn assert_text(&self, expected: &str) -> &Self {
        match self.text() {
            Ok(actual) => assert_eq!(actual, expected, "body mismatch"),
            Err(e) => panic!("{e}"),
        }
        self
    }

    /// # Panics
    ///
    /// Panics unless the body is a JSON error envelope with `code`.
    #[track_caller]
    pub fn assert_error_code(&self, code: &str) -> &Self {
        assert_eq!(
            self.error_code().as_deref(),
            Some(code),
            "error envelope mismatch in {:?}",
            String::from_utf8_lossy(&self.body)
        );
        self
    }
}

impl fmt::Debug for TestResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body_len", &self.body.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn response(status: StatusCode, content_type: &'static str, body: &'static str) -> TestResponse {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        TestResponse::new(status, headers, Bytes::from_static(body.as_bytes()))
    }

    #[test]
    fn test_text_and_header() {
        let r = response(StatusCode::OK, "text/plain; charset=utf-8", "widget 1");
        r.assert_status(StatusCode::OK)
            .assert_content_type("text/plain")
            .assert_text("widget 1");
        assert_eq!(r.status_code(), 200);
    }

    #[test]
    fn test_error_code() {
        let r = response(
            StatusCode::NOT_FOUND,
            "application/json",
            r#"{"error":{"code":"NOT_FOUND","message":"gone","category":"client"}}"#,
        );
        r.assert_error_code("NOT_FOUND");
        assert_eq!(r.error_code().as_deref(), Some("NOT_FOUND"));
    }

    #[test]
    fn test_error_code_absent_for_plain_body() {
        let r = response(StatusCode::OK, "text/plain", "fine");
        assert!(r.error_code().is_none());
    }

    #[test]
    #[should_panic(expected = "expected status 201")]
    fn test_assert_status_panics() {
        response(StatusCode::OK, "text/plain", "").assert_status(StatusCode::CREATED);
    }
}

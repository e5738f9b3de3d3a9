//! Error types for Hermes.
//!
//! [`RestError`] is the single error type that flows through a handler
//! chain. Handlers return it, the run loop records it on the context, and the
//! exception stage turns it into a response exactly once.

use http::{header, HeaderValue, Method, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::response::RestResponse;
use crate::value::Entity;

/// Result type alias using [`RestError`].
pub type RestResult<T> = Result<T, RestError>;

/// Categories of errors for classification and default status mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Malformed request input (unconvertible parameter).
    Validation,
    /// No resource for the path.
    NotFound,
    /// Path known, method not.
    MethodNotAllowed,
    /// No acceptable response media type.
    NotAcceptable,
    /// Request media type not consumable.
    UnsupportedMediaType,
    /// Request body over the configured limit.
    PayloadTooLarge,
    /// Request body could not be read or decoded.
    Deserialization,
    /// Anything else, including unmapped application errors.
    Internal,
}

impl ErrorCategory {
    /// Returns the default HTTP status code for this error category.
    #[must_use]
    pub const fn default_status_code(&self) -> StatusCode {
        match self {
            Self::Validation | Self::Deserialization => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::NotAcceptable => StatusCode::NOT_ACCEPTABLE,
            Self::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Standard error type for request processing.
///
/// # Example
///
/// ```
/// use hermes_core::{ErrorCategory, RestError};
///
/// let err = RestError::not_found("no widget 42");
/// assert_eq!(err.category(), ErrorCategory::NotFound);
/// assert_eq!(err.status_code().as_u16(), 404);
/// ```
#[derive(Error, Debug)]
pub enum RestError {
    /// Nothing matched the path, or a sub-resource could not be resolved.
    #[error("Not found: {message}")]
    NotFound {
        /// Human-readable error message.
        message: String,
    },

    /// The path matched for other methods only.
    #[error("Method not allowed")]
    MethodNotAllowed {
        /// Methods the path does support.
        allow: Vec<Method>,
    },

    /// None of the produced media types is acceptable to the client.
    #[error("Not acceptable: {message}")]
    NotAcceptable {
        /// Human-readable error message.
        message: String,
    },

    /// The request body media type cannot be consumed.
    #[error("Unsupported media type: {}", content_type.as_deref().unwrap_or("<none>"))]
    UnsupportedMediaType {
        /// The offending `Content-Type`, if one was sent.
        content_type: Option<String>,
    },

    /// A request parameter was missing or could not be converted.
    #[error("Bad request: {message}")]
    BadRequest {
        /// Human-readable error message.
        message: String,
        /// The underlying conversion error.
        #[source]
        source: Option<anyhow::Error>,
    },

    /// The request body exceeded the configured maximum.
    #[error("Payload too large: limit is {limit} bytes")]
    PayloadTooLarge {
        /// Maximum accepted body size in bytes.
        limit: usize,
    },

    /// The request body could not be decoded.
    #[error("Deserialization error: {message}")]
    Deserialization {
        /// Human-readable error message.
        message: String,
        /// The underlying decode error.
        #[source]
        source: Option<anyhow::Error>,
    },

    /// An entity could not be encoded.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Human-readable error message.
        message: String,
        /// The underlying encode error.
        #[source]
        source: Option<anyhow::Error>,
    },

    /// An error raised by application code, subject to exception mapping.
    #[error("{0}")]
    Application(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// An error that already carries the response to send.
    #[error("Web application error with status {}", .0.status())]
    WebApplication(Box<RestResponse>),

    /// The transport went away; nothing will be written.
    #[error("Connection aborted")]
    Aborted,

    /// Internal server error.
    #[error("Internal error: {message}")]
    Internal {
        /// Human-readable error message.
        message: String,
        /// The underlying error (not exposed to clients).
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl RestError {
    /// Creates a not found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Creates a not acceptable error.
    #[must_use]
    pub fn not_acceptable(message: impl Into<String>) -> Self {
        Self::NotAcceptable {
            message: message.into(),
        }
    }

    /// Creates an unsupported media type error.
    #[must_use]
    pub fn unsupported_media_type(content_type: Option<impl Into<String>>) -> Self {
        Self::UnsupportedMediaType {
            content_type: content_type.map(Into::into),
        }
    }

    /// Creates a bad request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a bad request error with a source error.
    pub fn bad_request_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::BadRequest {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Creates a deserialization error with a source error.
    pub fn deserialization(message: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::Deserialization {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Creates a serialization error with a source error.
    pub fn serialization(message: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::Serialization {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Wraps an application error for exception mapping.
    pub fn application(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Application(Box::new(error))
    }

    /// Creates an error that is answered with `response` verbatim.
    #[must_use]
    pub fn web_application(response: RestResponse) -> Self {
        Self::WebApplication(Box::new(response))
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an internal error with a source error.
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::MethodNotAllowed { .. } => ErrorCategory::MethodNotAllowed,
            Self::NotAcceptable { .. } => ErrorCategory::NotAcceptable,
            Self::UnsupportedMediaType { .. } => ErrorCategory::UnsupportedMediaType,
            Self::BadRequest { .. } => ErrorCategory::Validation,
            Self::PayloadTooLarge { .. } => ErrorCategory::PayloadTooLarge,
            Self::Deserialization { .. } => ErrorCategory::Deserialization,
            Self::Serialization { .. }
            | Self::Application(_)
            | Self::WebApplication(_)
            | Self::Aborted
            | Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::WebApplication(response) => response.status(),
            other => other.category().default_status_code(),
        }
    }

    /// Returns true for the transport-abort condition.
    #[must_use]
    pub const fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }

    /// Converts this error to a serializable error envelope.
    #[must_use]
    pub fn to_envelope(&self, request_id: Option<&str>) -> ErrorEnvelope {
        let message = match self.category() {
            ErrorCategory::Internal => "Internal server error".to_string(),
            _ => self.to_string(),
        };
        ErrorEnvelope {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message,
                category: self.category(),
            },
            request_id: request_id.map(ToString::to_string),
        }
    }

    /// Builds the default response for this error: the category status and a
    /// JSON envelope, plus `Allow` for 405.
    ///
    /// A [`RestError::WebApplication`] yields its own response instead.
    #[must_use]
    pub fn into_response(self, request_id: Option<&str>) -> RestResponse {
        if let Self::WebApplication(response) = self {
            return *response;
        }

        let envelope = self.to_envelope(request_id);
        let mut response = RestResponse::new(self.status_code())
            .with_media_type(mime::APPLICATION_JSON)
            .with_entity(Entity::new(
                serde_json::to_value(&envelope).unwrap_or(serde_json::Value::Null),
            ));

        if let Self::MethodNotAllowed { allow } = &self {
            if let Some(value) = allow_header(allow) {
                response.headers_mut().insert(header::ALLOW, value);
            }
        }
        response
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::MethodNotAllowed { .. } => "METHOD_NOT_ALLOWED",
            Self::NotAcceptable { .. } => "NOT_ACCEPTABLE",
            Self::UnsupportedMediaType { .. } => "UNSUPPORTED_MEDIA_TYPE",
            Self::BadRequest { .. } => "BAD_REQUEST",
            Self::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            Self::Deserialization { .. } => "DESERIALIZATION_ERROR",
            Self::Serialization { .. } => "SERIALIZATION_ERROR",
            Self::Application(_) => "APPLICATION_ERROR",
            Self::WebApplication(_) => "WEB_APPLICATION_ERROR",
            Self::Aborted => "ABORTED",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

/// Renders an `Allow` header value, or `None` for an empty method list.
pub fn allow_header(methods: &[Method]) -> Option<HeaderValue> {
    if methods.is_empty() {
        return None;
    }
    let joined = methods
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    HeaderValue::from_str(&joined).ok()
}

/// Serializable error envelope for responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// The error details.
    pub error: ErrorDetail,
    /// The request ID for correlation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Detailed error information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Error category.
    pub category: ErrorCategory,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("widget exploded")]
    struct WidgetError;

    #[test]
    fn test_status_codes() {
        assert_eq!(RestError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            RestError::not_acceptable("x").status_code(),
            StatusCode::NOT_ACCEPTABLE
        );
        assert_eq!(
            RestError::unsupported_media_type(Some("text/xml")).status_code(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            RestError::bad_request("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            RestError::PayloadTooLarge { limit: 1 }.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            RestError::application(WidgetError).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_web_application_uses_own_status() {
        let err = RestError::web_application(RestResponse::new(StatusCode::CONFLICT));
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        let response = err.into_response(None);
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert!(response.entity().is_none());
    }

    #[test]
    fn test_internal_message_not_leaked() {
        let envelope = RestError::internal("db password wrong").to_envelope(Some("req-1"));
        assert_eq!(envelope.error.message, "Internal server error");
        assert_eq!(envelope.error.code, "INTERNAL_ERROR");
        assert_eq!(envelope.request_id.as_deref(), Some("req-1"));
    }

    #[test]
    fn test_envelope_serialization() {
        let envelope = RestError::not_found("no widget").to_envelope(None);
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["error"]["code"], "NOT_FOUND");
        assert_eq!(json["error"]["category"], "not_found");
        assert!(json.get("request_id").is_none());
    }

    #[test]
    fn test_method_not_allowed_sets_allow() {
        let response = RestError::MethodNotAllowed {
            allow: vec![Method::GET, Method::PUT],
        }
        .into_response(None);
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], "GET, PUT");
        assert_eq!(response.media_type(), Some(&mime::APPLICATION_JSON));
    }

    #[test]
    fn test_application_error_source() {
        let err = RestError::application(WidgetError);
        assert_eq!(err.to_string(), "widget exploded");
        assert!(std::error::Error::source(&err).is_some());
    }
}

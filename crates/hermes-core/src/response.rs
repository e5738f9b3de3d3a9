//! The in-flight response envelope.

use http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use mime::Mime;

use crate::value::Entity;

/// A response being assembled by the chain.
///
/// Produced by the shaping stage (or an exception mapper, or a filter that
/// aborts), adjusted by response filters, and finally encoded by the writer.
///
/// # Example
///
/// ```
/// use hermes_core::RestResponse;
/// use http::StatusCode;
///
/// let response = RestResponse::ok()
///     .with_header("x-widget", "42")
///     .with_value(String::from("hello"));
/// assert_eq!(response.status(), StatusCode::OK);
/// assert!(response.entity().is_some());
/// ```
#[derive(Debug, Default)]
pub struct RestResponse {
    status: StatusCode,
    headers: HeaderMap,
    media_type: Option<Mime>,
    entity: Option<Entity>,
}

impl RestResponse {
    /// A `200 OK` response without entity.
    #[must_use]
    pub fn ok() -> Self {
        Self::new(StatusCode::OK)
    }

    /// A `204 No Content` response.
    #[must_use]
    pub fn no_content() -> Self {
        Self::new(StatusCode::NO_CONTENT)
    }

    /// A response with the given status.
    #[must_use]
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    /// Appends a header; invalid names or values are ignored.
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

    /// Sets the entity.
    #[must_use]
    pub fn with_entity(mut self, entity: Entity) -> Self {
        self.entity = Some(entity);
        self
    }

    /// Sets the entity from a plain value.
    #[must_use]
    pub fn with_value<T: std::any::Any + Send>(self, value: T) -> Self {
        self.with_entity(Entity::new(value))
    }

    /// Sets the media type the entity is written as.
    #[must_use]
    pub fn with_media_type(mut self, media_type: Mime) -> Self {
        self.set_media_type(media_type);
        self
    }

    /// Returns the status.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Replaces the status.
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Returns the headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the headers for mutation.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Returns the media type, if one was chosen.
    pub fn media_type(&self) -> Option<&Mime> {
        self.media_type.as_ref()
    }

    /// Sets the media type and mirrors it into `Content-Type`.
    pub fn set_media_type(&mut self, media_type: Mime) {
        if let Ok(value) = HeaderValue::from_str(media_type.as_ref()) {
            self.headers.insert(header::CONTENT_TYPE, value);
        }
        self.media_type = Some(media_type);
    }

    /// Returns the entity, if any.
    pub fn entity(&self) -> Option<&Entity> {
        self.entity.as_ref()
    }

    /// Replaces the entity.
    pub fn set_entity(&mut self, entity: Option<Entity>) {
        self.entity = entity;
    }

    /// Removes and returns the entity.
    pub fn take_entity(&mut self) -> Option<Entity> {
        self.entity.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type_sets_content_type() {
        let response = RestResponse::ok().with_media_type(mime::TEXT_PLAIN);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");
        assert_eq!(response.media_type(), Some(&mime::TEXT_PLAIN));
    }

    #[test]
    fn test_invalid_header_ignored() {
        let response = RestResponse::ok().with_header("bad header", "x");
        assert!(response.headers().is_empty());
    }

    #[test]
    fn test_take_entity() {
        let mut response = RestResponse::ok().with_value(7_u32);
        let entity = response.take_entity().unwrap();
        assert_eq!(entity.downcast_ref::<u32>(), Some(&7));
        assert!(response.entity().is_none());
    }
}

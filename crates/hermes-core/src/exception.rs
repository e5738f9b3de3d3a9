//! Mapping failures to responses.

use std::error::Error;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::{ErrorCategory, RestError};
use crate::response::RestResponse;

/// Turns a failure into a response, or declines.
pub trait ExceptionMapper: Send + Sync {
    /// Returns the response for `error`, or `None` to let the next mapper try.
    fn to_response(&self, error: &RestError) -> Option<RestResponse>;
}

/// Ordered exception mappers; the first one that answers wins.
#[derive(Default, Clone)]
pub struct ExceptionMappers {
    mappers: Vec<Arc<dyn ExceptionMapper>>,
}

impl fmt::Debug for ExceptionMappers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExceptionMappers")
            .field("len", &self.mappers.len())
            .finish()
    }
}

impl ExceptionMappers {
    /// No mappers: every failure gets its default response.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a mapper.
    pub fn add(&mut self, mapper: impl ExceptionMapper + 'static) {
        self.mappers.push(Arc::new(mapper));
    }

    /// Maps application errors of type `E` with `f`.
    pub fn register<E, F>(&mut self, f: F)
    where
        E: Error + 'static,
        F: Fn(&E) -> RestResponse + Send + Sync + 'static,
    {
        self.add(TypedMapper {
            f,
            _marker: PhantomData::<fn(&E)>,
        });
    }

    /// Maps every error of `category` with `f`.
    pub fn register_category<F>(&mut self, category: ErrorCategory, f: F)
    where
        F: Fn(&RestError) -> RestResponse + Send + Sync + 'static,
    {
        self.add(CategoryMapper { category, f });
    }

    /// Number of registered mappers.
    pub fn len(&self) -> usize {
        self.mappers.len()
    }

    /// Returns true if no mapper is registered.
    pub fn is_empty(&self) -> bool {
        self.mappers.is_empty()
    }

    /// Produces the response for `error`.
    ///
    /// A [`RestError::WebApplication`] answers with its own response. Other
    /// errors go through the mappers in registration order, then fall back to
    /// [`RestError::into_response`].
    pub fn map(&self, error: RestError, request_id: Option<&str>) -> RestResponse {
        if let RestError::WebApplication(response) = error {
            return *response;
        }
        self.mappers
            .iter()
            .find_map(|m| m.to_response(&error))
            .unwrap_or_else(|| error.into_response(request_id))
    }
}

struct TypedMapper<E, F> {
    f: F,
    _marker: PhantomData<fn(&E)>,
}

impl<E, F> ExceptionMapper for TypedMapper<E, F>
where
    E: Error + 'static,
    F: Fn(&E) -> RestResponse + Send + Sync,
{
    fn to_response(&self, error: &RestError) -> Option<RestResponse> {
        match error {
            RestError::Application(inner) => inner.downcast_ref::<E>().map(&self.f),
            _ => None,
        }
    }
}

struct CategoryMapper<F> {
    category: ErrorCategory,
    f: F,
}

impl<F> ExceptionMapper for CategoryMapper<F>
where
    F: Fn(&RestError) -> RestResponse + Send + Sync,
{
    fn to_response(&self, error: &RestError) -> Option<RestResponse> {
        (error.category() == self.category).then(|| (self.f)(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[derive(Debug, thiserror::Error)]
    #[error("widget {0} is locked")]
    struct Locked(u32);

    #[derive(Debug, thiserror::Error)]
    #[error("other")]
    struct Other;

    #[test]
    fn test_typed_mapper_matches_application_error() {
        let mut mappers = ExceptionMappers::new();
        mappers.register::<Locked, _>(|_| RestResponse::new(StatusCode::CONFLICT));

        let response = mappers.map(RestError::application(Locked(3)), None);
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = mappers.map(RestError::application(Other), None);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_first_mapper_wins() {
        let mut mappers = ExceptionMappers::new();
        mappers.register::<Locked, _>(|_| RestResponse::new(StatusCode::CONFLICT));
        mappers.register::<Locked, _>(|_| RestResponse::new(StatusCode::GONE));
        let response = mappers.map(RestError::application(Locked(1)), None);
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_category_mapper() {
        let mut mappers = ExceptionMappers::new();
        mappers.register_category(ErrorCategory::NotFound, |_| {
            RestResponse::new(StatusCode::GONE)
        });
        let response = mappers.map(RestError::not_found("x"), None);
        assert_eq!(response.status(), StatusCode::GONE);
    }

    #[test]
    fn test_web_application_bypasses_mappers() {
        let mut mappers = ExceptionMappers::new();
        mappers.register_category(ErrorCategory::Internal, |_| {
            RestResponse::new(StatusCode::BAD_GATEWAY)
        });
        let error = RestError::web_application(RestResponse::new(StatusCode::IM_A_TEAPOT));
        assert_eq!(mappers.map(error, None).status(), StatusCode::IM_A_TEAPOT);
    }
}

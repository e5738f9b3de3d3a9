//! Test client failures.

use http::Method;
use thiserror::Error;

/// Why a test exchange produced no [`TestResponse`](crate::TestResponse).
#[derive(Error, Debug)]
pub enum TestError {
    /// No resource is registered for the path and the dispatcher handed
    /// the exchange back.
    #[error("no resource handles {method} {path}")]
    NotHandled {
        /// Request method.
        method: Method,
        /// Request path.
        path: String,
    },

    /// The engine dropped the response without ending it.
    #[error("exchange aborted before a response was written")]
    Aborted,

    /// No response within the client's timeout.
    #[error("no response after {0:?}")]
    TimedOut(std::time::Duration),

    /// The body was not valid UTF-8.
    #[error("body is not UTF-8: {0}")]
    BodyNotUtf8(#[from] std::string::FromUtf8Error),

    /// JSON (de)serialisation failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

//! Conversions between hyper messages and the engine's transport types.

use std::io;

use bytes::Bytes;
use futures_util::{StreamExt, TryStreamExt};
use hermes_core::exchange::{CompletedResponse, InboundRequest};
use hermes_core::{BodyStream, RestError};
use http::{header, HeaderValue, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::{Body, Incoming};

/// Body type of every response the server writes.
pub type ResponseBody = Full<Bytes>;

/// A response as written to hyper.
pub type HttpResponse = Response<ResponseBody>;

/// Turns a hyper request into an engine request with a streaming body.
///
/// Requests whose body is known to be empty get no body stream at all.
pub fn to_inbound(request: Request<Incoming>) -> InboundRequest {
    let (parts, body) = request.into_parts();
    let body = (!body.is_end_stream()).then(|| body_stream(body));
    InboundRequest::from_parts(parts.method, &parts.uri, parts.headers, body)
}

fn body_stream(body: Incoming) -> BodyStream {
    body.into_data_stream()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
        .boxed()
}

/// Turns a response the engine completed into a hyper response.
pub fn from_completed(completed: CompletedResponse) -> HttpResponse {
    let mut response = Response::new(Full::new(completed.body));
    *response.status_mut() = completed.status;
    *response.headers_mut() = completed.headers;
    response
}

/// A response carrying the JSON envelope of `error`.
pub fn error_response(error: &RestError) -> HttpResponse {
    let body = serde_json::to_vec(&error.to_envelope(None)).unwrap_or_default();
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = error.status_code();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}

/// The default answer for requests no resource matches.
pub fn not_found(path: &str) -> HttpResponse {
    error_response(&RestError::not_found(format!("no resource for {path}")))
}

/// A 504 for requests that outlived the configured timeout.
pub fn timed_out() -> HttpResponse {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::GATEWAY_TIMEOUT;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderMap;

    #[test]
    fn test_from_completed_keeps_head() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        let response = from_completed(CompletedResponse {
            status: StatusCode::CREATED,
            headers,
            body: Bytes::from_static(b"made"),
        });
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");
    }

    #[tokio::test]
    async fn test_not_found_envelope() {
        let response = not_found("/missing");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let envelope: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(envelope["error"]["code"], "NOT_FOUND");
    }
}

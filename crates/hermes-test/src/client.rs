//! Driving a dispatcher without a network.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use hermes_handlers::{ApplicationBuilder, DeploymentError, Dispatcher};
use http::Method;
use serde::Serialize;

use crate::error::TestError;
use crate::exchange::MockExchange;
use crate::request::TestRequest;
use crate::response::TestResponse;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Sends requests straight into a [`Dispatcher`].
///
/// Each request goes through the same path a server would take: the
/// dispatcher runs the chain on the calling task and the response arrives
/// once the engine ends it. Must be used inside a tokio runtime.
///
/// ```rust,ignore
/// let client = TestClient::from_application(app())?;
/// client
///     .get("/widgets/1")
///     .accept("text/plain")
///     .send()
///     .await
///     .assert_status(StatusCode::OK)
///     .assert_text("widget 1");
/// ```
#[derive(Clone)]
#[must_use]
pub struct TestClient {
    dispatcher: Arc<Dispatcher>,
    default_headers: Vec<(String, String)>,
    timeout: Duration,
}

impl fmt::Debug for TestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestClient")
            .field("default_headers", &self.default_headers)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl TestClient {
    /// Wraps a built dispatcher.
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            default_headers: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Builds `application` and wraps the result.
    pub fn from_application(application: ApplicationBuilder) -> Result<Self, DeploymentError> {
        Ok(Self::new(application.build()?))
    }

    /// Adds a header to every request that does not set it itself.
    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// How long to wait for a response. Defaults to five seconds.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The wrapped dispatcher.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Starts a GET.
    pub fn get(&self, path: impl Into<String>) -> TestCall<'_> {
        self.call(TestRequest::get(path))
    }

    /// Starts a POST.
    pub fn post(&self, path: impl Into<String>) -> TestCall<'_> {
        self.call(TestRequest::post(path))
    }

    /// Starts a PUT.
    pub fn put(&self, path: impl Into<String>) -> TestCall<'_> {
        self.call(TestRequest::put(path))
    }

    /// Starts a DELETE.
    pub fn delete(&self, path: impl Into<String>) -> TestCall<'_> {
        self.call(TestRequest::delete(path))
    }

    /// Starts a HEAD.
    pub fn head(&self, path: impl Into<String>) -> TestCall<'_> {
        self.call(TestRequest::head(path))
    }

    /// Starts an OPTIONS.
    pub fn options(&self, path: impl Into<String>) -> TestCall<'_> {
        self.call(TestRequest::options(path))
    }

    /// Starts a request with any method.
    pub fn request(&self, method: Method, path: impl Into<String>) -> TestCall<'_> {
        self.call(TestRequest::new(method, path))
    }

    /// Wraps a prepared request.
    pub fn call(&self, request: TestRequest) -> TestCall<'_> {
        TestCall {
            client: self,
            request,
        }
    }

    /// Dispatches `request` and waits for the response.
    pub async fn execute(&self, request: TestRequest) -> Result<TestResponse, TestError> {
        let mut request = request;
        for (name, value) in &self.default_headers {
            if !request.has_header(name) {
                request = request.header(name.clone(), value.clone());
            }
        }

        MockExchange::new(request)
            .dispatch(&self.dispatcher)?
            .wait(self.timeout)
            .await
    }
}

/// A request bound to a [`TestClient`], sent with [`TestCall::send`].
#[must_use]
pub struct TestCall<'a> {
    client: &'a TestClient,
    request: TestRequest,
}

impl fmt::Debug for TestCall<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestCall")
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}

impl TestCall<'_> {
    /// Appends a query parameter.
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request = self.request.query(name, value);
        self
    }

    /// Appends a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request = self.request.header(name, value);
        self
    }

    /// Sets `Content-Type`.
    pub fn content_type(mut self, value: impl Into<String>) -> Self {
        self.request = self.request.content_type(value);
        self
    }

    /// Sets `Accept`.
    pub fn accept(mut self, value: impl Into<String>) -> Self {
        self.request = self.request.accept(value);
        self
    }

    /// Sets the body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.request = self.request.body(body);
        self
    }

    /// Sends the body in several chunks.
    pub fn chunks<I, B>(mut self, chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        self.request = self.request.chunks(chunks);
        self
    }

    /// Sets a JSON body.
    ///
    /// # Panics
    ///
    /// Panics if `value` cannot be serialised.
    pub fn json<T: Serialize>(mut self, value: &T) -> Self {
        self.request = match self.request.json(value) {
            Ok(request) => request,
            Err(e) => panic!("cannot serialise request body: {e}"),
        };
        self
    }

    /// Sends the request.
    ///
    /// # Panics
    ///
    /// Panics if no response arrives. Use [`TestCall::try_send`] to
    /// inspect that case.
    pub async fn send(self) -> TestResponse {
        match self.try_send().await {
            Ok(response) => response,
            Err(e) => panic!("request failed: {e}"),
        }
    }

    /// Sends the request, reporting a missing response as an error.
    pub async fn try_send(self) -> Result<TestResponse, TestError> {
        self.client.execute(self.request).await
    }
}

//! A single in-memory exchange.

use std::time::Duration;

use hermes_core::exchange::{ChannelResponse, CompletedResponse, InboundRequest};
use hermes_handlers::{Dispatch, Dispatcher};
use tokio::sync::oneshot::{self, error::TryRecvError};

use crate::error::TestError;
use crate::request::TestRequest;
use crate::response::TestResponse;

/// A request paired with a response sink whose result can be awaited.
///
/// ```rust,ignore
/// let pending = MockExchange::new(TestRequest::get("/widgets/1")).dispatch(&dispatcher)?;
/// // nothing written yet: the resource is waiting on a deferred value
/// assert!(pending.try_take()?.is_none());
/// completer.complete(Outcome::ok("late"));
/// let response = pending.wait(Duration::from_secs(1)).await?;
/// ```
#[derive(Debug)]
pub struct MockExchange {
    request: InboundRequest,
    response: ChannelResponse,
    completed: oneshot::Receiver<CompletedResponse>,
}

impl MockExchange {
    /// Prepares an exchange for `request`.
    pub fn new(request: TestRequest) -> Self {
        let (response, completed) = ChannelResponse::new();
        Self {
            request: request.into_inbound(),
            response,
            completed,
        }
    }

    /// Hands the exchange to `dispatcher`.
    ///
    /// The chain runs on the calling task until it completes or first
    /// suspends. Fails with [`TestError::NotHandled`] when no resource
    /// claims the path.
    pub fn dispatch(self, dispatcher: &Dispatcher) -> Result<PendingResponse, TestError> {
        match dispatcher.dispatch(Box::new(self.request), Box::new(self.response)) {
            Dispatch::Handled => Ok(PendingResponse {
                completed: self.completed,
            }),
            Dispatch::NotHandled { request, .. } => Err(TestError::NotHandled {
                method: request.method().clone(),
                path: request.path().to_string(),
            }),
        }
    }
}

/// The response side of a dispatched [`MockExchange`].
#[derive(Debug)]
pub struct PendingResponse {
    completed: oneshot::Receiver<CompletedResponse>,
}

impl PendingResponse {
    /// Returns the response if the engine already ended it.
    pub fn try_take(&mut self) -> Result<Option<TestResponse>, TestError> {
        match self.completed.try_recv() {
            Ok(response) => Ok(Some(response.into())),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Closed) => Err(TestError::Aborted),
        }
    }

    /// Waits up to `timeout` for the response.
    pub async fn wait(self, timeout: Duration) -> Result<TestResponse, TestError> {
        match tokio::time::timeout(timeout, self.completed).await {
            Ok(Ok(response)) => Ok(response.into()),
            Ok(Err(_)) => Err(TestError::Aborted),
            Err(_) => Err(TestError::TimedOut(timeout)),
        }
    }
}

//! The per-request state machine.
//!
//! A [`RequestContext`] walks its handler chain one step at a time. A step
//! may finish, fail, swap the chain ([`RequestContext::restart`]) or park
//! the request ([`RequestContext::suspend`]). A parked context is owned by
//! its suspension slot until the matching [`ResumeHandle`] fires, so at most
//! one thread ever touches it.

use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use bytes::Bytes;
use http::{Extensions, HeaderMap, Method, StatusCode};
use mime::Mime;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::body::RequestBody;
use crate::deployment::Deployment;
use crate::error::RestError;
use crate::executor::Executor;
use crate::handler::HandlerChain;
use crate::resource::RuntimeResource;
use crate::response::RestResponse;
use crate::spi::{BodyStream, ServerHttpRequest, ServerHttpResponse};
use crate::value::{Arguments, Returned};

/// A unique identifier for each request, using UUID v7.
///
/// # Example
///
/// ```
/// use hermes_core::RequestId;
///
/// let id = RequestId::new();
/// assert_eq!(id.to_string().len(), 36);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new time-ordered request ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

type ResumeFn = Box<dyn FnOnce(&mut RequestContext) -> Result<(), RestError> + Send>;
type Closeable = Box<dyn FnOnce() + Send>;

enum Action {
    Continue,
    With(ResumeFn),
    Fail(RestError),
    Abort,
}

struct Resumption {
    executor: Option<Arc<dyn Executor>>,
    action: Action,
}

enum Slot {
    /// Suspended; the suspending step has not returned yet.
    Pending,
    /// Suspended and yielded.
    Parked(Box<RequestContext>),
    /// Resumed before the suspending step returned.
    Resumed(Resumption),
    /// Resumed, or cancelled by a failure.
    Done,
}

enum Step {
    Continue,
    Stop,
}

/// The one-shot continuation of a suspended request.
///
/// Every method consumes the handle, so a suspension is resumed at most
/// once. Dropping it unused counts as a transport abort: the request is
/// discarded without a response.
#[must_use = "a suspended request only continues through its resume handle"]
pub struct ResumeHandle {
    slot: Option<Arc<Mutex<Slot>>>,
}

impl fmt::Debug for ResumeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResumeHandle")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl ResumeHandle {
    /// Continues with the next step on the resuming thread.
    pub fn resume(self) {
        self.fire(None, Action::Continue);
    }

    /// Runs `f` against the context, then continues on the resuming thread.
    /// An error from `f` goes to the abort chain.
    pub fn resume_with<F>(self, f: F)
    where
        F: FnOnce(&mut RequestContext) -> Result<(), RestError> + Send + 'static,
    {
        self.fire(None, Action::With(Box::new(f)));
    }

    /// Records `error` and continues with the abort chain.
    pub fn resume_error(self, error: RestError) {
        self.fire(None, Action::Fail(error));
    }

    /// Continues with the next step on `executor`.
    pub fn resume_on(self, executor: Arc<dyn Executor>) {
        self.fire(Some(executor), Action::Continue);
    }

    /// Runs `f` and continues, both on `executor`.
    pub fn resume_on_with<F>(self, executor: Arc<dyn Executor>, f: F)
    where
        F: FnOnce(&mut RequestContext) -> Result<(), RestError> + Send + 'static,
    {
        self.fire(Some(executor), Action::With(Box::new(f)));
    }

    /// Discards the request without writing anything.
    pub fn abort(self) {
        self.fire(None, Action::Abort);
    }

    /// Whether the request has already failed or been discarded, making
    /// this handle a no-op.
    pub fn is_cancelled(&self) -> bool {
        self.slot
            .as_ref()
            .map_or(true, |slot| matches!(*slot.lock(), Slot::Done))
    }

    fn fire(mut self, executor: Option<Arc<dyn Executor>>, action: Action) {
        if let Some(slot) = self.slot.take() {
            deliver(&slot, Resumption { executor, action });
        }
    }
}

impl Drop for ResumeHandle {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            tracing::debug!("Resume handle dropped unused; discarding request");
            deliver(
                &slot,
                Resumption {
                    executor: None,
                    action: Action::Abort,
                },
            );
        }
    }
}

fn deliver(slot: &Mutex<Slot>, resumption: Resumption) {
    let mut guard = slot.lock();
    match mem::replace(&mut *guard, Slot::Done) {
        Slot::Pending => *guard = Slot::Resumed(resumption),
        Slot::Parked(ctx) => {
            drop(guard);
            ctx.continue_with(resumption);
        }
        Slot::Resumed(earlier) => *guard = Slot::Resumed(earlier),
        Slot::Done => {}
    }
}

struct PreviousResource {
    target: Arc<RuntimeResource>,
    base: usize,
}

/// Per-request state threaded through a handler chain.
///
/// Handlers receive `&mut RequestContext` and communicate exclusively
/// through it: parameter slots, the invocation result, the response being
/// shaped, the recorded failure and the request body.
pub struct RequestContext {
    id: RequestId,
    span: tracing::Span,
    deployment: Arc<Deployment>,
    request: Box<dyn ServerHttpRequest>,
    exchange: Box<dyn ServerHttpResponse>,
    method: Method,
    path: String,

    target: Arc<RuntimeResource>,
    chain: HandlerChain,
    position: usize,
    in_abort_chain: bool,
    on_event_loop: bool,
    suspension: Option<Arc<Mutex<Slot>>>,

    path_params: Vec<String>,
    path_param_base: usize,
    previous: Vec<PreviousResource>,
    remaining_path: String,

    parameters: Vec<Option<Box<dyn Any + Send>>>,
    instance: Option<Arc<dyn Any + Send + Sync>>,
    closeables: Vec<Closeable>,
    body: RequestBody,
    result: Option<Returned>,
    response: Option<RestResponse>,
    error: Option<RestError>,
    produces: Option<Mime>,
    extensions: Extensions,
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("id", &self.id)
            .field("method", &self.method)
            .field("path", &self.path)
            .field("target", &self.target.name())
            .field("position", &self.position)
            .field("in_abort_chain", &self.in_abort_chain)
            .finish_non_exhaustive()
    }
}

impl RequestContext {
    /// Seeds a context that will run `target`'s chain against the exchange.
    ///
    /// The caller is assumed to be on the event loop.
    pub fn new(
        deployment: Arc<Deployment>,
        target: Arc<RuntimeResource>,
        request: Box<dyn ServerHttpRequest>,
        exchange: Box<dyn ServerHttpResponse>,
    ) -> Box<Self> {
        let id = RequestId::new();
        let method = request.method().clone();
        let path = request.path().to_string();
        let span = tracing::info_span!(
            "request",
            request_id = %id,
            method = %method,
            path = %path
        );
        Box::new(Self {
            id,
            span,
            deployment,
            request,
            exchange,
            method,
            remaining_path: path.clone(),
            path,
            chain: target.chain().clone(),
            parameters: empty_slots(target.parameter_count()),
            target,
            position: 0,
            in_abort_chain: false,
            on_event_loop: true,
            suspension: None,
            path_params: Vec::new(),
            path_param_base: 0,
            previous: Vec::new(),
            instance: None,
            closeables: Vec::new(),
            body: RequestBody::Empty,
            result: None,
            response: None,
            error: None,
            produces: None,
            extensions: Extensions::new(),
        })
    }

    /// Runs the chain from the current position until it completes, fails
    /// terminally or suspends.
    pub fn run(self: Box<Self>) {
        self.drive(None);
    }

    fn continue_with(mut self: Box<Self>, resumption: Resumption) {
        match resumption.executor {
            None => self.drive(Some(resumption.action)),
            Some(executor) => {
                self.on_event_loop = executor.is_event_loop();
                let action = resumption.action;
                executor.execute(Box::new(move || self.drive(Some(action))));
            }
        }
    }

    fn drive(mut self: Box<Self>, resumed: Option<Action>) {
        let span = self.span.clone();
        let _entered = span.enter();

        if let Some(action) = resumed {
            if let Step::Stop = self.apply(action) {
                return;
            }
        }

        loop {
            if let Some(slot) = self.suspension.take() {
                let mut guard = slot.lock();
                match mem::replace(&mut *guard, Slot::Done) {
                    Slot::Pending => {
                        tracing::trace!(position = self.position, "Request suspended");
                        *guard = Slot::Parked(self);
                        return;
                    }
                    Slot::Resumed(Resumption {
                        executor: Some(executor),
                        action,
                    }) => {
                        drop(guard);
                        self.on_event_loop = executor.is_event_loop();
                        executor.execute(Box::new(move || self.drive(Some(action))));
                        return;
                    }
                    Slot::Resumed(Resumption {
                        executor: None,
                        action,
                    }) => {
                        drop(guard);
                        if let Step::Stop = self.apply(action) {
                            return;
                        }
                    }
                    other => *guard = other,
                }
            }

            if self.position >= self.chain.len() {
                self.finish();
                return;
            }

            let handler = Arc::clone(&self.chain[self.position]);
            if handler.requires_event_loop() && !self.on_event_loop {
                tracing::trace!(handler = handler.name(), "Moving back to the event loop");
                let executor = Arc::clone(self.deployment.executors().event_loop());
                self.on_event_loop = true;
                executor.execute(Box::new(move || self.run()));
                return;
            }

            self.position += 1;
            let result = panic::catch_unwind(AssertUnwindSafe(|| handler.handle(&mut self)))
                .unwrap_or_else(|payload| Err(panicked(handler.name(), &*payload)));
            if let Err(error) = result {
                if let Step::Stop = self.handle_failure(error) {
                    return;
                }
            }
        }
    }

    fn apply(&mut self, action: Action) -> Step {
        match action {
            Action::Continue => Step::Continue,
            Action::With(f) => {
                match panic::catch_unwind(AssertUnwindSafe(|| f(&mut *self))) {
                    Ok(Ok(())) => Step::Continue,
                    Ok(Err(error)) => self.handle_failure(error),
                    Err(payload) => self.handle_failure(panicked("resume callback", &*payload)),
                }
            }
            Action::Fail(error) => self.handle_failure(error),
            Action::Abort => {
                self.discard();
                Step::Stop
            }
        }
    }

    /// Records a failure and decides where execution goes next.
    fn handle_failure(&mut self, error: RestError) -> Step {
        self.cancel_suspension();

        if error.is_aborted() {
            tracing::debug!("Request aborted by the transport");
            self.discard();
            return Step::Stop;
        }
        if self.exchange.is_committed() {
            tracing::error!(error = %error, "Failure after the response was committed");
            self.exchange.abort();
            return Step::Stop;
        }
        if self.in_abort_chain {
            tracing::error!(error = %error, "Failure while producing an error response");
            self.send_bare(StatusCode::INTERNAL_SERVER_ERROR);
            return Step::Stop;
        }

        tracing::debug!(
            error = %error,
            resource = self.target.name(),
            position = self.position,
            "Request failed"
        );
        self.error = Some(error);
        self.enter_abort_chain();
        Step::Continue
    }

    fn cancel_suspension(&mut self) {
        if let Some(slot) = self.suspension.take() {
            *slot.lock() = Slot::Done;
        }
    }

    fn enter_abort_chain(&mut self) {
        self.chain = self.target.abort_chain().clone();
        self.position = 0;
        self.in_abort_chain = true;
        self.result = None;
    }

    fn discard(&mut self) {
        self.result = None;
        self.response = None;
        self.exchange.abort();
    }

    fn send_bare(&mut self, status: StatusCode) {
        self.exchange.set_status(status);
        self.exchange.headers_mut().clear();
        if let Err(error) = self.exchange.end(Bytes::new()) {
            tracing::warn!(error = %error, "Could not send fallback response");
            self.exchange.abort();
        }
    }

    fn finish(&mut self) {
        if !self.exchange.is_committed() && !self.exchange.is_closed() {
            tracing::warn!(
                resource = self.target.name(),
                "Handler chain ended without a response"
            );
            self.exchange.abort();
        }
        tracing::debug!("Request complete");
    }

    /// Parks the request after the current step returns.
    ///
    /// The step must arrange for the handle to be used exactly once. If it
    /// is used before the step returns, execution simply continues.
    pub fn suspend(&mut self) -> ResumeHandle {
        let slot = Arc::new(Mutex::new(Slot::Pending));
        self.suspension = Some(Arc::clone(&slot));
        ResumeHandle { slot: Some(slot) }
    }

    /// Whether the current step has suspended the request.
    pub fn is_suspended(&self) -> bool {
        self.suspension.is_some()
    }

    /// Switches to `target`'s chain from its first step, within the same
    /// run. Bound path parameters are kept.
    pub fn restart(&mut self, target: Arc<RuntimeResource>) {
        self.restart_at(target, 0);
    }

    /// Switches to `target`'s chain at `position`.
    pub fn restart_at(&mut self, target: Arc<RuntimeResource>, position: usize) {
        tracing::trace!(from = self.target.name(), to = target.name(), position, "Restarting");
        self.parameters = empty_slots(target.parameter_count());
        self.chain = target.chain().clone();
        self.position = position;
        self.in_abort_chain = false;
        self.result = None;
        self.produces = None;
        self.target = target;
    }

    /// Binds a deeper level of path parameters after the ones already
    /// bound, and records the path suffix still to be matched.
    pub fn push_path_params<I>(&mut self, values: I, remaining: impl Into<String>)
    where
        I: IntoIterator<Item = String>,
    {
        self.previous.push(PreviousResource {
            target: Arc::clone(&self.target),
            base: self.path_param_base,
        });
        self.path_param_base = self.path_params.len();
        self.path_params.extend(values);
        self.remaining_path = remaining.into();
    }

    /// [`push_path_params`](Self::push_path_params) followed by
    /// [`restart`](Self::restart).
    pub fn enter_resource<I>(
        &mut self,
        target: Arc<RuntimeResource>,
        values: I,
        remaining: impl Into<String>,
    ) where
        I: IntoIterator<Item = String>,
    {
        self.push_path_params(values, remaining);
        self.restart(target);
    }

    /// Replaces the response and jumps to the abort chain without a
    /// failure, so it is shaped, filtered and written as is.
    pub fn abort_with(&mut self, response: RestResponse) {
        self.cancel_suspension();
        self.response = Some(response);
        if !self.in_abort_chain {
            self.enter_abort_chain();
        }
    }

    /// The request ID.
    pub fn request_id(&self) -> RequestId {
        self.id
    }

    /// The request's tracing span.
    pub fn span(&self) -> &tracing::Span {
        &self.span
    }

    /// The deployment.
    pub fn deployment(&self) -> &Arc<Deployment> {
        &self.deployment
    }

    /// The resource whose chain is running.
    pub fn target(&self) -> &Arc<RuntimeResource> {
        &self.target
    }

    /// Index of the next step to run.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Whether the abort chain is running.
    pub fn in_abort_chain(&self) -> bool {
        self.in_abort_chain
    }

    /// Whether the context is on the event loop.
    pub fn on_event_loop(&self) -> bool {
        self.on_event_loop
    }

    /// The (possibly rewritten) request method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Rewrites the method used for routing.
    pub fn set_method(&mut self, method: Method) {
        self.method = method;
    }

    /// The (possibly rewritten) request path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Rewrites the path used for routing.
    pub fn set_path(&mut self, path: impl Into<String>) {
        self.path = path.into();
        self.remaining_path = self.path.clone();
    }

    /// Request headers.
    pub fn headers(&self) -> &HeaderMap {
        self.request.headers()
    }

    /// A request header as text.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.request.headers().get(name)?.to_str().ok()
    }

    /// The raw query string.
    pub fn query(&self) -> Option<&str> {
        self.request.query()
    }

    /// The first decoded value of query parameter `name`.
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.query_params(name).into_iter().next()
    }

    /// Every decoded value of query parameter `name`, in order.
    pub fn query_params(&self, name: &str) -> Vec<String> {
        let Some(query) = self.request.query() else {
            return Vec::new();
        };
        query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .filter_map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                (decode_component(key) == name).then(|| decode_component(value))
            })
            .collect()
    }

    /// Takes the raw body stream from the transport.
    pub fn take_body_stream(&mut self) -> Option<BodyStream> {
        self.request.take_body()
    }

    /// The response sink.
    pub fn exchange(&mut self) -> &mut dyn ServerHttpResponse {
        self.exchange.as_mut()
    }

    /// Whether the response sink has committed.
    pub fn is_committed(&self) -> bool {
        self.exchange.is_committed()
    }

    /// Path parameter `index` of the current resource.
    pub fn path_param(&self, index: usize) -> Option<&str> {
        self.path_params
            .get(self.path_param_base + index)
            .map(String::as_str)
    }

    /// Path parameter `name`, searched in the current resource first, then
    /// outward through enclosing resources.
    pub fn path_param_named(&self, name: &str) -> Option<&str> {
        let own = position_of(&self.target, name).map(|i| self.path_param_base + i);
        let index = own.or_else(|| {
            self.previous
                .iter()
                .rev()
                .find_map(|prev| position_of(&prev.target, name).map(|i| prev.base + i))
        })?;
        self.path_params.get(index).map(String::as_str)
    }

    /// Every bound path parameter, outermost first.
    pub fn path_params(&self) -> &[String] {
        &self.path_params
    }

    /// The path suffix not consumed by routing so far.
    pub fn remaining_path(&self) -> &str {
        &self.remaining_path
    }

    /// Stores a converted parameter.
    pub fn set_parameter(&mut self, index: usize, value: Box<dyn Any + Send>) -> Result<(), RestError> {
        let slot = self.parameters.get_mut(index).ok_or_else(|| {
            RestError::internal(format!(
                "{} has no parameter slot {index}",
                self.target.name()
            ))
        })?;
        *slot = Some(value);
        Ok(())
    }

    /// Borrows parameter slot `index` as `T`.
    pub fn parameter<T: Any>(&self, index: usize) -> Option<&T> {
        self.parameters.get(index)?.as_ref()?.downcast_ref()
    }

    /// The invocation view over the instance and parameter slots.
    pub fn arguments(&mut self) -> Arguments<'_> {
        Arguments::new(self.instance.as_ref(), &mut self.parameters)
    }

    /// The resource instance.
    pub fn instance(&self) -> Option<&Arc<dyn Any + Send + Sync>> {
        self.instance.as_ref()
    }

    /// Sets the resource instance.
    pub fn set_instance(&mut self, instance: Arc<dyn Any + Send + Sync>) {
        self.instance = Some(instance);
    }

    /// Registers cleanup to run when the context ends, however it ends.
    /// Cleanups run newest first.
    pub fn add_closeable(&mut self, close: impl FnOnce() + Send + 'static) {
        self.closeables.push(Box::new(close));
    }

    /// The request body after the input stage.
    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    /// Stores the request body.
    pub fn set_body(&mut self, body: RequestBody) {
        self.body = body;
    }

    /// Takes the request body, leaving it empty.
    pub fn take_body(&mut self) -> RequestBody {
        mem::take(&mut self.body)
    }

    /// The invocation result.
    pub fn result(&self) -> Option<&Returned> {
        self.result.as_ref()
    }

    /// Stores the invocation result.
    pub fn set_result(&mut self, result: Returned) {
        self.result = Some(result);
    }

    /// Takes the invocation result.
    pub fn take_result(&mut self) -> Option<Returned> {
        self.result.take()
    }

    /// The response being shaped.
    pub fn response(&self) -> Option<&RestResponse> {
        self.response.as_ref()
    }

    /// The response being shaped, mutably.
    pub fn response_mut(&mut self) -> Option<&mut RestResponse> {
        self.response.as_mut()
    }

    /// Stores the response.
    pub fn set_response(&mut self, response: RestResponse) {
        self.response = Some(response);
    }

    /// Takes the response.
    pub fn take_response(&mut self) -> Option<RestResponse> {
        self.response.take()
    }

    /// The recorded failure.
    pub fn error(&self) -> Option<&RestError> {
        self.error.as_ref()
    }

    /// Takes the recorded failure.
    pub fn take_error(&mut self) -> Option<RestError> {
        self.error.take()
    }

    /// The negotiated response media type.
    pub fn produces(&self) -> Option<&Mime> {
        self.produces.as_ref()
    }

    /// Sets the negotiated response media type.
    pub fn set_produces(&mut self, media_type: Mime) {
        self.produces = Some(media_type);
    }

    /// Typed per-request storage.
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// Typed per-request storage, mutably.
    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }
}

impl Drop for RequestContext {
    fn drop(&mut self) {
        for close in self.closeables.drain(..).rev() {
            if panic::catch_unwind(AssertUnwindSafe(close)).is_err() {
                tracing::error!(request_id = %self.id, "Instance cleanup panicked");
            }
        }
    }
}

fn empty_slots(count: usize) -> Vec<Option<Box<dyn Any + Send>>> {
    std::iter::repeat_with(|| None).take(count).collect()
}

fn position_of(resource: &RuntimeResource, name: &str) -> Option<usize> {
    resource.path_param_names().iter().position(|n| n == name)
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    let decoded = urlencoding::decode(&spaced).ok().map(Cow::into_owned);
    decoded.unwrap_or(spaced)
}

fn panicked(what: &str, payload: &(dyn Any + Send)) -> RestError {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());
    RestError::internal(format!("{what} panicked: {detail}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::{ChannelResponse, CompletedResponse, InboundRequest};
    use crate::executor::Executors;
    use crate::handler::{chain, handler_fn, RestHandler};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;

    /// Ends the exchange with the response status, or 500 with the error.
    fn writer() -> Arc<dyn RestHandler> {
        handler_fn(|ctx| {
            let status = match (ctx.take_error(), ctx.take_response()) {
                (Some(error), _) => error.status_code(),
                (None, Some(response)) => response.status(),
                (None, None) => StatusCode::OK,
            };
            ctx.exchange().set_status(status);
            ctx.exchange().end(Bytes::new())
        })
    }

    fn resource(handlers: Vec<Arc<dyn RestHandler>>) -> Arc<RuntimeResource> {
        Arc::new(
            RuntimeResource::builder("test", Method::GET, "/")
                .chain(chain(handlers))
                .abort_chain(chain(vec![writer()]))
                .parameter_count(2)
                .build(),
        )
    }

    fn start(
        target: Arc<RuntimeResource>,
    ) -> (Box<RequestContext>, oneshot::Receiver<CompletedResponse>) {
        let deployment = Arc::new(Deployment::builder().executors(Executors::inline()).build());
        let (exchange, rx) = ChannelResponse::new();
        let ctx = RequestContext::new(
            deployment,
            target,
            Box::new(InboundRequest::new(Method::GET, "/a?x=1&name=J%C3%BCrgen+K")),
            Box::new(exchange),
        );
        (ctx, rx)
    }

    fn counter(count: &Arc<AtomicUsize>) -> Arc<dyn RestHandler> {
        let count = count.clone();
        handler_fn(move |_| {
            count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    #[test]
    fn test_runs_chain_in_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let (a, b) = (order.clone(), order.clone());
        let target = resource(vec![
            handler_fn(move |_| {
                a.lock().push(1);
                Ok(())
            }),
            handler_fn(move |_| {
                b.lock().push(2);
                Ok(())
            }),
            writer(),
        ]);
        let (ctx, mut rx) = start(target);
        ctx.run();
        assert_eq!(*order.lock(), vec![1, 2]);
        assert_eq!(rx.try_recv().unwrap().status, StatusCode::OK);
    }

    #[test]
    fn test_failure_switches_to_abort_chain() {
        let after = Arc::new(AtomicUsize::new(0));
        let target = resource(vec![
            handler_fn(|_| Err(RestError::not_found("nope"))),
            counter(&after),
            writer(),
        ]);
        let (ctx, mut rx) = start(target);
        ctx.run();
        assert_eq!(after.load(Ordering::SeqCst), 0);
        assert_eq!(rx.try_recv().unwrap().status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_panic_becomes_internal_error() {
        let target = resource(vec![handler_fn(|_| panic!("boom")), writer()]);
        let (ctx, mut rx) = start(target);
        ctx.run();
        assert_eq!(
            rx.try_recv().unwrap().status,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_resume_continues_after_suspending_step() {
        let stash: Arc<Mutex<Option<ResumeHandle>>> = Arc::new(Mutex::new(None));
        let runs = Arc::new(AtomicUsize::new(0));
        let after = Arc::new(AtomicUsize::new(0));
        let (s, r) = (stash.clone(), runs.clone());
        let target = resource(vec![
            handler_fn(move |ctx| {
                r.fetch_add(1, Ordering::SeqCst);
                *s.lock() = Some(ctx.suspend());
                Ok(())
            }),
            counter(&after),
            writer(),
        ]);
        let (ctx, mut rx) = start(target);
        ctx.run();
        assert!(rx.try_recv().is_err());
        assert_eq!(after.load(Ordering::SeqCst), 0);

        let handle = stash.lock().take().unwrap();
        assert!(!handle.is_cancelled());
        handle.resume();

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(after.load(Ordering::SeqCst), 1);
        assert_eq!(rx.try_recv().unwrap().status, StatusCode::OK);
    }

    #[test]
    fn test_resume_before_return_continues_inline() {
        let after = Arc::new(AtomicUsize::new(0));
        let target = resource(vec![
            handler_fn(|ctx| {
                ctx.suspend().resume_with(|ctx| {
                    ctx.set_parameter(0, Box::new(5_u32))?;
                    Ok(())
                });
                Ok(())
            }),
            handler_fn(|ctx| {
                assert_eq!(ctx.parameter::<u32>(0), Some(&5));
                Ok(())
            }),
            counter(&after),
            writer(),
        ]);
        let (ctx, mut rx) = start(target);
        ctx.run();
        assert_eq!(after.load(Ordering::SeqCst), 1);
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn test_resume_error_skips_remaining_steps() {
        let stash: Arc<Mutex<Option<ResumeHandle>>> = Arc::new(Mutex::new(None));
        let invoked = Arc::new(AtomicUsize::new(0));
        let s = stash.clone();
        let target = resource(vec![
            handler_fn(move |ctx| {
                *s.lock() = Some(ctx.suspend());
                Ok(())
            }),
            counter(&invoked),
            writer(),
        ]);
        let (ctx, mut rx) = start(target);
        ctx.run();
        let handle = stash.lock().take().unwrap();
        handle.resume_error(RestError::bad_request("late failure"));
        assert_eq!(invoked.load(Ordering::SeqCst), 0);
        assert_eq!(rx.try_recv().unwrap().status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_dropped_handle_discards_request() {
        let closed = Arc::new(AtomicUsize::new(0));
        let c = closed.clone();
        let target = resource(vec![
            handler_fn(move |ctx| {
                let c = c.clone();
                ctx.add_closeable(move || {
                    c.fetch_add(1, Ordering::SeqCst);
                });
                drop(ctx.suspend());
                Ok(())
            }),
            writer(),
        ]);
        let (ctx, rx) = start(target);
        ctx.run();
        assert_eq!(closed.load(Ordering::SeqCst), 1);
        assert!(tokio_test::block_on(rx).is_err());
    }

    #[test]
    fn test_failure_cancels_pending_suspension() {
        let stash: Arc<Mutex<Option<ResumeHandle>>> = Arc::new(Mutex::new(None));
        let s = stash.clone();
        let target = resource(vec![
            handler_fn(move |ctx| {
                *s.lock() = Some(ctx.suspend());
                Err(RestError::internal("gave up"))
            }),
            writer(),
        ]);
        let (ctx, mut rx) = start(target);
        ctx.run();
        assert_eq!(
            rx.try_recv().unwrap().status,
            StatusCode::INTERNAL_SERVER_ERROR
        );
        let handle = stash.lock().take().unwrap();
        assert!(handle.is_cancelled());
        handle.resume();
    }

    #[test]
    fn test_failure_in_abort_chain_sends_bare_500() {
        let target = Arc::new(
            RuntimeResource::builder("broken", Method::GET, "/")
                .chain(chain(vec![handler_fn(|_| Err(RestError::not_found("x")))]))
                .abort_chain(chain(vec![handler_fn(|_| {
                    Err(RestError::internal("mapper broke"))
                })]))
                .build(),
        );
        let (ctx, mut rx) = start(target);
        ctx.run();
        let done = rx.try_recv().unwrap();
        assert_eq!(done.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(done.body.is_empty());
    }

    #[test]
    fn test_failure_after_commit_aborts() {
        let target = resource(vec![
            handler_fn(|ctx| ctx.exchange().end(Bytes::from_static(b"partial"))),
            handler_fn(|_| Err(RestError::internal("too late"))),
        ]);
        let (ctx, mut rx) = start(target);
        ctx.run();
        assert_eq!(&rx.try_recv().unwrap().body[..], b"partial");
    }

    #[test]
    fn test_abort_with_skips_to_abort_chain() {
        let after = Arc::new(AtomicUsize::new(0));
        let target = resource(vec![
            handler_fn(|ctx| {
                ctx.abort_with(RestResponse::new(StatusCode::FORBIDDEN));
                Ok(())
            }),
            counter(&after),
        ]);
        let (ctx, mut rx) = start(target);
        ctx.run();
        assert_eq!(after.load(Ordering::SeqCst), 0);
        assert_eq!(rx.try_recv().unwrap().status, StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_restart_keeps_outer_path_params() {
        let inner = Arc::new(
            RuntimeResource::builder("inner", Method::GET, "/history/{entry}")
                .path_params(vec!["entry".into()])
                .chain(chain(vec![
                    handler_fn(|ctx| {
                        assert_eq!(ctx.path_param(0), Some("7"));
                        assert_eq!(ctx.path_param_named("entry"), Some("7"));
                        assert_eq!(ctx.path_param_named("id"), Some("42"));
                        assert_eq!(ctx.path_params(), ["42", "7"]);
                        assert_eq!(ctx.remaining_path(), "");
                        Ok(())
                    }),
                    writer(),
                ]))
                .abort_chain(chain(vec![writer()]))
                .build(),
        );
        let outer = Arc::new(
            RuntimeResource::builder("outer", Method::GET, "/widgets/{id}")
                .path_params(vec!["id".into()])
                .chain(chain(vec![handler_fn(move |ctx| {
                    assert_eq!(ctx.path_param_named("id"), Some("42"));
                    ctx.enter_resource(inner.clone(), vec!["7".to_string()], "");
                    Ok(())
                })]))
                .abort_chain(chain(vec![writer()]))
                .build(),
        );
        let router = Arc::new(
            RuntimeResource::builder("router", Method::GET, "/")
                .chain(chain(vec![handler_fn(move |ctx| {
                    ctx.enter_resource(outer.clone(), vec!["42".to_string()], "/history/7");
                    Ok(())
                })]))
                .build(),
        );
        let (ctx, mut rx) = start(router);
        ctx.run();
        assert_eq!(rx.try_recv().unwrap().status, StatusCode::OK);
    }

    #[test]
    fn test_query_params_decode() {
        let (ctx, _rx) = start(resource(vec![]));
        assert_eq!(ctx.query_param("x").as_deref(), Some("1"));
        assert_eq!(ctx.query_param("name").as_deref(), Some("Jürgen K"));
        assert_eq!(ctx.query_param("missing"), None);
    }

    #[test]
    fn test_chain_without_writer_aborts_exchange() {
        let (ctx, rx) = start(resource(vec![handler_fn(|_| Ok(()))]));
        ctx.run();
        assert!(tokio_test::block_on(rx).is_err());
    }

    #[test]
    fn test_closeables_run_newest_first() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let o = order.clone();
        let target = resource(vec![
            handler_fn(move |ctx| {
                for i in 0..3 {
                    let o = o.clone();
                    ctx.add_closeable(move || o.lock().push(i));
                }
                Ok(())
            }),
            writer(),
        ]);
        let (ctx, _rx) = start(target);
        ctx.run();
        assert_eq!(*order.lock(), vec![2, 1, 0]);
    }

    struct LoopOnly(Arc<AtomicUsize>);

    impl RestHandler for LoopOnly {
        fn handle(&self, ctx: &mut RequestContext) -> Result<(), RestError> {
            assert!(ctx.on_event_loop());
            self.0.fetch_add(1, Ordering::SeqCst);
            ctx.exchange().end(Bytes::new())
        }

        fn requires_event_loop(&self) -> bool {
            true
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_offload_then_return_to_event_loop() {
        let deployment = Arc::new(Deployment::builder().build());
        let blocking = Arc::clone(deployment.executors().blocking());
        let writes = Arc::new(AtomicUsize::new(0));
        let target = Arc::new(
            RuntimeResource::builder("offload", Method::GET, "/")
                .chain(chain(vec![
                    handler_fn(move |ctx| {
                        ctx.suspend().resume_on(blocking.clone());
                        Ok(())
                    }),
                    handler_fn(|ctx| {
                        assert!(!ctx.on_event_loop());
                        Ok(())
                    }),
                    Arc::new(LoopOnly(writes.clone())),
                ]))
                .build(),
        );
        let (exchange, rx) = ChannelResponse::new();
        let ctx = RequestContext::new(
            deployment,
            target,
            Box::new(InboundRequest::new(Method::GET, "/")),
            Box::new(exchange),
        );
        ctx.run();
        assert_eq!(rx.await.unwrap().status, StatusCode::OK);
        assert_eq!(writes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_resume_from_another_task() {
        let deployment = Arc::new(Deployment::builder().build());
        let target = Arc::new(
            RuntimeResource::builder("async", Method::GET, "/")
                .parameter_count(1)
                .chain(chain(vec![
                    handler_fn(|ctx| {
                        let handle = ctx.suspend();
                        ctx.deployment().spawn(async move {
                            tokio::task::yield_now().await;
                            handle.resume_with(|ctx| ctx.set_parameter(0, Box::new("late")));
                        })
                    }),
                    handler_fn(|ctx| {
                        let value = *ctx.parameter::<&str>(0).unwrap();
                        ctx.exchange().end(Bytes::from(value))
                    }),
                ]))
                .build(),
        );
        let (exchange, rx) = ChannelResponse::new();
        RequestContext::new(
            deployment,
            target,
            Box::new(InboundRequest::new(Method::GET, "/")),
            Box::new(exchange),
        )
        .run();
        assert_eq!(&rx.await.unwrap().body[..], b"late");
    }
}

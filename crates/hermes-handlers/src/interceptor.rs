//! Request and response filters.
//!
//! Filters are registered once per deployment with a priority. Request
//! filters run in ascending priority, response filters in descending
//! priority. Every filter is closed exactly once when the deployment shuts
//! down.

use std::fmt;
use std::sync::Arc;

use hermes_core::{RequestContext, RestError, RestResponse, ShutdownHooks};

/// Default priority for filters registered without one.
pub const DEFAULT_PRIORITY: i32 = 5000;

/// Inspects or rejects a request.
///
/// Calling [`RequestContext::abort_with`] short-circuits the chain: the
/// given response is shaped and written, nothing else runs.
pub trait RequestFilter: Send + Sync {
    /// Filters the request.
    fn filter(&self, ctx: &mut RequestContext) -> Result<(), RestError>;

    /// Releases resources held by the filter.
    fn close(&self) {}
}

/// Inspects or rewrites the outgoing response.
pub trait ResponseFilter: Send + Sync {
    /// Filters the response.
    fn filter(&self, ctx: &mut RequestContext, response: &mut RestResponse) -> Result<(), RestError>;

    /// Releases resources held by the filter.
    fn close(&self) {}
}

struct FnRequestFilter<F>(F);

impl<F> RequestFilter for FnRequestFilter<F>
where
    F: Fn(&mut RequestContext) -> Result<(), RestError> + Send + Sync,
{
    fn filter(&self, ctx: &mut RequestContext) -> Result<(), RestError> {
        (self.0)(ctx)
    }
}

struct FnResponseFilter<F>(F);

impl<F> ResponseFilter for FnResponseFilter<F>
where
    F: Fn(&mut RequestContext, &mut RestResponse) -> Result<(), RestError> + Send + Sync,
{
    fn filter(&self, ctx: &mut RequestContext, response: &mut RestResponse) -> Result<(), RestError> {
        (self.0)(ctx, response)
    }
}

/// Wraps a closure as a [`RequestFilter`].
pub fn request_filter_fn<F>(f: F) -> Arc<dyn RequestFilter>
where
    F: Fn(&mut RequestContext) -> Result<(), RestError> + Send + Sync + 'static,
{
    Arc::new(FnRequestFilter(f))
}

/// Wraps a closure as a [`ResponseFilter`].
pub fn response_filter_fn<F>(f: F) -> Arc<dyn ResponseFilter>
where
    F: Fn(&mut RequestContext, &mut RestResponse) -> Result<(), RestError> + Send + Sync + 'static,
{
    Arc::new(FnResponseFilter(f))
}

/// Every filter of a deployment, by phase.
#[derive(Default, Clone)]
pub struct Interceptors {
    pre_match: Vec<(i32, Arc<dyn RequestFilter>)>,
    request: Vec<(i32, Arc<dyn RequestFilter>)>,
    response: Vec<(i32, Arc<dyn ResponseFilter>)>,
}

impl fmt::Debug for Interceptors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptors")
            .field("pre_match", &self.pre_match.len())
            .field("request", &self.request.len())
            .field("response", &self.response.len())
            .finish()
    }
}

impl Interceptors {
    /// No filters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a filter that runs before routing and may rewrite the method or
    /// path.
    pub fn add_pre_match_filter(&mut self, priority: i32, filter: Arc<dyn RequestFilter>) {
        self.pre_match.push((priority, filter));
        self.pre_match.sort_by_key(|(p, _)| *p);
    }

    /// Adds a filter that runs after routing, before the body is read.
    pub fn add_request_filter(&mut self, priority: i32, filter: Arc<dyn RequestFilter>) {
        self.request.push((priority, filter));
        self.request.sort_by_key(|(p, _)| *p);
    }

    /// Adds a filter that runs after the response is shaped.
    pub fn add_response_filter(&mut self, priority: i32, filter: Arc<dyn ResponseFilter>) {
        self.response.push((priority, filter));
        self.response.sort_by_key(|(p, _)| std::cmp::Reverse(*p));
    }

    /// Pre-match filters in execution order.
    pub fn pre_match_filters(&self) -> impl Iterator<Item = &Arc<dyn RequestFilter>> {
        self.pre_match.iter().map(|(_, f)| f)
    }

    /// Post-match request filters in execution order.
    pub fn request_filters(&self) -> impl Iterator<Item = &Arc<dyn RequestFilter>> {
        self.request.iter().map(|(_, f)| f)
    }

    /// Response filters in execution order.
    pub fn response_filters(&self) -> impl Iterator<Item = &Arc<dyn ResponseFilter>> {
        self.response.iter().map(|(_, f)| f)
    }

    /// Returns true if any pre-match filter is registered.
    pub fn has_pre_match(&self) -> bool {
        !self.pre_match.is_empty()
    }

    /// Closes every filter once.
    pub fn close_all(&self) {
        for filter in self.pre_match_filters().chain(self.request_filters()) {
            filter.close();
        }
        for filter in self.response_filters() {
            filter.close();
        }
    }

    /// Arranges for [`close_all`](Self::close_all) to run at shutdown.
    pub fn register_shutdown(&self, hooks: &ShutdownHooks) {
        if self.pre_match.is_empty() && self.request.is_empty() && self.response.is_empty() {
            return;
        }
        let filters = self.clone();
        hooks.register("interceptors", move || filters.close_all());
    }
}

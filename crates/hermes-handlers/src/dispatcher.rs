//! The entry point from the network layer.

use std::fmt;
use std::sync::Arc;

use hermes_core::{
    Deployment, RequestContext, ResourceRoutes, RouteLookup, RuntimeResource, ServerHttpRequest,
    ServerHttpResponse,
};

/// Whether the engine took an exchange.
pub enum Dispatch {
    /// A context was created; the engine will write the response.
    Handled,
    /// Nothing is registered for the path. The exchange is handed back for
    /// the host's fallback.
    NotHandled {
        /// The untouched request.
        request: Box<dyn ServerHttpRequest>,
        /// The untouched response sink.
        response: Box<dyn ServerHttpResponse>,
    },
}

impl fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Handled => f.write_str("Handled"),
            Self::NotHandled { .. } => f.write_str("NotHandled"),
        }
    }
}

impl Dispatch {
    /// Returns true for [`Dispatch::Handled`].
    pub fn is_handled(&self) -> bool {
        matches!(self, Self::Handled)
    }
}

/// Routes inbound exchanges to resource chains.
///
/// Without pre-match filters the path is matched up front, so requests
/// for unknown paths never allocate a context. With pre-match filters every
/// request enters the engine, and matching happens after the filters.
pub struct Dispatcher {
    deployment: Arc<Deployment>,
    routes: Arc<ResourceRoutes>,
    entry: Arc<RuntimeResource>,
    pre_match: bool,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("pre_match", &self.pre_match)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub(crate) fn new(
        deployment: Arc<Deployment>,
        routes: Arc<ResourceRoutes>,
        entry: Arc<RuntimeResource>,
        pre_match: bool,
    ) -> Self {
        Self {
            deployment,
            routes,
            entry,
            pre_match,
        }
    }

    /// Dispatches one exchange.
    ///
    /// Runs the chain on the calling thread until it completes or first
    /// suspends, so it must be called from the event loop.
    pub fn dispatch(
        &self,
        request: Box<dyn ServerHttpRequest>,
        response: Box<dyn ServerHttpResponse>,
    ) -> Dispatch {
        let lookup = if self.pre_match {
            None
        } else {
            match self.routes.lookup(request.method(), request.path()) {
                RouteLookup::NotFound => {
                    tracing::debug!(
                        method = %request.method(),
                        path = request.path(),
                        "No resource registered for path"
                    );
                    return Dispatch::NotHandled { request, response };
                }
                found => Some(found),
            }
        };

        let mut ctx = RequestContext::new(
            Arc::clone(&self.deployment),
            Arc::clone(&self.entry),
            request,
            response,
        );
        if let Some(lookup) = lookup {
            ctx.extensions_mut().insert(lookup);
        }
        ctx.run();
        Dispatch::Handled
    }

    /// The shared deployment.
    pub fn deployment(&self) -> &Arc<Deployment> {
        &self.deployment
    }

    /// The root route table.
    pub fn routes(&self) -> &ResourceRoutes {
        &self.routes
    }

    /// Runs shutdown hooks: filters are closed and registered hooks run.
    pub fn close(&self) {
        self.deployment.close();
    }
}

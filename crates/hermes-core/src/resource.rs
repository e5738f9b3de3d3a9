//! Immutable description of one matched endpoint.

use std::fmt;

use http::Method;
use mime::Mime;

use crate::handler::{chain, HandlerChain};

/// One endpoint: its handler chains and media type contract.
///
/// Created once at deployment and shared read-only by every request that
/// matches it.
pub struct RuntimeResource {
    name: String,
    method: Method,
    path: String,
    path_param_names: Vec<String>,
    consumes: Vec<Mime>,
    produces: Vec<Mime>,
    parameter_count: usize,
    blocking: bool,
    chain: HandlerChain,
    abort_chain: HandlerChain,
}

impl RuntimeResource {
    /// Starts describing a resource.
    pub fn builder(
        name: impl Into<String>,
        method: Method,
        path: impl Into<String>,
    ) -> RuntimeResourceBuilder {
        RuntimeResourceBuilder {
            resource: Self {
                name: name.into(),
                method,
                path: path.into(),
                path_param_names: Vec::new(),
                consumes: Vec::new(),
                produces: Vec::new(),
                parameter_count: 0,
                blocking: false,
                chain: chain(Vec::new()),
                abort_chain: chain(Vec::new()),
            },
        }
    }

    /// Diagnostic name, e.g. `WidgetResource::get`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path template relative to the enclosing mapper.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Names of the path parameters this resource binds, in order.
    pub fn path_param_names(&self) -> &[String] {
        &self.path_param_names
    }

    /// Number of path parameters this resource binds.
    pub fn path_param_count(&self) -> usize {
        self.path_param_names.len()
    }

    /// Consumed media types; empty means any.
    pub fn consumes(&self) -> &[Mime] {
        &self.consumes
    }

    /// Produced media types; empty means any.
    pub fn produces(&self) -> &[Mime] {
        &self.produces
    }

    /// Number of method parameter slots.
    pub fn parameter_count(&self) -> usize {
        self.parameter_count
    }

    /// Whether the method runs on the blocking executor.
    pub fn is_blocking(&self) -> bool {
        self.blocking
    }

    /// The main handler chain.
    pub fn chain(&self) -> &HandlerChain {
        &self.chain
    }

    /// The chain run after a failure or an abort.
    pub fn abort_chain(&self) -> &HandlerChain {
        &self.abort_chain
    }
}

impl fmt::Debug for RuntimeResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeResource")
            .field("name", &self.name)
            .field("method", &self.method)
            .field("path", &self.path)
            .field("chain_len", &self.chain.len())
            .finish_non_exhaustive()
    }
}

/// Builder for [`RuntimeResource`].
pub struct RuntimeResourceBuilder {
    resource: RuntimeResource,
}

impl RuntimeResourceBuilder {
    /// Sets the path parameter names.
    #[must_use]
    pub fn path_params(mut self, names: Vec<String>) -> Self {
        self.resource.path_param_names = names;
        self
    }

    /// Sets the consumed media types.
    #[must_use]
    pub fn consumes(mut self, consumes: Vec<Mime>) -> Self {
        self.resource.consumes = consumes;
        self
    }

    /// Sets the produced media types.
    #[must_use]
    pub fn produces(mut self, produces: Vec<Mime>) -> Self {
        self.resource.produces = produces;
        self
    }

    /// Sets the number of parameter slots.
    #[must_use]
    pub fn parameter_count(mut self, count: usize) -> Self {
        self.resource.parameter_count = count;
        self
    }

    /// Marks the method as blocking.
    #[must_use]
    pub fn blocking(mut self, blocking: bool) -> Self {
        self.resource.blocking = blocking;
        self
    }

    /// Sets the main chain.
    #[must_use]
    pub fn chain(mut self, chain: HandlerChain) -> Self {
        self.resource.chain = chain;
        self
    }

    /// Sets the abort chain.
    #[must_use]
    pub fn abort_chain(mut self, chain: HandlerChain) -> Self {
        self.resource.abort_chain = chain;
        self
    }

    /// Finishes the description.
    pub fn build(self) -> RuntimeResource {
        self.resource
    }
}

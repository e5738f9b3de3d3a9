//! # Hermes Core
//!
//! The request state machine and the types every handler shares.
//!
//! - [`RequestContext`] - per-request state: chain position, parameter
//!   slots, result, response and failure, plus suspend/resume/restart
//! - [`RestHandler`] - one step of a handler chain
//! - [`RuntimeResource`] - an endpoint's main and abort chains
//! - [`Deployment`] - codecs, exception mappers, sub-resource tables and
//!   executors shared by all requests
//! - [`RestError`] - the single error type flowing through a chain
//! - [`ServerHttpRequest`] / [`ServerHttpResponse`] - the transport seam

#![doc(html_root_url = "https://docs.rs/hermes-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod body;
mod context;
mod deployment;
mod error;
pub mod exception;
pub mod exchange;
mod executor;
mod handler;
mod lifecycle;
mod locator;
pub mod media;
mod resource;
mod response;
mod routes;
pub mod serialisers;
mod spi;
mod value;

pub use body::{BlockingBody, ChunkSender, RequestBody};
pub use context::{RequestContext, RequestId, ResumeHandle};
pub use deployment::{Deployment, DeploymentBuilder, DispatchSettings};
pub use error::{allow_header, ErrorCategory, ErrorDetail, ErrorEnvelope, RestError, RestResult};
pub use exception::{ExceptionMapper, ExceptionMappers};
pub use executor::{BlockingExecutor, DirectExecutor, EventLoopExecutor, Executor, Executors, Task};
pub use handler::{chain, handler_fn, FnHandler, HandlerChain, RestHandler};
pub use lifecycle::ShutdownHooks;
pub use locator::{LocatableResource, LocatorRegistry};
pub use resource::{RuntimeResource, RuntimeResourceBuilder};
pub use response::RestResponse;
pub use routes::{ResourceRoutes, RouteLookup};
pub use serialisers::{MessageBodyReader, MessageBodyWriter, Serialisers};
pub use spi::{BodyStream, ServerHttpRequest, ServerHttpResponse};
pub use value::{Arguments, Completer, Deferred, Entity, Outcome, Returned, SubResource, TypeKey};

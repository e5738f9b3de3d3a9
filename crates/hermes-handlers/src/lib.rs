//! # Hermes Handlers
//!
//! The stages that make up resource chains, and the machinery that builds
//! chains from declarations and feeds requests into them.
//!
//! - [`ApplicationBuilder`] - declares resources, sub-resources, codecs,
//!   exception mappers and filters, and builds a [`Dispatcher`]
//! - [`Dispatcher`] - matches inbound exchanges and starts their chains
//! - [`stages`] - the individual [`RestHandler`](hermes_core::RestHandler)s
//! - [`param`] - parameter extraction and conversion
//! - [`interceptor`] - request and response filters
//!
//! ## Example
//!
//! ```
//! use hermes_core::exchange::{ChannelResponse, InboundRequest};
//! use hermes_core::Outcome;
//! use hermes_handlers::{ApplicationBuilder, ResourceClass, ResourceMethod};
//! use http::Method;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let dispatcher = ApplicationBuilder::new()
//!     .resource(ResourceClass::new("Widgets", "/widgets").method(
//!         ResourceMethod::get(|mut args| {
//!             let id: u64 = args.take(0)?;
//!             Ok(Outcome::ok(format!("widget {id}")))
//!         })
//!         .path("/{id}")
//!         .path_param::<u64>("id")
//!         .produces(mime::TEXT_PLAIN),
//!     ))
//!     .build()
//!     .unwrap();
//!
//! let (sink, completed) = ChannelResponse::new();
//! let request = InboundRequest::new(Method::GET, "/widgets/42");
//! assert!(dispatcher.dispatch(Box::new(request), Box::new(sink)).is_handled());
//!
//! let response = completed.await.unwrap();
//! assert_eq!(response.status, 200);
//! assert_eq!(&response.body[..], b"widget 42");
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/hermes-handlers/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod application;
mod bean;
mod dispatcher;
pub mod interceptor;
pub mod param;
pub mod stages;

pub use application::{ApplicationBuilder, DeploymentError, ResourceClass, ResourceMethod};
pub use bean::{bean_fn, BeanFactory, BeanInstance, PerRequest, Singleton};
pub use dispatcher::{Dispatch, Dispatcher};
pub use interceptor::{
    request_filter_fn, response_filter_fn, Interceptors, RequestFilter, ResponseFilter,
    DEFAULT_PRIORITY,
};
pub use param::{async_param, Extracted, ParameterConverter, ParameterExtractor};
pub use stages::{FnInvoker, Invoker};

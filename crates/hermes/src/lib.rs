//! # Hermes
//!
//! An asynchronous REST request-dispatch engine. Resource classes declare
//! methods by verb, path template and media types; Hermes compiles them
//! into per-method handler chains and drives each request through its
//! chain on the event loop, a worker pool, or suspended on a future.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use hermes::prelude::*;
//!
//! fn widgets() -> ResourceClass {
//!     ResourceClass::new("Widgets", "/widgets").method(
//!         ResourceMethod::get(|mut args| {
//!             let id: u64 = args.take(0)?;
//!             Ok(Outcome::ok(format!("widget {id}")))
//!         })
//!         .path("/{id}")
//!         .path_param::<u64>("id"),
//!     )
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::new()
//!         .with_optional_file("hermes.toml")?
//!         .with_env_prefix("HERMES")
//!         .load()?;
//!     hermes::run(ApplicationBuilder::new().resource(widgets()), &config).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Request flow
//!
//! ```text
//! Server → Dispatcher → [pre-match filters] → class match → method match
//!        → request filters → body read → parameters → invoke
//!        → response filters → write → Server
//! ```
//!
//! Failures at any stage divert the request to the abort chain, which maps
//! the error to a response and writes it.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod bootstrap;

pub use bootstrap::{prepare, run, HermesError};

pub use hermes_config as config;
pub use hermes_core as core;
pub use hermes_handlers as handlers;
pub use hermes_router as router;
pub use hermes_server as server;
pub use hermes_telemetry as telemetry;

/// Common imports for application code.
///
/// ```rust,ignore
/// use hermes::prelude::*;
/// ```
pub mod prelude {
    pub use hermes_config::{ConfigLoader, HermesConfig};
    pub use hermes_core::{
        Arguments, Completer, Deferred, DispatchSettings, Outcome, RequestContext, RestError,
        RestResponse, RestResult, SubResource,
    };
    pub use hermes_handlers::{
        async_param, bean_fn, request_filter_fn, response_filter_fn, ApplicationBuilder,
        BeanInstance, ResourceClass, ResourceMethod,
    };
    pub use hermes_server::{Lifecycle, Server, ShutdownSignal};
    pub use hermes_telemetry::{init_logging, LogConfig};
}

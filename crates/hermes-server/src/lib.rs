//! # Hermes Server
//!
//! Serves a [`Dispatcher`](hermes_handlers::Dispatcher) over HTTP/1.1 with
//! hyper and tokio.
//!
//! - request bodies reach the engine as a stream, so large uploads are not
//!   buffered here
//! - requests no resource matches go to a fallback (a JSON 404 by default)
//! - requests that outlive the request timeout are answered with 504
//! - on shutdown the listener closes, open connections drain, then
//!   [`Lifecycle`] shutdown hooks run and the dispatcher releases its filters
//!
//! ## Example
//!
//! ```rust,ignore
//! use hermes_server::{Server, ShutdownSignal};
//!
//! let server = Server::builder(dispatcher).config(&config.server).build();
//! server.run().await?;
//! ```

#![doc(html_root_url = "https://docs.rs/hermes-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod adapter;
mod lifecycle;
mod server;
mod shutdown;

pub use lifecycle::{Lifecycle, LifecycleError, LifecycleResult};
pub use server::{Fallback, Server, ServerBuilder, ServerError};
pub use shutdown::{ConnectionToken, ConnectionTracker, ShutdownSignal};

//! The handlers making up resource chains.
//!
//! A resource method's chain runs, in order:
//!
//! 1. request filters
//! 2. [`InputHandler`] and [`RequestDeserializeHandler`], if the method
//!    takes a body
//! 3. one [`ParameterHandler`] per parameter
//! 4. [`BlockingHandler`], for blocking methods
//! 5. [`InstanceHandler`], [`InvocationHandler`]
//! 6. [`FutureResultHandler`], [`DeferredResultHandler`]
//! 7. [`ResourceLocatorHandler`], for locator methods
//! 8. [`FixedProducesHandler`] or [`VariableProducesHandler`]
//! 9. [`ResponseHandler`], response filters, [`ResponseWriterHandler`]
//!
//! Every resource shares the abort chain [`ExceptionHandler`],
//! [`ResponseHandler`], response filters, [`ResponseWriterHandler`].

mod async_result;
mod blocking;
mod deserialize;
mod exception;
mod filters;
mod input;
mod instance;
mod invocation;
mod locator;
mod parameter;
mod produces;
mod response;
mod routing;
mod writer;

pub use async_result::{DeferredResultHandler, FutureResultHandler};
pub use blocking::BlockingHandler;
pub use deserialize::RequestDeserializeHandler;
pub use exception::ExceptionHandler;
pub use filters::{RequestFilterHandler, ResponseFilterHandler};
pub use input::InputHandler;
pub use instance::InstanceHandler;
pub use invocation::{FnInvoker, InvocationHandler, Invoker};
pub use locator::ResourceLocatorHandler;
pub use parameter::ParameterHandler;
pub use produces::{FixedProducesHandler, VariableProducesHandler};
pub use response::ResponseHandler;
pub use routing::{MediaTypeRoutingHandler, RoutingHandler};
pub use writer::ResponseWriterHandler;

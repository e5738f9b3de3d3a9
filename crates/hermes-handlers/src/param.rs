//! Parameter extraction and conversion.
//!
//! An extractor pulls the raw text of one parameter out of the request,
//! either at once or as a future. A converter turns that text into the
//! typed value stored in the parameter slot.

use std::any::Any;
use std::fmt::Display;
use std::future::Future;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use hermes_core::{RequestContext, RestError};

/// The raw value of a parameter.
pub enum Extracted {
    /// Known now; `None` if absent.
    Ready(Option<String>),
    /// Known once the future resolves.
    Pending(BoxFuture<'static, Result<Option<String>, RestError>>),
}

impl std::fmt::Debug for Extracted {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready(value) => f.debug_tuple("Ready").field(value).finish(),
            Self::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

/// Pulls a raw parameter value out of a request.
pub trait ParameterExtractor: Send + Sync {
    /// Extracts the value.
    fn extract(&self, ctx: &RequestContext) -> Extracted;
}

/// A path parameter of the current resource, by position.
#[derive(Debug, Clone, Copy)]
pub struct PathParam {
    index: usize,
}

impl PathParam {
    /// The `index`-th parameter of the current template.
    pub fn new(index: usize) -> Self {
        Self { index }
    }
}

impl ParameterExtractor for PathParam {
    fn extract(&self, ctx: &RequestContext) -> Extracted {
        Extracted::Ready(ctx.path_param(self.index).map(ToString::to_string))
    }
}

/// A path parameter by name, searched outward through enclosing resources.
#[derive(Debug, Clone)]
pub struct NamedPathParam {
    name: String,
}

impl NamedPathParam {
    /// The parameter called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl ParameterExtractor for NamedPathParam {
    fn extract(&self, ctx: &RequestContext) -> Extracted {
        Extracted::Ready(ctx.path_param_named(&self.name).map(ToString::to_string))
    }
}

/// A decoded query parameter.
#[derive(Debug, Clone)]
pub struct QueryParam {
    name: String,
}

impl QueryParam {
    /// The query parameter called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl ParameterExtractor for QueryParam {
    fn extract(&self, ctx: &RequestContext) -> Extracted {
        Extracted::Ready(ctx.query_param(&self.name))
    }
}

/// A request header.
#[derive(Debug, Clone)]
pub struct HeaderParam {
    name: String,
}

impl HeaderParam {
    /// The header called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl ParameterExtractor for HeaderParam {
    fn extract(&self, ctx: &RequestContext) -> Extracted {
        Extracted::Ready(ctx.header(&self.name).map(ToString::to_string))
    }
}

struct AsyncParam<F>(F);

impl<F, Fut> ParameterExtractor for AsyncParam<F>
where
    F: Fn(&RequestContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<String>, RestError>> + Send + 'static,
{
    fn extract(&self, ctx: &RequestContext) -> Extracted {
        Extracted::Pending((self.0)(ctx).boxed())
    }
}

/// An extractor whose value arrives asynchronously. `f` reads what it
/// needs from the context and returns a future for the raw value.
pub fn async_param<F, Fut>(f: F) -> Arc<dyn ParameterExtractor>
where
    F: Fn(&RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<String>, RestError>> + Send + 'static,
{
    Arc::new(AsyncParam(f))
}

/// Turns a raw value into a typed parameter.
pub trait ParameterConverter: Send + Sync {
    /// Converts `raw`, the value of the parameter called `name`.
    fn convert(&self, name: &str, raw: Option<String>) -> Result<Box<dyn Any + Send>, RestError>;
}

/// Parses a required `T`; absence is a 400.
pub struct Required<T> {
    _marker: PhantomData<fn() -> T>,
}

/// Parses an `Option<T>`.
pub struct Optional<T> {
    _marker: PhantomData<fn() -> T>,
}

/// Parses a `T`, using a default when absent.
pub struct Defaulted<T> {
    default: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Required<T> {
    /// Creates the converter.
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for Required<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Optional<T> {
    /// Creates the converter.
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for Optional<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Defaulted<T> {
    /// Uses `default` when the parameter is absent.
    pub fn new(default: impl Into<String>) -> Self {
        Self {
            default: default.into(),
            _marker: PhantomData,
        }
    }
}

fn parse<T>(name: &str, raw: &str) -> Result<T, RestError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse::<T>().map_err(|e| {
        RestError::bad_request(format!("invalid value {raw:?} for parameter {name}: {e}"))
    })
}

impl<T> ParameterConverter for Required<T>
where
    T: FromStr + Send + 'static,
    T::Err: Display,
{
    fn convert(&self, name: &str, raw: Option<String>) -> Result<Box<dyn Any + Send>, RestError> {
        let raw = raw.ok_or_else(|| RestError::bad_request(format!("missing parameter {name}")))?;
        Ok(Box::new(parse::<T>(name, &raw)?))
    }
}

impl<T> ParameterConverter for Optional<T>
where
    T: FromStr + Send + 'static,
    T::Err: Display,
{
    fn convert(&self, name: &str, raw: Option<String>) -> Result<Box<dyn Any + Send>, RestError> {
        let value: Option<T> = raw.map(|raw| parse::<T>(name, &raw)).transpose()?;
        Ok(Box::new(value))
    }
}

impl<T> ParameterConverter for Defaulted<T>
where
    T: FromStr + Send + 'static,
    T::Err: Display,
{
    fn convert(&self, name: &str, raw: Option<String>) -> Result<Box<dyn Any + Send>, RestError> {
        let raw = raw.unwrap_or_else(|| self.default.clone());
        Ok(Box::new(parse::<T>(name, &raw)?))
    }
}

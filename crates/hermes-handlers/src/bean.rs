//! Resource instance factories.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use hermes_core::{RequestContext, RestError};

type Closeable = Box<dyn FnOnce() + Send>;

/// A resource instance and the cleanup to run when the request ends.
pub struct BeanInstance {
    instance: Arc<dyn Any + Send + Sync>,
    closeable: Option<Closeable>,
}

impl fmt::Debug for BeanInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanInstance")
            .field("closeable", &self.closeable.is_some())
            .finish_non_exhaustive()
    }
}

impl BeanInstance {
    /// An instance with no cleanup.
    pub fn new(instance: Arc<dyn Any + Send + Sync>) -> Self {
        Self {
            instance,
            closeable: None,
        }
    }

    /// Adds cleanup.
    #[must_use]
    pub fn with_closeable(mut self, close: impl FnOnce() + Send + 'static) -> Self {
        self.closeable = Some(Box::new(close));
        self
    }

    /// Splits into instance and cleanup.
    pub fn into_parts(self) -> (Arc<dyn Any + Send + Sync>, Option<Box<dyn FnOnce() + Send>>) {
        (self.instance, self.closeable)
    }
}

/// Supplies resource instances, once per invocation.
pub trait BeanFactory: Send + Sync {
    /// Creates (or looks up) the instance for this request.
    fn create_instance(&self, ctx: &RequestContext) -> Result<BeanInstance, RestError>;
}

/// One shared instance for every request.
pub struct Singleton {
    instance: Arc<dyn Any + Send + Sync>,
}

impl Singleton {
    /// Shares `instance`.
    pub fn new<T: Any + Send + Sync>(instance: T) -> Self {
        Self {
            instance: Arc::new(instance),
        }
    }
}

impl BeanFactory for Singleton {
    fn create_instance(&self, _ctx: &RequestContext) -> Result<BeanInstance, RestError> {
        Ok(BeanInstance::new(Arc::clone(&self.instance)))
    }
}

/// A fresh instance per request.
pub struct PerRequest<F> {
    create: F,
}

impl<F, T> PerRequest<F>
where
    F: Fn() -> T + Send + Sync,
    T: Any + Send + Sync,
{
    /// Builds each instance with `create`.
    pub fn new(create: F) -> Self {
        Self { create }
    }
}

impl<F, T> BeanFactory for PerRequest<F>
where
    F: Fn() -> T + Send + Sync,
    T: Any + Send + Sync,
{
    fn create_instance(&self, _ctx: &RequestContext) -> Result<BeanInstance, RestError> {
        Ok(BeanInstance::new(Arc::new((self.create)())))
    }
}

struct FactoryFn<F>(F);

impl<F> BeanFactory for FactoryFn<F>
where
    F: Fn(&RequestContext) -> Result<BeanInstance, RestError> + Send + Sync,
{
    fn create_instance(&self, ctx: &RequestContext) -> Result<BeanInstance, RestError> {
        (self.0)(ctx)
    }
}

/// Wraps a closure as a [`BeanFactory`], for instances that need request
/// data or cleanup.
pub fn bean_fn<F>(f: F) -> Arc<dyn BeanFactory>
where
    F: Fn(&RequestContext) -> Result<BeanInstance, RestError> + Send + Sync + 'static,
{
    Arc::new(FactoryFn(f))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_parts() {
        let (instance, close) = BeanInstance::new(Arc::new(5_u8))
            .with_closeable(|| {})
            .into_parts();
        assert_eq!(instance.downcast_ref::<u8>(), Some(&5));
        assert!(close.is_some());
    }
}

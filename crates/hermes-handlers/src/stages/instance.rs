//! Creating the resource instance.

use std::fmt;
use std::sync::Arc;

use hermes_core::{RequestContext, RestError, RestHandler};

use crate::bean::BeanFactory;

/// Obtains the resource instance and registers its closeable, if any, to run
/// when the request completes.
pub struct InstanceHandler {
    factory: Arc<dyn BeanFactory>,
}

impl fmt::Debug for InstanceHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceHandler").finish_non_exhaustive()
    }
}

impl InstanceHandler {
    /// Creates the stage.
    pub fn new(factory: Arc<dyn BeanFactory>) -> Self {
        Self { factory }
    }
}

impl RestHandler for InstanceHandler {
    fn handle(&self, ctx: &mut RequestContext) -> Result<(), RestError> {
        let (instance, closeable) = self.factory.create_instance(ctx)?.into_parts();
        ctx.set_instance(instance);
        if let Some(close) = closeable {
            ctx.add_closeable(close);
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "instance"
    }
}

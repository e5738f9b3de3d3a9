//! Extracting and converting one parameter.

use std::fmt;
use std::sync::Arc;

use hermes_core::{RequestContext, RestError, RestHandler};

use crate::param::{Extracted, ParameterConverter, ParameterExtractor};

/// Fills parameter slot `index`.
///
/// When the extractor answers with a future, the request suspends until it
/// resolves. A failed extraction or conversion fails the request before the
/// resource method is invoked.
pub struct ParameterHandler {
    index: usize,
    name: Arc<str>,
    extractor: Arc<dyn ParameterExtractor>,
    converter: Arc<dyn ParameterConverter>,
}

impl fmt::Debug for ParameterHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterHandler")
            .field("index", &self.index)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl ParameterHandler {
    /// Creates the stage for the parameter called `name`.
    pub fn new(
        index: usize,
        name: impl Into<Arc<str>>,
        extractor: Arc<dyn ParameterExtractor>,
        converter: Arc<dyn ParameterConverter>,
    ) -> Self {
        Self {
            index,
            name: name.into(),
            extractor,
            converter,
        }
    }
}

impl RestHandler for ParameterHandler {
    fn handle(&self, ctx: &mut RequestContext) -> Result<(), RestError> {
        match self.extractor.extract(ctx) {
            Extracted::Ready(raw) => {
                let value = self.converter.convert(&self.name, raw)?;
                ctx.set_parameter(self.index, value)
            }
            Extracted::Pending(future) => {
                let handle = ctx.suspend();
                let index = self.index;
                let name = Arc::clone(&self.name);
                let converter = Arc::clone(&self.converter);
                let deployment = Arc::clone(ctx.deployment());
                deployment.spawn(async move {
                    match future.await {
                        Ok(raw) => handle.resume_with(move |ctx| {
                            let value = converter.convert(&name, raw)?;
                            ctx.set_parameter(index, value)
                        }),
                        Err(error) => handle.resume_error(error),
                    }
                })
            }
        }
    }

    fn name(&self) -> &'static str {
        "parameter"
    }
}

//! Sub-resource locators.

use std::sync::Arc;

use hermes_core::{RequestContext, RestError, RestHandler, Returned};

use super::routing::enter_route;

/// Continues dispatch into the object a locator method returned.
///
/// The returned [`SubResource`](hermes_core::SubResource) is resolved to a
/// registered [`LocatableResource`](hermes_core::LocatableResource), whose
/// routes are matched against the unconsumed path. The context then restarts
/// on the matched chain with the sub-resource as instance and the new path
/// parameters bound after the outer ones.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResourceLocatorHandler;

impl RestHandler for ResourceLocatorHandler {
    fn handle(&self, ctx: &mut RequestContext) -> Result<(), RestError> {
        let sub = match ctx.take_result() {
            Some(Returned::SubResource(sub)) => sub,
            Some(other) => {
                ctx.set_result(other);
                return Ok(());
            }
            None => return Ok(()),
        };

        let deployment = Arc::clone(ctx.deployment());
        let locatable = deployment.locators().resolve(&sub).ok_or_else(|| {
            RestError::not_found(format!(
                "no sub-resource registered for {}",
                sub.lookup_keys()
                    .first()
                    .map_or("<unknown>", |key| key.name())
            ))
        })?;

        let path = match ctx.remaining_path() {
            "" => "/".to_string(),
            rest => rest.to_string(),
        };
        let method = ctx.method().clone();
        tracing::debug!(
            sub_resource = locatable.type_key().name(),
            remaining = %path,
            "Entering sub-resource"
        );
        enter_route(ctx, locatable.routes().lookup_nested(&method, &path))?;
        ctx.set_instance(Arc::clone(sub.instance()));
        Ok(())
    }

    fn name(&self) -> &'static str {
        "resource_locator"
    }
}

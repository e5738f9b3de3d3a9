//! Handler tables for sub-resource types.

use std::collections::HashMap;
use std::sync::Arc;

use crate::routes::ResourceRoutes;
use crate::value::{SubResource, TypeKey};

/// The routes of one sub-resource type, matched against the path suffix a
/// locator method left unconsumed.
#[derive(Debug)]
pub struct LocatableResource {
    type_key: TypeKey,
    routes: ResourceRoutes,
}

impl LocatableResource {
    /// Wraps the route table of the type identified by `type_key`.
    pub fn new(type_key: TypeKey, routes: ResourceRoutes) -> Self {
        Self { type_key, routes }
    }

    /// The sub-resource type.
    pub fn type_key(&self) -> TypeKey {
        self.type_key
    }

    /// Routes matched against the path suffix.
    pub fn routes(&self) -> &ResourceRoutes {
        &self.routes
    }
}

/// Every registered sub-resource type.
#[derive(Debug, Default)]
pub struct LocatorRegistry {
    resources: HashMap<TypeKey, Arc<LocatableResource>>,
}

impl LocatorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a type's routes, replacing any previous registration.
    pub fn register(&mut self, resource: LocatableResource) {
        self.resources
            .insert(resource.type_key(), Arc::new(resource));
    }

    /// The routes registered for exactly `key`.
    pub fn get(&self, key: &TypeKey) -> Option<&Arc<LocatableResource>> {
        self.resources.get(key)
    }

    /// The routes for a returned sub-resource, trying its lookup keys in
    /// order.
    pub fn resolve(&self, sub: &SubResource) -> Option<&Arc<LocatableResource>> {
        sub.lookup_keys().iter().find_map(|key| self.resources.get(key))
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

//! Per-method mapper tables.
//!
//! A [`MethodTable`] holds one [`RequestMapper`] per HTTP method, which is
//! how both the top-level dispatcher and sub-resource locators route.

use std::collections::HashMap;

use http::Method;

use crate::mapper::{RequestMapper, RequestMatch};
use crate::template::TemplateError;

/// One [`RequestMapper`] per HTTP method.
///
/// # Example
///
/// ```rust
/// use hermes_router::MethodTable;
/// use http::Method;
///
/// let mut table = MethodTable::new();
/// table.insert(Method::GET, "/users/{id}", "getUser").unwrap();
/// table.insert(Method::DELETE, "/users/{id}", "deleteUser").unwrap();
///
/// let m = table.map(&Method::GET, "/users/7").unwrap();
/// assert_eq!(*m.value, "getUser");
/// assert_eq!(table.allowed_methods("/users/7"), vec![Method::DELETE, Method::GET]);
/// ```
pub struct MethodTable<T> {
    mappers: HashMap<Method, RequestMapper<T>>,
}

impl<T> Default for MethodTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for MethodTable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.mappers.iter()).finish()
    }
}

impl<T> MethodTable<T> {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            mappers: HashMap::new(),
        }
    }

    /// Registers a full-match template for `method`.
    pub fn insert(&mut self, method: Method, template: &str, value: T) -> Result<(), TemplateError> {
        self.mappers.entry(method).or_default().insert(template, value)
    }

    /// Registers a prefix template for `method`.
    pub fn insert_prefix(
        &mut self,
        method: Method,
        template: &str,
        value: T,
    ) -> Result<(), TemplateError> {
        self.mappers
            .entry(method)
            .or_default()
            .insert_prefix(template, value)
    }

    /// Returns the mapper for `method`, if any template was registered.
    pub fn mapper(&self, method: &Method) -> Option<&RequestMapper<T>> {
        self.mappers.get(method)
    }

    /// Maps `path` against the `method` table.
    pub fn map(&self, method: &Method, path: &str) -> Option<RequestMatch<'_, T>> {
        self.mappers.get(method)?.map(path)
    }

    /// Methods whose tables match `path`, sorted by name for stable `Allow`
    /// headers.
    pub fn allowed_methods(&self, path: &str) -> Vec<Method> {
        let mut methods: Vec<Method> = self
            .mappers
            .iter()
            .filter(|(_, mapper)| mapper.map(path).is_some())
            .map(|(method, _)| method.clone())
            .collect();
        methods.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        methods
    }

    /// Returns true if no method has any template.
    pub fn is_empty(&self) -> bool {
        self.mappers.values().all(RequestMapper::is_empty)
    }

    /// Iterates over `(method, mapper)` pairs in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&Method, &RequestMapper<T>)> {
        self.mappers.iter()
    }
}

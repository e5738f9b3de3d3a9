//! Route tables: resource methods by HTTP method plus method-agnostic
//! locators.

use std::sync::Arc;

use hermes_router::{MethodTable, RequestMapper, RequestMatch, TemplateError};
use http::Method;

use crate::resource::RuntimeResource;

/// The routes of one resource level: the top-level application, or a
/// sub-resource type.
#[derive(Debug, Default)]
pub struct ResourceRoutes {
    methods: MethodTable<Arc<RuntimeResource>>,
    locators: RequestMapper<Arc<RuntimeResource>>,
}

/// Outcome of [`ResourceRoutes::lookup`].
#[derive(Debug, Clone)]
pub enum RouteLookup {
    /// A resource matched.
    Found {
        /// The matched resource.
        target: Arc<RuntimeResource>,
        /// Path parameter values in declaration order.
        values: Vec<String>,
        /// Unconsumed path suffix; empty for a full match.
        remaining: String,
    },
    /// `OPTIONS` on a known path with no `OPTIONS` resource.
    Options {
        /// Methods the path supports.
        allow: Vec<Method>,
    },
    /// The path is known but not for this method.
    MethodNotAllowed {
        /// Methods the path supports.
        allow: Vec<Method>,
    },
    /// Nothing matches the path.
    NotFound,
}

impl ResourceRoutes {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a resource method matching the whole path.
    pub fn insert(
        &mut self,
        method: Method,
        template: &str,
        resource: Arc<RuntimeResource>,
    ) -> Result<(), TemplateError> {
        self.methods.insert(method, template, resource)
    }

    /// Registers a locator matching a path prefix, for any method.
    pub fn insert_locator(
        &mut self,
        template: &str,
        resource: Arc<RuntimeResource>,
    ) -> Result<(), TemplateError> {
        self.locators.insert_prefix(template, resource)
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty() && self.locators.is_empty()
    }

    /// Resource methods by HTTP method.
    pub fn methods(&self) -> &MethodTable<Arc<RuntimeResource>> {
        &self.methods
    }

    /// Whether `path` matches anything at all, for any method.
    pub fn knows(&self, path: &str) -> bool {
        self.locators.map(path).is_some() || !self.methods.allowed_methods(path).is_empty()
    }

    /// Methods `path` can be requested with, as advertised in `Allow`.
    ///
    /// HEAD is implied by GET and OPTIONS is always answered. A locator
    /// accepts every method, so its own methods are left to the sub-resource.
    pub fn allowed_methods(&self, path: &str) -> Vec<Method> {
        let mut allow = self.methods.allowed_methods(path);
        if allow.contains(&Method::GET) && !allow.contains(&Method::HEAD) {
            allow.push(Method::HEAD);
        }
        if !allow.is_empty() && !allow.contains(&Method::OPTIONS) {
            allow.push(Method::OPTIONS);
        }
        allow.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        allow
    }

    /// Finds the resource for `method` and `path`.
    ///
    /// A resource method matching the whole path wins; HEAD falls back to
    /// GET. A locator takes the rest, except that it does not answer for a
    /// path that resource methods fully match under other methods, which
    /// yields OPTIONS or 405 instead.
    pub fn lookup(&self, method: &Method, path: &str) -> RouteLookup {
        let direct = self.methods.map(method, path).or_else(|| {
            (*method == Method::HEAD)
                .then(|| self.methods.map(&Method::GET, path))
                .flatten()
        });
        if let Some(found) = direct {
            return found_route(found);
        }

        let allow = self.allowed_methods(path);
        match self.locators.map(path) {
            Some(found) if !found.remaining.is_empty() || allow.is_empty() => {
                return found_route(found);
            }
            _ => {}
        }

        if allow.is_empty() {
            RouteLookup::NotFound
        } else if *method == Method::OPTIONS {
            RouteLookup::Options { allow }
        } else {
            RouteLookup::MethodNotAllowed { allow }
        }
    }

    /// Finds the resource for `method` and `path` inside a sub-resource.
    ///
    /// Unlike [`lookup`](Self::lookup) there is no OPTIONS answer and no
    /// 405: a path known only under other methods is not found.
    pub fn lookup_nested(&self, method: &Method, path: &str) -> RouteLookup {
        match self.lookup(method, path) {
            RouteLookup::Options { .. } | RouteLookup::MethodNotAllowed { .. } => {
                RouteLookup::NotFound
            }
            other => other,
        }
    }
}

fn found_route(found: RequestMatch<'_, Arc<RuntimeResource>>) -> RouteLookup {
    RouteLookup::Found {
        target: Arc::clone(found.value),
        values: found.path_values.into_values(),
        remaining: found.remaining,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(name: &str, method: Method) -> Arc<RuntimeResource> {
        Arc::new(RuntimeResource::builder(name, method, "/").build())
    }

    fn routes() -> ResourceRoutes {
        let mut routes = ResourceRoutes::new();
        routes
            .insert(Method::GET, "/widgets/{id}", resource("get", Method::GET))
            .unwrap();
        routes
            .insert(Method::DELETE, "/widgets/{id}", resource("delete", Method::DELETE))
            .unwrap();
        routes
            .insert_locator("/widgets/{id}", resource("locate", Method::GET))
            .unwrap();
        routes
    }

    fn name(lookup: &RouteLookup) -> &str {
        match lookup {
            RouteLookup::Found { target, .. } => target.name(),
            other => panic!("expected a match, got {other:?}"),
        }
    }

    #[test]
    fn test_method_route_wins() {
        let routes = routes();
        let lookup = routes.lookup(&Method::GET, "/widgets/42");
        assert_eq!(name(&lookup), "get");
        let RouteLookup::Found { values, remaining, .. } = lookup else {
            unreachable!()
        };
        assert_eq!(values, vec!["42".to_string()]);
        assert_eq!(remaining, "");
    }

    #[test]
    fn test_locator_wins_longer_path() {
        let routes = routes();
        let lookup = routes.lookup(&Method::POST, "/widgets/42/history");
        assert_eq!(name(&lookup), "locate");
        let RouteLookup::Found { remaining, .. } = lookup else {
            unreachable!()
        };
        assert_eq!(remaining, "/history");
    }

    #[test]
    fn test_exact_locator_yields_to_methods() {
        let routes = routes();
        assert!(matches!(
            routes.lookup(&Method::PUT, "/widgets/42"),
            RouteLookup::MethodNotAllowed { .. }
        ));
        assert!(matches!(
            routes.lookup(&Method::OPTIONS, "/widgets/42"),
            RouteLookup::Options { .. }
        ));
    }

    #[test]
    fn test_head_falls_back_to_get() {
        assert_eq!(name(&routes().lookup(&Method::HEAD, "/widgets/1")), "get");
    }

    #[test]
    fn test_method_not_allowed_and_options() {
        let mut routes = ResourceRoutes::new();
        routes
            .insert(Method::GET, "/items", resource("list", Method::GET))
            .unwrap();

        match routes.lookup(&Method::PUT, "/items") {
            RouteLookup::MethodNotAllowed { allow } => {
                assert_eq!(allow, vec![Method::GET, Method::HEAD, Method::OPTIONS]);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            routes.lookup(&Method::OPTIONS, "/items"),
            RouteLookup::Options { .. }
        ));
        assert!(matches!(
            routes.lookup(&Method::GET, "/nothing"),
            RouteLookup::NotFound
        ));
        assert!(routes.knows("/items"));
        assert!(!routes.knows("/nothing"));
    }

    #[test]
    fn test_nested_method_miss_is_not_found() {
        let mut routes = ResourceRoutes::new();
        routes
            .insert(Method::GET, "/history", resource("history", Method::GET))
            .unwrap();

        assert_eq!(name(&routes.lookup_nested(&Method::GET, "/history")), "history");
        assert_eq!(name(&routes.lookup_nested(&Method::HEAD, "/history")), "history");
        assert!(matches!(
            routes.lookup_nested(&Method::DELETE, "/history"),
            RouteLookup::NotFound
        ));
        assert!(matches!(
            routes.lookup_nested(&Method::OPTIONS, "/history"),
            RouteLookup::NotFound
        ));
    }
}

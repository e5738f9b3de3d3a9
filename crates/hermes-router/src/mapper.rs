//! The request mapper: compiled templates plus match selection.

use std::fmt;

use crate::node::{Candidate, Node, Terminal};
use crate::params::PathValues;
use crate::template::{PathTemplate, TemplateError};

struct Route<T> {
    template: PathTemplate,
    value: T,
    prefix: bool,
}

/// Result of a successful [`RequestMapper::map`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestMatch<'a, T> {
    /// The value registered for the winning template.
    pub value: &'a T,
    /// The winning template.
    pub template: &'a PathTemplate,
    /// Percent-decoded parameter values in declaration order.
    pub path_values: PathValues,
    /// Unconsumed suffix, `""` for a full match, otherwise starting with `/`.
    pub remaining: String,
}

/// Maps a normalized request path to the best matching registered template.
///
/// Built once and then shared read-only. Selection among competing
/// templates is, in order:
///
/// 1. the match consuming the most path segments (full matches beat prefix
///    matches)
/// 2. the template with the most literal segments, then one without a
///    catch-all
/// 3. the earliest registration
///
/// # Example
///
/// ```rust
/// use hermes_router::RequestMapper;
///
/// let mut mapper = RequestMapper::new();
/// mapper.insert("/widgets/{id}", "widget").unwrap();
/// mapper.insert_prefix("/widgets/{id}", "locator").unwrap();
///
/// let m = mapper.map("/widgets/42").unwrap();
/// assert_eq!(*m.value, "widget");
/// assert_eq!(m.remaining, "");
///
/// let m = mapper.map("/widgets/42/history").unwrap();
/// assert_eq!(*m.value, "locator");
/// assert_eq!(m.path_values.get("id"), Some("42"));
/// assert_eq!(m.remaining, "/history");
/// ```
pub struct RequestMapper<T> {
    root: Node,
    routes: Vec<Route<T>>,
}

impl<T> Default for RequestMapper<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for RequestMapper<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestMapper")
            .field(
                "templates",
                &self.routes.iter().map(|r| r.template.as_str()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl<T> RequestMapper<T> {
    /// Creates an empty mapper.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: Node::root(),
            routes: Vec::new(),
        }
    }

    /// Registers a template that must match the whole path.
    pub fn insert(&mut self, template: &str, value: T) -> Result<(), TemplateError> {
        self.add(template, value, false)
    }

    /// Registers a template that may match a leading part of the path,
    /// leaving the rest as [`RequestMatch::remaining`].
    pub fn insert_prefix(&mut self, template: &str, value: T) -> Result<(), TemplateError> {
        self.add(template, value, true)
    }

    fn add(&mut self, template: &str, value: T, prefix: bool) -> Result<(), TemplateError> {
        let template = PathTemplate::parse(template)?;
        let route = self.routes.len();
        self.root.insert(template.segments(), Terminal { route, prefix });
        self.routes.push(Route {
            template,
            value,
            prefix,
        });
        Ok(())
    }

    /// Number of registered templates.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Iterates over registered templates and values in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&PathTemplate, &T)> {
        self.routes.iter().map(|r| (&r.template, &r.value))
    }

    /// Maps `path` to the best matching template.
    ///
    /// Never fails: an unmatched path yields `None` and the caller decides
    /// what that means.
    pub fn map(&self, path: &str) -> Option<RequestMatch<'_, T>> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut candidates = Vec::new();
        self.root
            .collect(&segments, 0, &mut Vec::new(), &mut candidates);

        let best = candidates.into_iter().min_by(|a, b| {
            b.consumed
                .cmp(&a.consumed)
                .then_with(|| {
                    let ta = &self.routes[a.route].template;
                    let tb = &self.routes[b.route].template;
                    tb.literal_count()
                        .cmp(&ta.literal_count())
                        .then_with(|| ta.has_wildcard().cmp(&tb.has_wildcard()))
                })
                .then_with(|| a.route.cmp(&b.route))
        })?;

        Some(self.build_match(best, &segments))
    }

    fn build_match(&self, candidate: Candidate<'_>, segments: &[&str]) -> RequestMatch<'_, T> {
        let route = &self.routes[candidate.route];
        let path_values = route
            .template
            .param_names()
            .zip(candidate.values)
            .map(|(name, raw)| (name.to_string(), decode(&raw)))
            .collect();

        let remaining = if candidate.consumed < segments.len() && route.prefix {
            format!("/{}", segments[candidate.consumed..].join("/"))
        } else {
            String::new()
        };

        RequestMatch {
            value: &route.value,
            template: &route.template,
            path_values,
            remaining,
        }
    }
}

fn decode(raw: &str) -> String {
    urlencoding::decode(raw).map_or_else(|_| raw.to_string(), |v| v.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widget_scenario() {
        let mut mapper = RequestMapper::new();
        mapper.insert("/widgets/{id}", 1).unwrap();

        let m = mapper.map("/widgets/42").unwrap();
        assert_eq!(*m.value, 1);
        assert_eq!(m.path_values.into_values(), vec!["42"]);
        assert_eq!(m.remaining, "");
    }

    #[test]
    fn test_no_match_returns_none() {
        let mut mapper = RequestMapper::new();
        mapper.insert("/widgets/{id}", 1).unwrap();

        assert!(mapper.map("/gadgets/42").is_none());
        assert!(mapper.map("/widgets").is_none());
        assert!(mapper.map("").is_none());
    }

    #[test]
    fn test_root_template() {
        let mut mapper = RequestMapper::new();
        mapper.insert("/", "root").unwrap();
        assert_eq!(*mapper.map("/").unwrap().value, "root");
    }

    #[test]
    fn test_literal_beats_param() {
        let mut mapper = RequestMapper::new();
        mapper.insert("/users/{id}", "by-id").unwrap();
        mapper.insert("/users/me", "me").unwrap();

        assert_eq!(*mapper.map("/users/me").unwrap().value, "me");
        assert_eq!(*mapper.map("/users/7").unwrap().value, "by-id");
    }

    #[test]
    fn test_registration_order_breaks_ties() {
        let mut mapper = RequestMapper::new();
        mapper.insert("/items/{a}", "first").unwrap();
        mapper.insert("/items/{b}", "second").unwrap();

        let m = mapper.map("/items/x").unwrap();
        assert_eq!(*m.value, "first");
        assert_eq!(m.path_values.get("a"), Some("x"));
    }

    #[test]
    fn test_longest_prefix_wins() {
        let mut mapper = RequestMapper::new();
        mapper.insert_prefix("/a", "short").unwrap();
        mapper.insert_prefix("/a/{b}", "long").unwrap();

        let m = mapper.map("/a/1/2").unwrap();
        assert_eq!(*m.value, "long");
        assert_eq!(m.remaining, "/2");
    }

    #[test]
    fn test_full_match_beats_prefix() {
        let mut mapper = RequestMapper::new();
        mapper.insert_prefix("/widgets/{id}", "locator").unwrap();
        mapper.insert("/widgets/{id}/history", "history").unwrap();

        let m = mapper.map("/widgets/42/history").unwrap();
        assert_eq!(*m.value, "history");
        assert_eq!(m.remaining, "");
    }

    #[test]
    fn test_prefix_full_match_has_empty_remaining() {
        let mut mapper = RequestMapper::new();
        mapper.insert_prefix("/widgets/{id}", "locator").unwrap();
        assert_eq!(mapper.map("/widgets/42").unwrap().remaining, "");
    }

    #[test]
    fn test_values_are_percent_decoded() {
        let mut mapper = RequestMapper::new();
        mapper.insert("/files/{name}", ()).unwrap();

        let m = mapper.map("/files/hello%20world").unwrap();
        assert_eq!(m.path_values.get("name"), Some("hello world"));
    }

    #[test]
    fn test_invalid_escape_kept_raw() {
        let mut mapper = RequestMapper::new();
        mapper.insert("/files/{name}", ()).unwrap();

        let m = mapper.map("/files/%ff").unwrap();
        assert_eq!(m.path_values.get("name"), Some("%ff"));
    }

    #[test]
    fn test_wildcard_lowest_priority() {
        let mut mapper = RequestMapper::new();
        mapper.insert("/files/*path", "any").unwrap();
        mapper.insert("/files/{dir}/{name}", "two").unwrap();

        assert_eq!(*mapper.map("/files/a/b").unwrap().value, "two");
        let m = mapper.map("/files/a/b/c").unwrap();
        assert_eq!(*m.value, "any");
        assert_eq!(m.path_values.get("path"), Some("a/b/c"));
    }

    #[test]
    fn test_iter_in_registration_order() {
        let mut mapper = RequestMapper::new();
        mapper.insert("/b", 2).unwrap();
        mapper.insert("/a", 1).unwrap();
        let templates: Vec<_> = mapper.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(templates, vec!["/b", "/a"]);
        assert_eq!(mapper.len(), 2);
    }
}

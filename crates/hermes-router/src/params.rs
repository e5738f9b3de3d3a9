//! Extracted path parameter values.
//!
//! Values are kept in template declaration order so handlers can address
//! them by slot index as well as by name. A small-vector keeps the common
//! case (1-4 parameters) off the heap.

use smallvec::SmallVec;

/// Maximum number of parameters stored inline (stack allocated).
const INLINE_PARAMS: usize = 4;

/// Ordered `(name, value)` pairs extracted by a template match.
///
/// # Example
///
/// ```rust
/// use hermes_router::PathValues;
///
/// let mut values = PathValues::new();
/// values.push("orgId", "acme");
/// values.push("userId", "123");
///
/// assert_eq!(values.get("userId"), Some("123"));
/// assert_eq!(values.get_index(0), Some("acme"));
/// assert_eq!(values.get("unknown"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PathValues {
    inner: SmallVec<[(String, String); INLINE_PARAMS]>,
}

impl PathValues {
    /// Creates a new empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.push((name.into(), value.into()));
    }

    /// Returns the first value bound to `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns the value in slot `index`.
    #[must_use]
    pub fn get_index(&self, index: usize) -> Option<&str> {
        self.inner.get(index).map(|(_, v)| v.as_str())
    }

    /// Returns true if there are no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns an iterator over `(name, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Returns the values alone, in order.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.inner.iter().map(|(_, v)| v.as_str())
    }

    /// Consumes the set, returning the values in order.
    #[must_use]
    pub fn into_values(self) -> Vec<String> {
        self.inner.into_iter().map(|(_, v)| v).collect()
    }
}

impl<'a> IntoIterator for &'a PathValues {
    type Item = (&'a str, &'a str);
    type IntoIter = std::iter::Map<
        std::slice::Iter<'a, (String, String)>,
        fn(&'a (String, String)) -> (&'a str, &'a str),
    >;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for PathValues {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_get() {
        let mut values = PathValues::new();
        values.push("id", "123");
        values.push("name", "alice");

        assert_eq!(values.get("id"), Some("123"));
        assert_eq!(values.get("name"), Some("alice"));
        assert_eq!(values.get("unknown"), None);
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_index_order() {
        let values: PathValues = vec![
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), "2".to_string()),
        ]
        .into_iter()
        .collect();

        assert_eq!(values.get_index(1), Some("2"));
        assert_eq!(values.get_index(2), None);
        assert_eq!(values.into_values(), vec!["1", "2"]);
    }

    #[test]
    fn test_duplicate_names_keep_first() {
        let mut values = PathValues::new();
        values.push("id", "outer");
        values.push("id", "inner");
        assert_eq!(values.get("id"), Some("outer"));
        assert_eq!(values.values().collect::<Vec<_>>(), vec!["outer", "inner"]);
    }
}

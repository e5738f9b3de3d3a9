//! Path template parsing.
//!
//! A template is a `/`-separated sequence of segments. Each segment is one of:
//!
//! - a literal (`widgets`)
//! - a named parameter (`{id}`)
//! - a trailing catch-all (`*rest`), which must be the last segment

use std::fmt;

use thiserror::Error;

/// Error raised when a path template cannot be compiled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// A `{}` segment without a name.
    #[error("empty parameter name in template '{0}'")]
    EmptyParamName(String),

    /// A segment with mismatched or embedded braces.
    #[error("malformed segment '{segment}' in template '{template}'")]
    MalformedSegment {
        /// Full template text
        template: String,
        /// The offending segment
        segment: String,
    },

    /// A catch-all segment that is followed by more segments.
    #[error("catch-all must be the last segment in template '{0}'")]
    WildcardNotLast(String),
}

/// Kind of a single template segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentKind {
    /// Literal text that must match exactly.
    Static,
    /// Named parameter capturing exactly one segment.
    Param(String),
    /// Named catch-all capturing every remaining segment.
    Wildcard(String),
}

/// One parsed segment of a [`PathTemplate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Raw text of the segment as written in the template.
    pub text: String,
    /// What the segment matches.
    pub kind: SegmentKind,
}

/// A compiled path template such as `/widgets/{id}/history`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    /// Parses a template string.
    ///
    /// Leading, trailing and repeated slashes are ignored, so `/a/b`,
    /// `a/b/` and `//a//b` compile to the same template.
    pub fn parse(template: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let raw: Vec<&str> = template.split('/').filter(|s| !s.is_empty()).collect();

        for (i, text) in raw.iter().enumerate() {
            let kind = if let Some(inner) = text.strip_prefix('{') {
                let name = inner.strip_suffix('}').ok_or_else(|| {
                    TemplateError::MalformedSegment {
                        template: template.to_string(),
                        segment: (*text).to_string(),
                    }
                })?;
                let name = name.trim();
                if name.is_empty() {
                    return Err(TemplateError::EmptyParamName(template.to_string()));
                }
                if name.contains(['{', '}']) {
                    return Err(TemplateError::MalformedSegment {
                        template: template.to_string(),
                        segment: (*text).to_string(),
                    });
                }
                SegmentKind::Param(name.to_string())
            } else if let Some(name) = text.strip_prefix('*') {
                if i + 1 != raw.len() {
                    return Err(TemplateError::WildcardNotLast(template.to_string()));
                }
                if name.is_empty() {
                    return Err(TemplateError::EmptyParamName(template.to_string()));
                }
                SegmentKind::Wildcard(name.to_string())
            } else if text.contains(['{', '}']) {
                return Err(TemplateError::MalformedSegment {
                    template: template.to_string(),
                    segment: (*text).to_string(),
                });
            } else {
                SegmentKind::Static
            };

            segments.push(Segment {
                text: (*text).to_string(),
                kind,
            });
        }

        Ok(Self {
            source: template.to_string(),
            segments,
        })
    }

    /// Returns the template as originally written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Returns the parsed segments.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of literal segments; used to rank competing matches.
    pub fn literal_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| s.kind == SegmentKind::Static)
            .count()
    }

    /// Whether the template ends in a catch-all segment.
    pub fn has_wildcard(&self) -> bool {
        matches!(
            self.segments.last(),
            Some(Segment {
                kind: SegmentKind::Wildcard(_),
                ..
            })
        )
    }

    /// Parameter names in declaration order, including a trailing catch-all.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match &s.kind {
            SegmentKind::Param(name) | SegmentKind::Wildcard(name) => Some(name.as_str()),
            SegmentKind::Static => None,
        })
    }

    /// Number of parameters the template binds.
    pub fn param_count(&self) -> usize {
        self.param_names().count()
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_static() {
        let t = PathTemplate::parse("/users/list").unwrap();
        assert_eq!(t.segments().len(), 2);
        assert_eq!(t.segments()[0].kind, SegmentKind::Static);
        assert_eq!(t.literal_count(), 2);
        assert_eq!(t.param_count(), 0);
    }

    #[test]
    fn test_parse_param() {
        let t = PathTemplate::parse("/users/{id}").unwrap();
        assert_eq!(t.segments()[1].kind, SegmentKind::Param("id".to_string()));
        assert_eq!(t.param_names().collect::<Vec<_>>(), vec!["id"]);
        assert_eq!(t.literal_count(), 1);
    }

    #[test]
    fn test_parse_wildcard() {
        let t = PathTemplate::parse("/files/*path").unwrap();
        assert_eq!(
            t.segments()[1].kind,
            SegmentKind::Wildcard("path".to_string())
        );
        assert_eq!(t.param_count(), 1);
    }

    #[test]
    fn test_parse_root() {
        let t = PathTemplate::parse("/").unwrap();
        assert!(t.segments().is_empty());
    }

    #[test]
    fn test_slashes_are_normalized() {
        let a = PathTemplate::parse("/a/{b}").unwrap();
        let b = PathTemplate::parse("a//{b}/").unwrap();
        assert_eq!(a.segments(), b.segments());
    }

    #[test]
    fn test_wildcard_not_last() {
        let err = PathTemplate::parse("/files/*path/meta").unwrap_err();
        assert!(matches!(err, TemplateError::WildcardNotLast(_)));
    }

    #[test]
    fn test_empty_param_name() {
        assert!(matches!(
            PathTemplate::parse("/users/{}"),
            Err(TemplateError::EmptyParamName(_))
        ));
    }

    #[test]
    fn test_malformed_segment() {
        assert!(matches!(
            PathTemplate::parse("/users/{id"),
            Err(TemplateError::MalformedSegment { .. })
        ));
        assert!(matches!(
            PathTemplate::parse("/users/a{id}"),
            Err(TemplateError::MalformedSegment { .. })
        ));
    }
}

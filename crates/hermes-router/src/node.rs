//! Radix tree node implementation.
//!
//! Each node represents one path segment. Nodes do not own route values;
//! they hold indices into the owning [`RequestMapper`](crate::RequestMapper)
//! so the tree shape stays independent of the value type.

use std::borrow::Cow;

use crate::template::{Segment, SegmentKind};

/// A template ending at a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Terminal {
    /// Registration index of the route.
    pub route: usize,
    /// Whether the route may match a prefix of the path.
    pub prefix: bool,
}

/// A raw match found while walking the tree.
#[derive(Debug, Clone)]
pub(crate) struct Candidate<'p> {
    pub route: usize,
    pub values: Vec<Cow<'p, str>>,
    /// Number of request path segments consumed.
    pub consumed: usize,
}

/// A node in the radix tree.
#[derive(Debug, Clone)]
pub struct Node {
    /// The path segment this node represents
    segment: String,

    /// The kind of segment (static, param, or wildcard)
    kind: SegmentKind,

    /// Routes whose template ends at this node
    terminals: Vec<Terminal>,

    /// Static children, sorted by segment for binary search
    static_children: Vec<Node>,

    /// Parameter child (at most one per node)
    param_child: Option<Box<Node>>,

    /// Wildcard child (at most one per node, always a leaf)
    wildcard_child: Option<Box<Node>>,
}

impl Node {
    fn new(segment: impl Into<String>, kind: SegmentKind) -> Self {
        Self {
            segment: segment.into(),
            kind,
            terminals: Vec::new(),
            static_children: Vec::new(),
            param_child: None,
            wildcard_child: None,
        }
    }

    /// Creates a root node for the tree.
    #[must_use]
    pub fn root() -> Self {
        Self::new("", SegmentKind::Static)
    }

    /// Returns the segment text this node matches.
    pub fn segment(&self) -> &str {
        &self.segment
    }

    /// Returns the kind of this node.
    pub fn kind(&self) -> &SegmentKind {
        &self.kind
    }

    /// Inserts template segments into the tree recursively.
    pub(crate) fn insert(&mut self, segments: &[Segment], terminal: Terminal) {
        let Some((first, rest)) = segments.split_first() else {
            self.terminals.push(terminal);
            return;
        };

        let child = match &first.kind {
            SegmentKind::Static => {
                match self
                    .static_children
                    .binary_search_by(|c| c.segment.as_str().cmp(&first.text))
                {
                    Ok(i) => &mut self.static_children[i],
                    Err(i) => {
                        self.static_children
                            .insert(i, Node::new(first.text.clone(), SegmentKind::Static));
                        &mut self.static_children[i]
                    }
                }
            }
            // Parameter names are resolved from the template, so templates with
            // differently named parameters at the same depth share one node.
            SegmentKind::Param(_) => self
                .param_child
                .get_or_insert_with(|| Box::new(Node::new("{}", first.kind.clone()))),
            SegmentKind::Wildcard(_) => self
                .wildcard_child
                .get_or_insert_with(|| Box::new(Node::new("*", first.kind.clone()))),
        };
        child.insert(rest, terminal);
    }

    /// Collects every route matching all of `segments`, or a prefix of them for
    /// prefix routes.
    pub(crate) fn collect<'p>(
        &self,
        segments: &[&'p str],
        depth: usize,
        values: &mut Vec<Cow<'p, str>>,
        out: &mut Vec<Candidate<'p>>,
    ) {
        let exhausted = depth == segments.len();
        for terminal in &self.terminals {
            if exhausted || terminal.prefix {
                out.push(Candidate {
                    route: terminal.route,
                    values: values.clone(),
                    consumed: depth,
                });
            }
        }
        if exhausted {
            return;
        }

        let segment = segments[depth];

        if let Some(child) = self.find_static_child(segment) {
            child.collect(segments, depth + 1, values, out);
        }

        if let Some(child) = &self.param_child {
            values.push(Cow::Borrowed(segment));
            child.collect(segments, depth + 1, values, out);
            values.pop();
        }

        if let Some(child) = &self.wildcard_child {
            values.push(Cow::Owned(segments[depth..].join("/")));
            for terminal in &child.terminals {
                out.push(Candidate {
                    route: terminal.route,
                    values: values.clone(),
                    consumed: segments.len(),
                });
            }
            values.pop();
        }
    }

    /// Finds a static child by segment using binary search.
    fn find_static_child(&self, segment: &str) -> Option<&Node> {
        self.static_children
            .binary_search_by(|c| c.segment.as_str().cmp(segment))
            .ok()
            .map(|i| &self.static_children[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::PathTemplate;

    fn tree(templates: &[(&str, bool)]) -> Node {
        let mut root = Node::root();
        for (route, (template, prefix)) in templates.iter().enumerate() {
            let t = PathTemplate::parse(template).unwrap();
            root.insert(t.segments(), Terminal { route, prefix: *prefix });
        }
        root
    }

    fn collect<'p>(root: &Node, path: &'p str) -> Vec<Candidate<'p>> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut out = Vec::new();
        root.collect(&segments, 0, &mut Vec::new(), &mut out);
        out
    }

    #[test]
    fn test_static_children_sorted() {
        let root = tree(&[("/b", false), ("/a", false), ("/c", false)]);
        let names: Vec<_> = root.static_children.iter().map(Node::segment).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_collect_static_and_param() {
        let root = tree(&[("/users/me", false), ("/users/{id}", false)]);
        let found = collect(&root, "/users/me");
        let routes: Vec<_> = found.iter().map(|c| c.route).collect();
        assert_eq!(routes, vec![0, 1]);
        assert_eq!(found[1].values, vec!["me"]);
    }

    #[test]
    fn test_param_backtracking_does_not_leak() {
        let root = tree(&[("/a/{x}/b", false), ("/a/{x}/{y}", false)]);
        let found = collect(&root, "/a/1/c");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].route, 1);
        assert_eq!(found[0].values, vec!["1", "c"]);
    }

    #[test]
    fn test_prefix_terminal_reports_consumed() {
        let root = tree(&[("/widgets/{id}", true)]);
        let found = collect(&root, "/widgets/42/history");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].consumed, 2);
    }

    #[test]
    fn test_full_terminal_rejects_longer_path() {
        let root = tree(&[("/widgets/{id}", false)]);
        assert!(collect(&root, "/widgets/42/history").is_empty());
    }

    #[test]
    fn test_wildcard_joins_rest() {
        let root = tree(&[("/files/*path", false)]);
        let found = collect(&root, "/files/images/logo.png");
        assert_eq!(found[0].values, vec!["images/logo.png"]);
        assert_eq!(found[0].consumed, 3);
    }

    #[test]
    fn test_wildcard_needs_a_segment() {
        let root = tree(&[("/files/*path", false)]);
        assert!(collect(&root, "/files").is_empty());
    }
}

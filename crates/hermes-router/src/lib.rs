//! Compiled path-template matching for Hermes.
//!
//! This crate turns a set of `(template, value)` registrations into a
//! radix tree that maps a normalized request path to the best matching
//! value, its ordered path parameter values, and whatever part of the path
//! was left unconsumed (for recursive sub-resource dispatch).
//!
//! # Features
//!
//! - **Radix Tree Matching**: segment-wise lookup with binary search over
//!   literal children
//! - **Path Parameters**: `{id}` segments, percent-decoded on extraction
//! - **Catch-alls**: trailing `*rest` segments
//! - **Prefix Templates**: templates that may leave a remaining suffix
//! - **Method Tables**: one mapper per HTTP method, with `Allow` support
//!
//! # Example
//!
//! ```rust
//! use hermes_router::RequestMapper;
//!
//! let mut mapper = RequestMapper::new();
//! mapper.insert("/widgets/{id}", "getWidget").unwrap();
//!
//! let m = mapper.map("/widgets/42").unwrap();
//! assert_eq!(*m.value, "getWidget");
//! assert_eq!(m.path_values.get("id"), Some("42"));
//! assert_eq!(m.remaining, "");
//!
//! assert!(mapper.map("/gadgets/42").is_none());
//! ```
//!
//! # Architecture
//!
//! ```text
//!                    (root)
//!                      │
//!              ┌───────┴───────┐
//!              │               │
//!           "widgets"       "files"
//!              │               │
//!            "{}"             "*"
//!          [full, prefix]    [full]
//!              │
//!          "history"
//!            [full]
//! ```

mod mapper;
mod method_table;
mod node;
mod params;
mod template;

pub use mapper::{RequestMapper, RequestMatch};
pub use method_table::MethodTable;
pub use node::Node;
pub use params::PathValues;
pub use template::{PathTemplate, Segment, SegmentKind, TemplateError};

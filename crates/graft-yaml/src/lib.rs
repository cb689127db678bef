//! # graft-yaml
//!
//! YAML in and out of graft document trees.
//!
//! Parsing is event driven over `yaml-rust2`, building [`graft_core::Node`]
//! trees directly:
//!
//! - anchors and aliases are resolved by copying the anchored node
//! - repeated mapping keys keep their first value; the rest are dropped with
//!   a warning
//! - quoted scalars (and `!!str`-tagged ones) always stay strings
//! - non-string keys are stringified
//!
//! ## Example
//!
//! ```rust
//! use graft_yaml::{emit, parse};
//!
//! let doc = parse("name: web\ninstances: 2\n").unwrap();
//! assert_eq!(doc.get("instances").and_then(|n| n.as_i64()), Some(2));
//! assert_eq!(emit(&doc).unwrap(), "name: web\ninstances: 2\n");
//! ```

mod emit;
mod error;
mod parser;

pub use emit::{emit, to_yaml};
pub use error::{Error, Result};
pub use parser::{parse, parse_document_root, parse_documents, parse_file};

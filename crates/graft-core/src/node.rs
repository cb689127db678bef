/*
 * node.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * The generic document tree that merging and evaluation operate on.
 */

//! The document tree.
//!
//! A [`Node`] is a scalar, a mapping with unique string keys, or a sequence.
//! Scalars reuse `yaml_rust2::Yaml` so that integers, floats, booleans and
//! null keep their YAML identity through a merge.

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use yaml_rust2::Yaml;

/// Keys consulted, in order, when a sequence element is addressed by name.
pub const NAME_FIELDS: [&str; 3] = ["name", "key", "id"];

/// A node in a document tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Atomic value (string, integer, float, boolean, null).
    Scalar(Yaml),

    /// Ordered list of nodes. Order is significant.
    Sequence(Vec<Node>),

    /// Mapping from unique string keys to nodes.
    Mapping(IndexMap<String, Node>),
}

impl Default for Node {
    fn default() -> Self {
        Node::null()
    }
}

impl Node {
    pub fn null() -> Self {
        Node::Scalar(Yaml::Null)
    }

    pub fn string(s: impl Into<String>) -> Self {
        Node::Scalar(Yaml::String(s.into()))
    }

    pub fn integer(i: i64) -> Self {
        Node::Scalar(Yaml::Integer(i))
    }

    pub fn boolean(b: bool) -> Self {
        Node::Scalar(Yaml::Boolean(b))
    }

    /// An empty mapping.
    pub fn mapping() -> Self {
        Node::Mapping(IndexMap::new())
    }

    /// Build a mapping from entries, dropping repeated keys.
    ///
    /// The first occurrence of a key wins; later duplicates are discarded with
    /// a warning rather than failing construction.
    pub fn from_entries<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Node)>,
    {
        let mut map = IndexMap::new();
        for (key, value) in entries {
            let key = key.into();
            if map.contains_key(&key) {
                tracing::warn!(key = %key, "duplicate mapping key dropped");
                continue;
            }
            map.insert(key, value);
        }
        Node::Mapping(map)
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Node::Scalar(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Node::Scalar(Yaml::Null))
    }

    pub fn is_mapping(&self) -> bool {
        matches!(self, Node::Mapping(_))
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, Node::Sequence(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::Scalar(Yaml::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Node::Scalar(yaml) => yaml.as_i64(),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&IndexMap<String, Node>> {
        match self {
            Node::Mapping(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_mapping_mut(&mut self) -> Option<&mut IndexMap<String, Node>> {
        match self {
            Node::Mapping(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Node]> {
        match self {
            Node::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_sequence_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Node::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Look up a key if this is a mapping.
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.as_mapping().and_then(|map| map.get(key))
    }

    /// Human-readable kind, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Mapping(_) => "map",
            Node::Sequence(_) => "list",
            Node::Scalar(yaml) => match yaml {
                Yaml::String(_) => "string",
                Yaml::Integer(_) => "integer",
                Yaml::Real(_) => "float",
                Yaml::Boolean(_) => "boolean",
                Yaml::Null => "null",
                _ => "scalar",
            },
        }
    }

    /// The identifying name of a sequence element, if it has one.
    ///
    /// Looks at the [`NAME_FIELDS`] of a mapping in order and returns the
    /// first one holding a scalar.
    pub fn name_of(&self) -> Option<String> {
        let map = self.as_mapping()?;
        NAME_FIELDS
            .iter()
            .find_map(|field| map.get(*field).and_then(Node::scalar_string))
    }

    /// Render a scalar as text. Returns `None` for null and composites.
    pub fn scalar_string(&self) -> Option<String> {
        match self {
            Node::Scalar(yaml) => match yaml {
                Yaml::String(s) | Yaml::Real(s) => Some(s.clone()),
                Yaml::Integer(i) => Some(i.to_string()),
                Yaml::Boolean(b) => Some(b.to_string()),
                _ => None,
            },
            _ => None,
        }
    }
}

impl From<&str> for Node {
    fn from(s: &str) -> Self {
        Node::string(s)
    }
}

impl From<String> for Node {
    fn from(s: String) -> Self {
        Node::string(s)
    }
}

impl From<Vec<Node>> for Node {
    fn from(items: Vec<Node>) -> Self {
        Node::Sequence(items)
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Node::Scalar(yaml) => match yaml {
                Yaml::String(s) => serializer.serialize_str(s),
                Yaml::Integer(i) => serializer.serialize_i64(*i),
                Yaml::Real(s) => match s.parse::<f64>() {
                    Ok(f) => serializer.serialize_f64(f),
                    Err(_) => serializer.serialize_str(s),
                },
                Yaml::Boolean(b) => serializer.serialize_bool(*b),
                _ => serializer.serialize_unit(),
            },
            Node::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Node::Mapping(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

/// Build a [`Node`] inline. Used heavily by tests.
///
/// ```
/// use graft_core::node;
///
/// let n = node!({ "name" => "web", "instances" => 2 });
/// assert_eq!(n.get("instances").and_then(|v| v.as_i64()), Some(2));
/// ```
#[macro_export]
macro_rules! node {
    (null) => { $crate::Node::null() };
    ([ $($item:tt),* $(,)? ]) => {
        $crate::Node::Sequence(vec![ $( $crate::node!($item) ),* ])
    };
    ({ $($key:literal => $value:tt),* $(,)? }) => {
        $crate::Node::from_entries::<&str, Vec<(&str, $crate::Node)>>(
            vec![ $( ($key, $crate::node!($value)) ),* ]
        )
    };
    ($other:expr) => { $crate::Node::from($other) };
}

impl From<i64> for Node {
    fn from(i: i64) -> Self {
        Node::integer(i)
    }
}

impl From<i32> for Node {
    fn from(i: i32) -> Self {
        Node::integer(i64::from(i))
    }
}

impl From<bool> for Node {
    fn from(b: bool) -> Self {
        Node::boolean(b)
    }
}

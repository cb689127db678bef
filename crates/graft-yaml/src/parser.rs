//! YAML parser that builds graft `Node` trees.

use crate::{Error, Result};
use graft_core::Node;
use indexmap::IndexMap;
use std::collections::HashMap;
use yaml_rust2::Yaml;
use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser, Tag};
use yaml_rust2::scanner::{Marker, TScalarStyle};

/// Parse a single YAML document.
///
/// If the input contains multiple documents, only the first one is parsed.
///
/// # Example
///
/// ```rust
/// use graft_yaml::parse;
///
/// let doc = parse("meta: { name: web }").unwrap();
/// assert!(doc.is_mapping());
/// ```
///
/// # Errors
///
/// Returns an error if the YAML is invalid or contains no document.
pub fn parse(content: &str) -> Result<Node> {
    parse_impl(content, None)
}

/// Parse a single YAML document, naming `filename` in any error.
pub fn parse_file(content: &str, filename: &str) -> Result<Node> {
    parse_impl(content, Some(filename))
}

/// Parse every document in a multi-document stream.
pub fn parse_documents(content: &str) -> Result<Vec<Node>> {
    let mut builder = NodeBuilder::new();
    Parser::new_from_str(content).load(&mut builder, true)?;
    builder.finish()
}

/// Parse a document that must have a mapping at its root.
///
/// This is the form every merge input has to take.
pub fn parse_document_root(content: &str, filename: &str) -> Result<Node> {
    let doc = parse_file(content, filename)?;
    if !doc.is_mapping() {
        return Err(Error::InvalidStructure {
            message: format!("root of document is a {}, not a map", doc.kind()),
        }
        .in_file(Some(filename)));
    }
    Ok(doc)
}

fn parse_impl(content: &str, filename: Option<&str>) -> Result<Node> {
    let mut builder = NodeBuilder::new();
    Parser::new_from_str(content)
        .load(&mut builder, false) // false = single document only
        .map_err(|e| Error::from(e).in_file(filename))?;

    builder
        .finish()
        .map_err(|e| e.in_file(filename))?
        .into_iter()
        .next()
        .ok_or_else(|| {
            Error::ParseError {
                message: "No YAML document found".into(),
            }
            .in_file(filename)
        })
}

/// A collection being constructed during parsing.
enum Frame {
    Sequence {
        anchor: usize,
        items: Vec<Node>,
    },
    Mapping {
        anchor: usize,
        entries: IndexMap<String, Node>,
        /// Key waiting for its value.
        key: Option<String>,
    },
}

/// Event receiver that assembles `Node` trees.
struct NodeBuilder {
    stack: Vec<Frame>,
    documents: Vec<Node>,
    anchors: HashMap<usize, Node>,
    /// First problem hit; events cannot return errors directly.
    error: Option<Error>,
}

impl NodeBuilder {
    fn new() -> Self {
        Self {
            stack: Vec::new(),
            documents: Vec::new(),
            anchors: HashMap::new(),
            error: None,
        }
    }

    fn finish(self) -> Result<Vec<Node>> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.documents),
        }
    }

    fn fail(&mut self, message: String) {
        if self.error.is_none() {
            self.error = Some(Error::InvalidStructure { message });
        }
    }

    fn remember(&mut self, anchor: usize, node: &Node) {
        if anchor > 0 {
            self.anchors.insert(anchor, node.clone());
        }
    }

    fn push_complete(&mut self, node: Node, marker: Marker) {
        let Some(frame) = self.stack.last_mut() else {
            self.documents.push(node);
            return;
        };

        let problem = match frame {
            Frame::Sequence { items, .. } => {
                items.push(node);
                None
            }
            Frame::Mapping { entries, key, .. } => match key.take() {
                Some(name) => {
                    if entries.contains_key(&name) {
                        tracing::warn!(key = %name, line = marker.line(), "duplicate mapping key dropped");
                    } else {
                        entries.insert(name, node);
                    }
                    None
                }
                None => match key_text(&node) {
                    Some(text) => {
                        *key = Some(text);
                        None
                    }
                    None => Some(format!(
                        "mapping key at line {} is a {}; only scalar keys are supported",
                        marker.line(),
                        node.kind()
                    )),
                },
            },
        };
        if let Some(message) = problem {
            self.fail(message);
        }
    }
}

/// Keys are always strings in a graft tree.
fn key_text(key: &Node) -> Option<String> {
    if key.is_null() {
        return Some("null".to_string());
    }
    key.scalar_string()
}

impl MarkedEventReceiver for NodeBuilder {
    fn on_event(&mut self, ev: Event, marker: Marker) {
        if self.error.is_some() {
            return;
        }

        match ev {
            Event::Nothing
            | Event::StreamStart
            | Event::StreamEnd
            | Event::DocumentStart
            | Event::DocumentEnd => {}

            Event::Scalar(value, style, anchor, tag) => {
                let node = Node::Scalar(scalar_value(&value, style, tag.as_ref()));
                self.remember(anchor, &node);
                self.push_complete(node, marker);
            }

            Event::SequenceStart(anchor, _tag) => {
                self.stack.push(Frame::Sequence {
                    anchor,
                    items: Vec::new(),
                });
            }

            Event::SequenceEnd => match self.stack.pop() {
                Some(Frame::Sequence { anchor, items }) => {
                    let node = Node::Sequence(items);
                    self.remember(anchor, &node);
                    self.push_complete(node, marker);
                }
                _ => self.fail("unbalanced sequence end".to_string()),
            },

            Event::MappingStart(anchor, _tag) => {
                self.stack.push(Frame::Mapping {
                    anchor,
                    entries: IndexMap::new(),
                    key: None,
                });
            }

            Event::MappingEnd => match self.stack.pop() {
                Some(Frame::Mapping { anchor, entries, .. }) => {
                    let node = Node::Mapping(entries);
                    self.remember(anchor, &node);
                    self.push_complete(node, marker);
                }
                _ => self.fail("unbalanced mapping end".to_string()),
            },

            Event::Alias(anchor) => match self.anchors.get(&anchor) {
                Some(node) => {
                    let node = node.clone();
                    self.push_complete(node, marker);
                }
                None => self.fail(format!("unknown anchor referenced at line {}", marker.line())),
            },
        }
    }
}

/// Resolve a scalar's type.
///
/// Only plain, untagged scalars are inferred; anything quoted, block-styled
/// or tagged `!!str` stays a string.
fn scalar_value(value: &str, style: TScalarStyle, tag: Option<&Tag>) -> Yaml {
    let plain = matches!(style, TScalarStyle::Plain);
    if !plain || tag.is_some_and(|t| t.suffix == "str") {
        return Yaml::String(value.to_string());
    }

    if let Ok(i) = value.parse::<i64>() {
        return Yaml::Integer(i);
    }

    if value.parse::<f64>().is_ok() && value.chars().any(|c| c.is_ascii_digit()) {
        return Yaml::Real(value.to_string());
    }

    match value {
        "true" | "True" | "TRUE" | "yes" | "Yes" | "YES" | "on" | "On" | "ON" => Yaml::Boolean(true),
        "false" | "False" | "FALSE" | "no" | "No" | "NO" | "off" | "Off" | "OFF" => {
            Yaml::Boolean(false)
        }
        "null" | "Null" | "NULL" | "~" | "" => Yaml::Null,
        _ => Yaml::String(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scalars() {
        let doc = parse("a: 42\nb: 1.5\nc: true\nd: ~\ne: text\nf: \"42\"\ng: '(( grab a ))'\nh: !!str 7").unwrap();
        assert_eq!(doc.get("a").and_then(Node::as_i64), Some(42));
        assert_eq!(doc.get("b").map(Node::kind), Some("float"));
        assert_eq!(doc.get("c").map(Node::kind), Some("boolean"));
        assert!(doc.get("d").is_some_and(Node::is_null));
        assert_eq!(doc.get("e").and_then(Node::as_str), Some("text"));
        assert_eq!(doc.get("f").and_then(Node::as_str), Some("42"));
        assert_eq!(doc.get("g").and_then(Node::as_str), Some("(( grab a ))"));
        assert_eq!(doc.get("h").and_then(Node::as_str), Some("7"));
    }

    #[test]
    fn test_parse_nested_structure() {
        let doc = parse(
            r#"
jobs:
  - name: web
    instances: 2
  - name: db
"#,
        )
        .unwrap();
        let jobs = doc.get("jobs").and_then(Node::as_sequence).unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].name_of().as_deref(), Some("web"));
    }

    #[test]
    fn test_duplicate_keys_keep_first() {
        let doc = parse("a: 1\nb: 2\na: 3\n").unwrap();
        let map = doc.as_mapping().unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["a"].as_i64(), Some(1));
    }

    #[test]
    fn test_anchors_and_aliases() {
        let doc = parse("base: &base { x: 1 }\ncopy: *base\nlist: [&v 5, *v]\n").unwrap();
        assert_eq!(doc.get("copy"), doc.get("base"));
        let list = doc.get("list").and_then(Node::as_sequence).unwrap();
        assert_eq!(list[1].as_i64(), Some(5));
    }

    #[test]
    fn test_non_string_keys_stringified() {
        let doc = parse("1: one\ntrue: yes\n").unwrap();
        let map = doc.as_mapping().unwrap();
        assert!(map.contains_key("1"));
        assert!(map.contains_key("true"));
    }

    #[test]
    fn test_complex_keys_rejected() {
        let err = parse("? [a, b]\n: value\n").unwrap_err();
        assert!(matches!(err, Error::InvalidStructure { .. }));
    }

    #[test]
    fn test_parse_documents() {
        let docs = parse_documents("a: 1\n---\nb: 2\n").unwrap();
        assert_eq!(docs.len(), 2);
        assert!(docs[1].get("b").is_some());
    }

    #[test]
    fn test_document_root_must_be_map() {
        let err = parse_document_root("- a\n- b\n", "list.yml").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid YAML structure: list.yml: root of document is a list, not a map"
        );
        assert!(parse_document_root("a: 1", "ok.yml").is_ok());
    }

    #[test]
    fn test_syntax_error_names_file() {
        let err = parse_file("a: [1, 2", "broken.yml").unwrap_err();
        assert!(err.to_string().starts_with("Parse error: broken.yml: "));
    }
}

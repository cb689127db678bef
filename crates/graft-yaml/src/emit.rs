//! Serialization of `Node` trees back to YAML text.

use crate::Result;
use graft_core::Node;
use yaml_rust2::{Yaml, YamlEmitter};

/// Convert a tree into a `yaml-rust2` value, keeping mapping order.
pub fn to_yaml(node: &Node) -> Yaml {
    match node {
        Node::Scalar(yaml) => yaml.clone(),
        Node::Sequence(items) => Yaml::Array(items.iter().map(to_yaml).collect()),
        Node::Mapping(entries) => Yaml::Hash(
            entries
                .iter()
                .map(|(key, value)| (Yaml::String(key.clone()), to_yaml(value)))
                .collect(),
        ),
    }
}

/// Render a tree as a YAML document, without the leading `---` marker.
pub fn emit(node: &Node) -> Result<String> {
    let mut out = String::new();
    YamlEmitter::new(&mut out).dump(&to_yaml(node))?;

    let body = out
        .strip_prefix("---\n")
        .or_else(|| out.strip_prefix("---"))
        .unwrap_or(&out)
        .trim_start_matches(' ');
    Ok(format!("{}\n", body))
}

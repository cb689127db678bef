/*
 * resolve.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Plain path-string lookup for visitors that do not need a Cursor.
 */

//! Path-string lookup against a tree.
//!
//! This is the lightweight counterpart to [`Cursor::resolve`](crate::Cursor::resolve):
//! the path is split on `.` only, lists are indexed with `[n]` (or a bare
//! number) or searched by their elements' `name` field. Errors carry the
//! path trail up to the failing step.

use crate::error::{NotFoundError, NotFoundReason};
use crate::node::Node;

/// Look up a dotted path in `tree`.
pub fn resolve_node<'a>(path: &str, tree: &'a Node) -> Result<&'a Node, NotFoundError> {
    let steps: Vec<&str> = path
        .trim_start_matches("$.")
        .split('.')
        .filter(|s| !s.is_empty())
        .collect();
    resolve_steps(&steps, tree)
}

fn list_index(step: &str) -> Option<usize> {
    let inner = step
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(step);
    inner.parse::<usize>().ok()
}

fn resolve_steps<'a>(steps: &[&str], node: &'a Node) -> Result<&'a Node, NotFoundError> {
    let Some((step, rest)) = steps.split_first() else {
        return Ok(node);
    };

    let next = match node {
        Node::Mapping(map) => map
            .get(*step)
            .ok_or_else(|| NotFoundError::missing(vec![step.to_string()]))?,
        Node::Sequence(list) => match list_index(step) {
            Some(index) => list.get(index).ok_or_else(|| NotFoundError {
                path: vec![step.to_string()],
                reason: NotFoundReason::OutOfBounds {
                    index,
                    len: list.len(),
                },
            })?,
            None => list
                .iter()
                .find(|item| item.get("name").and_then(Node::scalar_string).as_deref() == Some(*step))
                .ok_or_else(|| NotFoundError::missing(vec![step.to_string()]))?,
        },
        Node::Scalar(_) => {
            return Err(NotFoundError {
                path: vec![step.to_string()],
                reason: NotFoundReason::NoSubObjects { kind: node.kind() },
            });
        }
    };

    resolve_steps(rest, next).map_err(|e| e.within(step))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node;

    fn tree() -> Node {
        node!({
            "key" => {
                "list" => [
                    { "name" => "alpha", "value" => 1 },
                    { "name" => "beta", "value" => 2 }
                ],
                "leaf" => "text"
            }
        })
    }

    #[test]
    fn test_resolve_by_key_and_name() {
        let t = tree();
        assert_eq!(resolve_node("key.leaf", &t).unwrap().as_str(), Some("text"));
        assert_eq!(resolve_node("key.list.beta.value", &t).unwrap().as_i64(), Some(2));
        assert_eq!(resolve_node("$.key.leaf", &t).unwrap().as_str(), Some("text"));
    }

    #[test]
    fn test_resolve_by_index() {
        let t = tree();
        assert_eq!(resolve_node("key.list.[1].name", &t).unwrap().as_str(), Some("beta"));
        assert_eq!(resolve_node("key.list.0.name", &t).unwrap().as_str(), Some("alpha"));
    }

    #[test]
    fn test_index_out_of_bounds_cites_bound() {
        let t = tree();
        let err = resolve_node("key.list.2.name", &t).unwrap_err();
        assert_eq!(err.path, vec!["key", "list", "2"]);
        assert_eq!(err.reason, NotFoundReason::OutOfBounds { index: 2, len: 2 });
        assert!(err.to_string().contains("`$.key.list.2`"));
        assert!(err.to_string().contains("list has 2 entries"));
    }

    #[test]
    fn test_no_sub_objects_trace() {
        let t = tree();
        let err = resolve_node("key.leaf.deeper.still", &t).unwrap_err();
        assert_eq!(err.path, vec!["key", "leaf", "deeper"]);
        assert!(matches!(err.reason, NotFoundReason::NoSubObjects { .. }));
    }

    #[test]
    fn test_missing_name() {
        let t = tree();
        let err = resolve_node("key.list.gamma", &t).unwrap_err();
        assert_eq!(err.path, vec!["key", "list", "gamma"]);
        assert_eq!(err.reason, NotFoundReason::Missing);
    }
}

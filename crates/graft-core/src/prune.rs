/*
 * prune.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Removal of pruned paths after evaluation.
 */

use crate::cursor::Cursor;
use crate::node::Node;
use std::cmp::Ordering;

/// Component-wise order where list indices compare numerically.
fn compare_paths(a: &Cursor, b: &Cursor) -> Ordering {
    for (x, y) in a.components().iter().zip(b.components()) {
        let ord = match (x.parse::<usize>(), y.parse::<usize>()) {
            (Ok(x), Ok(y)) => x.cmp(&y),
            _ => x.cmp(y),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.depth().cmp(&b.depth())
}

/// Delete every path in `paths` from `tree`.
///
/// Paths are canonicalized first and removed last-index-first, so removing
/// one list element never shifts another pending removal. Paths that do not
/// resolve are skipped. Returns how many nodes were removed.
pub fn prune(tree: &mut Node, paths: &[Cursor]) -> usize {
    let mut targets: Vec<Cursor> = paths
        .iter()
        .filter(|path| !path.is_root())
        .filter_map(|path| match path.canonical(tree) {
            Ok(canonical) => Some(canonical),
            Err(e) => {
                tracing::debug!(path = %path, error = %e, "skipping prune of unresolvable path");
                None
            }
        })
        .collect();
    targets.sort_by(|a, b| compare_paths(b, a));
    targets.dedup();

    let mut removed = 0;
    for target in targets {
        let mut parent = target.clone();
        let Some(last) = parent.pop() else { continue };
        let Ok(container) = parent.resolve_mut(tree) else {
            continue;
        };
        let gone = match container {
            Node::Mapping(map) => map.shift_remove(&last).is_some(),
            Node::Sequence(items) => match last.parse::<usize>() {
                Ok(index) if index < items.len() => {
                    items.remove(index);
                    true
                }
                _ => false,
            },
            Node::Scalar(_) => false,
        };
        if gone {
            tracing::debug!(path = %target, "pruned");
            removed += 1;
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node;

    fn cursors(paths: &[&str]) -> Vec<Cursor> {
        paths.iter().map(|p| Cursor::parse(p).unwrap()).collect()
    }

    #[test]
    fn test_prune_keys_and_elements() {
        let mut tree = node!({
            "meta" => { "secret" => 1, "keep" => 2 },
            "list" => ["a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k"]
        });
        let removed = prune(&mut tree, &cursors(&["meta.secret", "list.2", "list.10", "list.9"]));
        assert_eq!(removed, 4);
        assert_eq!(
            tree,
            node!({
                "meta" => { "keep" => 2 },
                "list" => ["a", "b", "d", "e", "f", "g", "h", "i"]
            })
        );
    }

    #[test]
    fn test_prune_by_name_and_nested() {
        let mut tree = node!({
            "jobs" => [{ "name" => "web", "tmp" => 1 }, { "name" => "db" }]
        });
        let removed = prune(&mut tree, &cursors(&["jobs.web.tmp", "jobs.web", "jobs.db", "jobs.db"]));
        assert_eq!(removed, 3);
        assert_eq!(tree, node!({ "jobs" => [] }));
    }

    #[test]
    fn test_unresolvable_paths_skipped() {
        let mut tree = node!({ "a" => 1 });
        assert_eq!(prune(&mut tree, &cursors(&["missing.key", "$"])), 0);
        assert_eq!(tree, node!({ "a" => 1 }));
    }
}

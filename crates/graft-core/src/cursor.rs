/*
 * cursor.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Path addressing over document trees.
 */

//! Cursors: structured paths into a [`Node`] tree.
//!
//! # Syntax
//!
//! - `a.b.c` - dot-separated components
//! - `a[1][2]`, `a.[1]` - bracketed groups are independent components and
//!   may contain literal dots (`a[b.c]` has two components)
//! - a leading `$` component is the document root and is dropped
//! - `*` as a component is a wildcard for [`Cursor::glob`]
//!
//! In a list, a numeric component is an index; anything else is matched
//! against the [`NAME_FIELDS`](crate::node::NAME_FIELDS) of the list's mapping
//! elements. [`Cursor::canonical`] rewrites those name lookups to indices.

use crate::error::{NotFoundError, NotFoundReason, SyntaxError};
use crate::node::{NAME_FIELDS, Node};
use std::fmt;
use std::str::FromStr;

/// A path into a document tree. The empty cursor is the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cursor {
    nodes: Vec<String>,
}

/// Find the element of `list` addressed by `component`.
///
/// Numeric components index directly; others match by name.
fn list_lookup<'a>(list: &'a [Node], component: &str) -> Option<(usize, &'a Node)> {
    if let Ok(index) = component.parse::<usize>() {
        return list.get(index).map(|n| (index, n));
    }
    list.iter().enumerate().find(|(_, item)| {
        item.as_mapping().is_some_and(|map| {
            NAME_FIELDS.iter().any(|field| {
                map.get(*field)
                    .and_then(Node::scalar_string)
                    .is_some_and(|v| v == component)
            })
        })
    })
}

impl Cursor {
    /// The root cursor.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn from_components(nodes: Vec<String>) -> Self {
        Self { nodes }
    }

    /// Parse the textual form of a cursor.
    pub fn parse(text: &str) -> Result<Cursor, SyntaxError> {
        let mut nodes: Vec<String> = Vec::new();
        let mut current = String::new();
        let mut bracket_start: Option<usize> = None;

        fn push(nodes: &mut Vec<String>, current: &mut String) {
            if current.is_empty() {
                return;
            }
            if nodes.is_empty() && current == "$" {
                current.clear();
                return;
            }
            nodes.push(std::mem::take(current));
        }

        for (position, c) in text.chars().enumerate() {
            match c {
                '.' if bracket_start.is_none() => push(&mut nodes, &mut current),
                '[' => {
                    if bracket_start.is_some() {
                        return Err(SyntaxError {
                            problem: "unexpected '['".into(),
                            position,
                        });
                    }
                    push(&mut nodes, &mut current);
                    bracket_start = Some(position);
                }
                ']' => {
                    if bracket_start.is_none() {
                        return Err(SyntaxError {
                            problem: "unexpected ']'".into(),
                            position,
                        });
                    }
                    push(&mut nodes, &mut current);
                    bracket_start = None;
                }
                _ => current.push(c),
            }
        }

        if let Some(position) = bracket_start {
            return Err(SyntaxError {
                problem: "unterminated '['".into(),
                position,
            });
        }
        push(&mut nodes, &mut current);

        Ok(Cursor { nodes })
    }

    pub fn components(&self) -> &[String] {
        &self.nodes
    }

    pub fn depth(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_root(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn push(&mut self, component: impl Into<String>) {
        self.nodes.push(component.into());
    }

    /// Remove the trailing component. A no-op on the root.
    pub fn pop(&mut self) -> Option<String> {
        self.nodes.pop()
    }

    /// A new cursor one level deeper.
    pub fn child(&self, component: impl Into<String>) -> Cursor {
        let mut c = self.clone();
        c.push(component);
        c
    }

    /// The `n`th component; negative `n` counts from the end.
    ///
    /// Out-of-range offsets give an empty string.
    pub fn component(&self, n: isize) -> &str {
        let len = self.nodes.len() as isize;
        let index = if n < 0 { len + n } else { n };
        if index < 0 || index >= len {
            return "";
        }
        &self.nodes[index as usize]
    }

    /// The second-to-last component.
    pub fn parent(&self) -> &str {
        self.component(-2)
    }

    /// True iff `self` is a strict descendant of `other`.
    pub fn under(&self, other: &Cursor) -> bool {
        self.nodes.len() > other.nodes.len() && self.nodes.starts_with(&other.nodes)
    }

    /// Rendering prefixed with `$`, as used in diagnostics.
    pub fn qualified(&self) -> String {
        if self.is_root() {
            "$".to_string()
        } else {
            format!("$.{}", self)
        }
    }

    /// Resolve every component against `tree`, replacing name lookups in
    /// lists with numeric indices.
    pub fn canonical(&self, tree: &Node) -> Result<Cursor, NotFoundError> {
        let mut canon = Cursor::root();
        let mut here = tree;

        for component in &self.nodes {
            match here {
                Node::Mapping(map) => {
                    canon.push(component.clone());
                    here = map
                        .get(component)
                        .ok_or_else(|| NotFoundError::missing(canon.nodes.clone()))?;
                }
                Node::Sequence(list) => match list_lookup(list, component) {
                    Some((index, item)) => {
                        canon.push(index.to_string());
                        here = item;
                    }
                    None => {
                        canon.push(component.clone());
                        return Err(missing_in_list(canon.nodes, component, list.len()));
                    }
                },
                Node::Scalar(_) => {
                    canon.push(component.clone());
                    return Err(NotFoundError {
                        path: canon.nodes,
                        reason: NotFoundReason::NoSubObjects { kind: here.kind() },
                    });
                }
            }
        }

        Ok(canon)
    }

    /// Follow the cursor to a value.
    pub fn resolve<'a>(&self, tree: &'a Node) -> Result<&'a Node, NotFoundError> {
        let mut here = tree;
        for (depth, component) in self.nodes.iter().enumerate() {
            let seen = || self.nodes[..=depth].to_vec();
            here = match here {
                Node::Mapping(map) => map
                    .get(component)
                    .ok_or_else(|| NotFoundError::missing(seen()))?,
                Node::Sequence(list) => list_lookup(list, component)
                    .map(|(_, item)| item)
                    .ok_or_else(|| missing_in_list(seen(), component, list.len()))?,
                Node::Scalar(_) => {
                    return Err(NotFoundError {
                        path: seen(),
                        reason: NotFoundReason::NoSubObjects { kind: here.kind() },
                    });
                }
            };
        }
        Ok(here)
    }

    /// Mutable variant of [`Cursor::resolve`].
    pub fn resolve_mut<'a>(&self, tree: &'a mut Node) -> Result<&'a mut Node, NotFoundError> {
        let mut here = tree;
        for (depth, component) in self.nodes.iter().enumerate() {
            let seen = self.nodes[..=depth].to_vec();
            here = match here {
                Node::Mapping(map) => map
                    .get_mut(component)
                    .ok_or_else(|| NotFoundError::missing(seen))?,
                Node::Sequence(list) => {
                    let len = list.len();
                    match list_lookup(list, component).map(|(index, _)| index) {
                        Some(index) => &mut list[index],
                        None => return Err(missing_in_list(seen, component, len)),
                    }
                }
                scalar @ Node::Scalar(_) => {
                    return Err(NotFoundError {
                        path: seen,
                        reason: NotFoundReason::NoSubObjects { kind: scalar.kind() },
                    });
                }
            };
        }
        Ok(here)
    }

    /// Expand `*` components into every concrete cursor they match, in
    /// document order.
    ///
    /// Branches under a wildcard that do not contain the rest of the path are
    /// skipped; a miss on the non-wildcard prefix is an error.
    pub fn glob(&self, tree: &Node) -> Result<Vec<Cursor>, NotFoundError> {
        let mut found = Vec::new();
        glob_into(tree, &mut Cursor::root(), &self.nodes, false, &mut found)?;
        Ok(found)
    }
}

fn missing_in_list(path: Vec<String>, component: &str, len: usize) -> NotFoundError {
    let reason = match component.parse::<usize>() {
        Ok(index) => NotFoundReason::OutOfBounds { index, len },
        Err(_) => NotFoundReason::Missing,
    };
    NotFoundError { path, reason }
}

fn glob_into(
    node: &Node,
    here: &mut Cursor,
    rest: &[String],
    under_wildcard: bool,
    found: &mut Vec<Cursor>,
) -> Result<(), NotFoundError> {
    let Some((component, rest)) = rest.split_first() else {
        found.push(here.clone());
        return Ok(());
    };

    if component == "*" {
        match node {
            Node::Mapping(map) => {
                for (key, value) in map {
                    here.push(key.clone());
                    glob_into(value, here, rest, true, found)?;
                    here.pop();
                }
            }
            Node::Sequence(list) => {
                for (index, value) in list.iter().enumerate() {
                    here.push(index.to_string());
                    glob_into(value, here, rest, true, found)?;
                    here.pop();
                }
            }
            Node::Scalar(_) if under_wildcard => {}
            Node::Scalar(_) => {
                let mut path = here.nodes.clone();
                path.push(component.clone());
                return Err(NotFoundError {
                    path,
                    reason: NotFoundReason::NoSubObjects { kind: node.kind() },
                });
            }
        }
        return Ok(());
    }

    let step = match node {
        Node::Mapping(map) => map.get(component).map(|v| (component.clone(), v)),
        Node::Sequence(list) => list_lookup(list, component).map(|(i, v)| (i.to_string(), v)),
        Node::Scalar(_) => None,
    };

    match step {
        Some((canonical, next)) => {
            here.push(canonical);
            let result = glob_into(next, here, rest, under_wildcard, found);
            here.pop();
            result
        }
        None if under_wildcard => Ok(()),
        None => {
            let mut path = here.nodes.clone();
            path.push(component.clone());
            Err(NotFoundError::missing(path))
        }
    }
}

impl fmt::Display for Cursor {
    /// Components are joined with dots. A component that itself contains a
    /// dot is written in bracket form so the text re-parses to the same
    /// components.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, component) in self.nodes.iter().enumerate() {
            if component.contains('.') {
                write!(f, "[{}]", component)?;
            } else {
                if i > 0 {
                    f.write_str(".")?;
                }
                f.write_str(component)?;
            }
        }
        Ok(())
    }
}

impl FromStr for Cursor {
    type Err = SyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Cursor::parse(s)
    }
}

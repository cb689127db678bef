/*
 * postprocess.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Depth-first tree walks with an ignore/replace/error visitor.
 */

//! Post-processors.
//!
//! A post-processor is a visitor that is shown every node of a tree, depth
//! first, and answers with an [`Action`]. Sequence order is preserved;
//! mapping order never affects the result because a visitor only sees one
//! node at a time.
//!
//! A replacement is visited again, so a visitor that keeps producing new
//! work (a reference chain, say) is followed to its end. Each replacement
//! spends one unit of the depth budget. Running out is reported as a
//! [`Error::Cycle`] for that branch.

use crate::cursor::Cursor;
use crate::error::{Error, MultiError};
use crate::node::Node;
use crate::resolve::resolve_node;
use crate::syntax::{Token, parse_call, tokenize};

/// Replacement chains longer than this are treated as cycles.
pub const DEFAULT_DEPTH_BUDGET: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalOptions {
    pub depth_budget: usize,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            depth_budget: DEFAULT_DEPTH_BUDGET,
        }
    }
}

/// A visitor's answer for one node.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Leave the node alone and descend into it.
    Ignore,
    /// Substitute the node, then visit the replacement.
    Replace(Node),
    /// Abandon this branch and record the error.
    Error(Error),
}

/// Where the walk is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    /// Path with list elements addressed by index.
    pub cursor: Cursor,
    /// Path with list elements addressed by their `name` field when they
    /// have one. Used for diagnostics.
    pub named: Cursor,
}

impl Location {
    /// The diagnostic rendering, e.g. `$.jobs.web.instances`.
    pub fn path(&self) -> String {
        self.named.qualified()
    }

    fn key(&self, key: &str) -> Location {
        Location {
            cursor: self.cursor.child(key),
            named: self.named.child(key),
        }
    }

    fn element(&self, index: usize, item: &Node) -> Location {
        let name = item
            .get("name")
            .and_then(Node::scalar_string)
            .unwrap_or_else(|| index.to_string());
        Location {
            cursor: self.cursor.child(index.to_string()),
            named: self.named.child(name),
        }
    }
}

pub trait PostProcessor {
    fn visit(&mut self, node: &Node, at: &Location) -> Action;
}

/// Walk `tree` with the default depth budget.
pub fn walk(tree: &mut Node, visitor: &mut dyn PostProcessor) -> Result<(), MultiError> {
    walk_with_budget(tree, visitor, DEFAULT_DEPTH_BUDGET)
}

pub fn walk_with_budget(
    tree: &mut Node,
    visitor: &mut dyn PostProcessor,
    budget: usize,
) -> Result<(), MultiError> {
    let mut errors = MultiError::new();
    walk_node(tree, &Location::default(), budget, visitor, &mut errors);
    errors.into_result(())
}

fn walk_node(
    node: &mut Node,
    at: &Location,
    budget: usize,
    visitor: &mut dyn PostProcessor,
    errors: &mut MultiError,
) {
    if budget == 0 {
        errors.append(Error::cycle(
            at.path(),
            "possible recursion detected: depth budget exhausted",
        ));
        return;
    }

    match visitor.visit(node, at) {
        Action::Ignore => match node {
            Node::Mapping(map) => {
                for (key, value) in map.iter_mut() {
                    walk_node(value, &at.key(key), budget, visitor, errors);
                }
            }
            Node::Sequence(items) => {
                for (index, item) in items.iter_mut().enumerate() {
                    let child = at.element(index, item);
                    walk_node(item, &child, budget, visitor, errors);
                }
            }
            Node::Scalar(_) => {}
        },
        Action::Replace(replacement) => {
            *node = replacement;
            walk_node(node, at, budget - 1, visitor, errors);
        }
        Action::Error(e) => errors.append(e),
    }
}

/// Resolves `(( grab <path> ))` in a single pass.
///
/// Lookups go against a snapshot taken when the dereferencer is built, so a
/// chain of grabs is followed through the replacement loop rather than
/// through the changing tree.
#[derive(Debug, Clone)]
pub struct Dereferencer {
    snapshot: Node,
}

impl Dereferencer {
    pub fn new(tree: &Node) -> Self {
        Self {
            snapshot: tree.clone(),
        }
    }
}

impl PostProcessor for Dereferencer {
    fn visit(&mut self, node: &Node, at: &Location) -> Action {
        let Some(call) = node.as_str().and_then(parse_call) else {
            return Action::Ignore;
        };
        if call.name != "grab" {
            return Action::Ignore;
        }

        let target = match tokenize(call.args) {
            Ok(tokens) => match tokens.as_slice() {
                [Token::Reference(target)] => target.clone(),
                _ => {
                    return Action::Error(Error::operator(
                        at.path(),
                        "grab expects exactly one path argument",
                    ));
                }
            },
            Err(e) => return Action::Error(Error::operator(at.path(), e.to_string())),
        };

        match resolve_node(&target, &self.snapshot) {
            Ok(value) => Action::Replace(value.clone()),
            Err(e) => Action::Error(Error::operator(
                at.path(),
                format!("Unable to resolve `{}`: {}", target, e),
            )),
        }
    }
}

/// Reports every `(( param ))` still present in a tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParamChecker;

impl PostProcessor for ParamChecker {
    fn visit(&mut self, node: &Node, at: &Location) -> Action {
        match node.as_str().and_then(parse_call) {
            Some(call) if call.name == "param" => {
                let message = tokenize(call.args)
                    .ok()
                    .and_then(|tokens| tokens.first().map(|t| t.text().to_string()))
                    .unwrap_or_else(|| "parameter was never overridden".to_string());
                Action::Error(Error::operator(at.path(), message))
            }
            _ => Action::Ignore,
        }
    }
}

/// An operator call found in a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    pub at: Location,
    pub name: String,
    pub args: String,
}

/// Collects every operator call site, in document order.
#[derive(Debug, Clone, Default)]
pub struct CallSiteCollector {
    pub sites: Vec<CallSite>,
}

impl PostProcessor for CallSiteCollector {
    fn visit(&mut self, node: &Node, at: &Location) -> Action {
        if let Some(call) = node.as_str().and_then(parse_call) {
            self.sites.push(CallSite {
                at: at.clone(),
                name: call.name.to_string(),
                args: call.args.to_string(),
            });
        }
        Action::Ignore
    }
}

/*
 * merge.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Deep merge of document trees with array-merge directives.
 */

//! Merging documents.
//!
//! Documents are folded left to right: later documents override earlier ones.
//! Mappings merge key by key. Sequences merge according to a directive in
//! their first element:
//!
//! | First element | Strategy |
//! |---|---|
//! | `(( inline ))` | positional merge |
//! | `(( replace ))` | the rest of the list replaces the original |
//! | `(( append ))` / `(( prepend ))` | the rest of the list goes after / before the original |
//! | `(( merge [on <key>] ))` | key-merge, matching elements by `<key>` (default `name`) |
//! | `(( insert before\|after ... ))` / `(( delete ... ))` | edit the original at anchors |
//! | anything else | key-merge on `name` when possible, else the configured [`ArrayDefault`] |
//!
//! Every value adopted from a new document is copied, so the inputs are
//! never modified. Errors are collected per branch; a failing branch keeps
//! its original value.

use crate::context::RunContext;
use crate::cursor::Cursor;
use crate::error::{Error, MultiError};
use crate::node::Node;
use crate::syntax::{Token, is_call_to, parse_call, tokenize};
use indexmap::IndexMap;

/// What to do with a list that carries no directive and cannot be key-merged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ArrayDefault {
    /// Merge elements position by position.
    #[default]
    Inline,
    /// Concatenate the original and the new list.
    Append,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOptions {
    pub array_default: ArrayDefault,
}

/// Where an `insert` or `delete` directive points.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Anchor {
    /// A position in the working list; `-1` is the end.
    Index(i64),
    /// The element whose `key` field equals `name`.
    Named { key: String, name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Directive {
    Inline,
    Replace,
    Append,
    Prepend,
    Merge { key: String },
    Insert { after: bool, anchor: Anchor },
    Delete { anchor: Anchor },
}

impl Directive {
    fn edits_in_place(&self) -> bool {
        matches!(self, Directive::Insert { .. } | Directive::Delete { .. })
    }
}

fn parse_anchor(tokens: &[Token]) -> Result<Anchor, String> {
    let named = |key: &str, name: &str| Anchor::Named {
        key: key.to_string(),
        name: name.to_string(),
    };
    match tokens {
        [Token::Reference(index)] => index
            .parse::<i64>()
            .map(Anchor::Index)
            .map_err(|_| format!("invalid list index `{}`", index)),
        [Token::Literal(name)] => Ok(named("name", name)),
        [Token::Reference(key), Token::Literal(name)] => Ok(named(key, name)),
        [Token::Reference(on), Token::Reference(key), Token::Literal(name)] if on == "on" => {
            Ok(named(key, name))
        }
        _ => Err("expected a list index or a quoted name".to_string()),
    }
}

/// Recognize an array directive. `None` means the element is ordinary data.
fn parse_directive(item: &Node) -> Option<Result<Directive, String>> {
    let call = parse_call(item.as_str()?)?;
    if !matches!(
        call.name,
        "inline" | "replace" | "append" | "prepend" | "merge" | "insert" | "delete"
    ) {
        return None;
    }

    let tokens = match tokenize(call.args) {
        Ok(tokens) => tokens,
        Err(e) => return Some(Err(e.to_string())),
    };
    let words: Vec<&str> = tokens.iter().map(Token::text).collect();

    let parsed = match (call.name, words.as_slice()) {
        ("inline", []) => Ok(Directive::Inline),
        ("replace", []) => Ok(Directive::Replace),
        ("append", []) => Ok(Directive::Append),
        ("prepend", []) => Ok(Directive::Prepend),
        ("merge", []) => Ok(Directive::Merge {
            key: "name".to_string(),
        }),
        ("merge", ["on", key]) => Ok(Directive::Merge {
            key: key.to_string(),
        }),
        ("insert", [relative @ ("before" | "after"), ..]) => {
            parse_anchor(&tokens[1..]).map(|anchor| Directive::Insert {
                after: *relative == "after",
                anchor,
            })
        }
        ("delete", _) => parse_anchor(&tokens).map(|anchor| Directive::Delete { anchor }),
        (name, _) => Err(format!("malformed (( {} )) directive", name)),
    };
    Some(parsed.map_err(|e| format!("(( {} {} )): {}", call.name, call.args, e)))
}

fn key_of(item: &Node, key: &str) -> Option<String> {
    item.get(key).and_then(Node::scalar_string)
}

fn position_of(list: &[Node], key: &str, name: &str) -> Option<usize> {
    list.iter()
        .position(|item| key_of(item, key).as_deref() == Some(name))
}

/// `path` with list indices replaced by the element's name where it has one.
///
/// A named path still finds its element after later documents insert into
/// or delete from the list.
fn named_path(root: &IndexMap<String, Node>, path: &Cursor) -> Cursor {
    let mut parts = path.components().iter();
    let mut named = Cursor::root();
    let Some(first) = parts.next() else {
        return named;
    };
    named.push(first.clone());

    let mut here = root.get(first);
    for part in parts {
        here = match here {
            Some(Node::Sequence(items)) => {
                let item = part.parse::<usize>().ok().and_then(|i| items.get(i));
                match item.and_then(Node::name_of) {
                    Some(name) if name.parse::<usize>().is_err() => named.push(name),
                    _ => named.push(part.clone()),
                }
                item
            }
            Some(node) => {
                named.push(part.clone());
                node.get(part)
            }
            None => {
                named.push(part.clone());
                None
            }
        };
    }
    named
}

/// Folds documents into one tree.
pub struct Merger<'a> {
    options: MergeOptions,
    ctx: &'a mut RunContext,
    errors: MultiError,
    /// Overwritten `(( prune ))` markers of the document being merged.
    overwritten_prunes: Vec<Cursor>,
}

impl<'a> Merger<'a> {
    pub fn new(options: MergeOptions, ctx: &'a mut RunContext) -> Self {
        Self {
            options,
            ctx,
            errors: MultiError::new(),
            overwritten_prunes: Vec::new(),
        }
    }

    /// Merge one document's mapping into `target`.
    pub fn merge(&mut self, target: &mut IndexMap<String, Node>, doc: &IndexMap<String, Node>) {
        self.merge_map(target, doc, &Cursor::root());

        for path in std::mem::take(&mut self.overwritten_prunes) {
            self.ctx.mark_prune(named_path(target, &path));
        }
    }

    /// Errors collected so far.
    pub fn errors(&self) -> &MultiError {
        &self.errors
    }

    pub fn finish(self) -> Result<(), MultiError> {
        self.errors.into_result(())
    }

    fn merge_map(
        &mut self,
        orig: &mut IndexMap<String, Node>,
        new: &IndexMap<String, Node>,
        path: &Cursor,
    ) {
        for (key, value) in new {
            let here = path.child(key.clone());
            let slot = orig.entry(key.clone()).or_insert_with(Node::null);
            self.merge_obj(slot, value, &here);
        }
    }

    fn merge_obj(&mut self, orig: &mut Node, new: &Node, path: &Cursor) {
        if new.as_str().is_some_and(|s| is_call_to(s, "merge")) {
            self.errors.append(Error::structural(
                path.qualified(),
                "inappropriate use of (( merge )) operator outside of a list",
            ));
            return;
        }
        if orig.as_str().is_some_and(|s| is_call_to(s, "prune")) {
            self.overwritten_prunes.push(path.clone());
        }

        match new {
            Node::Mapping(entries) => match orig {
                Node::Mapping(existing) => self.merge_map(existing, entries, path),
                _ => {
                    let mut fresh = IndexMap::new();
                    self.merge_map(&mut fresh, entries, path);
                    *orig = Node::Mapping(fresh);
                }
            },
            Node::Sequence(items) => {
                let base = orig.as_sequence().unwrap_or_default();
                match self.merge_array(base, items, path) {
                    Ok(merged) => *orig = Node::Sequence(merged),
                    Err(e) => self.errors.append(e),
                }
            }
            Node::Scalar(_) => *orig = new.clone(),
        }
    }

    /// Copy `item` into the tree, processing any directives nested in it.
    fn adopt(&mut self, item: &Node, path: &Cursor) -> Node {
        let mut slot = Node::null();
        self.merge_obj(&mut slot, item, path);
        slot
    }

    fn adopt_all(&mut self, items: &[Node], start: usize, path: &Cursor) -> Vec<Node> {
        items
            .iter()
            .enumerate()
            .map(|(i, item)| self.adopt(item, &path.child((start + i).to_string())))
            .collect()
    }

    fn merge_array(
        &mut self,
        orig: &[Node],
        new: &[Node],
        path: &Cursor,
    ) -> Result<Vec<Node>, Error> {
        let directive = match new.first().and_then(parse_directive) {
            Some(Ok(directive)) => Some(directive),
            Some(Err(message)) => return Err(Error::structural(path.qualified(), message)),
            None => None,
        };

        match directive {
            Some(Directive::Inline) => {
                tracing::debug!("{}: performing explicit inline array merge", path.qualified());
                Ok(self.merge_inline(orig, &new[1..], path))
            }
            Some(Directive::Replace) => {
                tracing::debug!("{}: replacing array", path.qualified());
                Ok(self.adopt_all(&new[1..], 0, path))
            }
            Some(Directive::Append) => {
                tracing::debug!("{}: appending to array", path.qualified());
                let mut result = orig.to_vec();
                let tail = self.adopt_all(&new[1..], orig.len(), path);
                result.extend(tail);
                Ok(result)
            }
            Some(Directive::Prepend) => {
                tracing::debug!("{}: prepending to array", path.qualified());
                let mut result = self.adopt_all(&new[1..], 0, path);
                result.extend_from_slice(orig);
                Ok(result)
            }
            Some(Directive::Merge { key }) => {
                tracing::debug!("{}: performing explicit key-merge on `{}`", path.qualified(), key);
                self.merge_by_key(orig, &new[1..], &key, path)
            }
            Some(_) => {
                tracing::debug!("{}: applying insert/delete directives", path.qualified());
                self.merge_modifications(orig, new, path)
            }
            None => {
                let keyed = |list: &[Node]| list.iter().all(|item| key_of(item, "name").is_some());
                if keyed(orig) && keyed(new) {
                    tracing::debug!("{}: performing implicit key-merge on `name`", path.qualified());
                    return self.merge_by_key(orig, new, "name", path);
                }
                match self.options.array_default {
                    ArrayDefault::Inline => {
                        tracing::debug!("{}: performing default inline array merge", path.qualified());
                        Ok(self.merge_inline(orig, new, path))
                    }
                    ArrayDefault::Append => {
                        tracing::debug!("{}: performing default append array merge", path.qualified());
                        let mut result = orig.to_vec();
                        let tail = self.adopt_all(new, orig.len(), path);
                        result.extend(tail);
                        Ok(result)
                    }
                }
            }
        }
    }

    fn merge_inline(&mut self, orig: &[Node], new: &[Node], path: &Cursor) -> Vec<Node> {
        let mut result = orig.to_vec();
        for (i, item) in new.iter().enumerate() {
            let here = path.child(i.to_string());
            match result.get_mut(i) {
                Some(slot) => self.merge_obj(slot, item, &here),
                None => {
                    let adopted = self.adopt(item, &here);
                    result.push(adopted);
                }
            }
        }
        result
    }

    fn merge_by_key(
        &mut self,
        orig: &[Node],
        new: &[Node],
        key: &str,
        path: &Cursor,
    ) -> Result<Vec<Node>, Error> {
        for (side, list) in [("original", orig), ("new", new)] {
            for (i, item) in list.iter().enumerate() {
                let here = path.child(i.to_string()).qualified();
                if !item.is_mapping() {
                    return Err(Error::structural(
                        here,
                        format!(
                            "{} object is a {}, not a map (cannot merge using keys)",
                            side,
                            item.kind()
                        ),
                    ));
                }
                if key_of(item, key).is_none() {
                    return Err(Error::structural(
                        here,
                        format!("{} object does not contain the key '{}'; cannot merge", side, key),
                    ));
                }
            }
        }

        let mut result = orig.to_vec();
        for item in new {
            let name = key_of(item, key).unwrap_or_default();
            match position_of(&result, key, &name) {
                Some(index) => self.merge_obj(&mut result[index], item, &path.child(index.to_string())),
                None => {
                    let adopted = self.adopt(item, &path.child(result.len().to_string()));
                    result.push(adopted);
                }
            }
        }
        Ok(result)
    }

    fn merge_modifications(
        &mut self,
        orig: &[Node],
        new: &[Node],
        path: &Cursor,
    ) -> Result<Vec<Node>, Error> {
        let mut batches: Vec<(Directive, Vec<&Node>)> = Vec::new();
        for (i, item) in new.iter().enumerate() {
            let here = path.child(i.to_string()).qualified();
            match parse_directive(item) {
                Some(Ok(directive)) if directive.edits_in_place() => batches.push((directive, Vec::new())),
                Some(Ok(_)) => {
                    return Err(Error::structural(
                        here,
                        "only insert and delete directives may follow an insert or delete directive",
                    ));
                }
                Some(Err(message)) => return Err(Error::structural(here, message)),
                None => match batches.last_mut() {
                    Some((_, entries)) => entries.push(item),
                    None => return Err(Error::structural(here, "list entry precedes any directive")),
                },
            }
        }

        let mut result = orig.to_vec();
        for (directive, entries) in batches {
            match directive {
                Directive::Delete { anchor } => {
                    if !entries.is_empty() {
                        return Err(Error::structural(
                            path.qualified(),
                            "(( delete )) directive cannot be followed by list entries",
                        ));
                    }
                    let index = match anchor {
                        Anchor::Index(-1) if !result.is_empty() => result.len() - 1,
                        ref anchor => self.anchor_index(&result, anchor, path)?,
                    };
                    if index >= result.len() {
                        return Err(Error::structural(
                            path.qualified(),
                            format!(
                                "delete index {} is out of bounds (list has {} entries)",
                                index,
                                result.len()
                            ),
                        ));
                    }
                    result.remove(index);
                }
                Directive::Insert { after, anchor } => {
                    let at = match anchor {
                        Anchor::Index(-1) => result.len(),
                        ref anchor => self.anchor_index(&result, anchor, path)? + usize::from(after),
                    };
                    if at > result.len() {
                        return Err(Error::structural(
                            path.qualified(),
                            format!(
                                "insert index {} is out of bounds (list has {} entries)",
                                at,
                                result.len()
                            ),
                        ));
                    }

                    if let Anchor::Named { key, .. } = &anchor {
                        for entry in &entries {
                            if let Some(name) = key_of(entry, key)
                                && position_of(&result, key, &name).is_some()
                            {
                                return Err(Error::structural(
                                    path.qualified(),
                                    format!(
                                        "unable to insert entry with {} `{}`: it already exists in the list",
                                        key, name
                                    ),
                                ));
                            }
                        }
                    }

                    let adopted: Vec<Node> = entries
                        .iter()
                        .enumerate()
                        .map(|(j, entry)| self.adopt(entry, &path.child((at + j).to_string())))
                        .collect();
                    result.splice(at..at, adopted);
                }
                _ => {}
            }
        }
        Ok(result)
    }

    fn anchor_index(&self, list: &[Node], anchor: &Anchor, path: &Cursor) -> Result<usize, Error> {
        match anchor {
            Anchor::Index(index) => usize::try_from(*index).map_err(|_| {
                Error::structural(path.qualified(), format!("invalid list index {}", index))
            }),
            Anchor::Named { key, name } => position_of(list, key, name).ok_or_else(|| {
                Error::structural(
                    path.qualified(),
                    format!("unable to find specified modification point with '{}: {}'", key, name),
                )
            }),
        }
    }
}

/// Merge `docs` in order into a fresh tree.
///
/// Every document must have a mapping at its root; a document that does not
/// is a fatal error. Other problems are collected and returned together.
pub fn merge_all<'d>(
    docs: impl IntoIterator<Item = &'d Node>,
    options: MergeOptions,
    ctx: &mut RunContext,
) -> Result<Node, Error> {
    let mut root = IndexMap::new();
    let mut merger = Merger::new(options, ctx);

    for (index, doc) in docs.into_iter().enumerate() {
        let Some(entries) = doc.as_mapping() else {
            return Err(Error::structural(
                "$",
                format!(
                    "document {} has a {} at its root, not a map",
                    index + 1,
                    doc.kind()
                ),
            ));
        };
        tracing::debug!(document = index + 1, "merging document");
        merger.merge(&mut root, entries);
    }

    merger.finish()?;
    Ok(Node::Mapping(root))
}

/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Error taxonomy and the multi-error aggregate.
 */

//! Error types for graft-core.
//!
//! Recoverable problems found while merging or evaluating are collected into a
//! [`MultiError`] so that a single pass reports every independent problem.
//! Within one branch (one map key, one array, one call site) the first error
//! wins and the branch is abandoned.

use crate::cursor::Cursor;
use crate::secrets::SecretError;
use std::fmt;
use thiserror::Error;

/// A cursor string could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("syntax error: {problem} at position {position}")]
pub struct SyntaxError {
    pub problem: String,
    /// Character offset of the offending character.
    pub position: usize,
}

/// Why a path failed to resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotFoundReason {
    /// No such key in a mapping, or no element with that name in a list.
    Missing,
    /// A numeric index past the end of a list.
    OutOfBounds { index: usize, len: usize },
    /// A step tried to descend into a scalar.
    NoSubObjects { kind: &'static str },
}

/// A path did not resolve against a tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct NotFoundError {
    /// The path up to and including the component that failed.
    pub path: Vec<String>,
    pub reason: NotFoundReason,
}

impl NotFoundError {
    pub fn missing(path: Vec<String>) -> Self {
        Self {
            path,
            reason: NotFoundReason::Missing,
        }
    }

    /// Prefix the trace with the component that led here.
    pub(crate) fn within(mut self, component: &str) -> Self {
        self.path.insert(0, component.to_string());
        self
    }
}

impl fmt::Display for NotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = Cursor::from_components(self.path.clone());
        match &self.reason {
            NotFoundReason::Missing => {
                write!(f, "`{}` could not be found in the datastructure", path.qualified())
            }
            NotFoundReason::OutOfBounds { index, len } => write!(
                f,
                "`{}` could not be found in the datastructure (index {} is out of bounds, list has {} entries)",
                path.qualified(),
                index,
                len
            ),
            NotFoundReason::NoSubObjects { kind } => {
                let mut parent = path.clone();
                parent.pop();
                write!(
                    f,
                    "`{}` could not be found in the datastructure (`{}` is a {} and has no sub-objects)",
                    path.qualified(),
                    parent.qualified(),
                    kind
                )
            }
        }
    }
}

/// Every error graft-core can report.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    /// Invalid operator placement or merge-side type conflicts.
    #[error("{path}: {message}")]
    Structural { path: String, message: String },

    /// Recursion budget exhausted, or an operator dependency cycle.
    #[error("{path}: {message}")]
    Cycle { path: String, message: String },

    /// An operator's own precondition failed while running.
    #[error("{path}: {message}")]
    Operator { path: String, message: String },

    #[error(transparent)]
    Transport(#[from] SecretError),

    #[error(transparent)]
    Multi(#[from] MultiError),
}

impl Error {
    pub fn structural(path: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Structural {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn operator(path: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Operator {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn cycle(path: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Cycle {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// An ordered collection of errors.
///
/// Nested aggregates are flattened on [`MultiError::append`]. The rendered
/// form sorts the individual messages so output is stable regardless of the
/// order in which sibling branches were visited.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultiError {
    errors: Vec<Error>,
}

impl MultiError {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an error, flattening nested aggregates.
    pub fn append(&mut self, err: impl Into<Error>) {
        match err.into() {
            Error::Multi(multi) => self.errors.extend(multi.errors),
            other => self.errors.push(other),
        }
    }

    /// Append all errors from another aggregate.
    pub fn extend(&mut self, other: MultiError) {
        self.errors.extend(other.errors);
    }

    pub fn count(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Error> {
        self.errors.iter()
    }

    pub fn into_errors(self) -> Vec<Error> {
        self.errors
    }

    /// `Ok(value)` when empty, otherwise `Err(self)`.
    pub fn into_result<T>(self, value: T) -> std::result::Result<T, MultiError> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl From<Error> for MultiError {
    fn from(err: Error) -> Self {
        let mut multi = MultiError::new();
        multi.append(err);
        multi
    }
}

impl fmt::Display for MultiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lines: Vec<String> = self.errors.iter().map(|e| format!(" - {}\n", e)).collect();
        lines.sort();
        write!(f, "{} error(s) detected:\n{}", self.count(), lines.concat())
    }
}

impl std::error::Error for MultiError {}

/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Document merging and operator evaluation for graft.
//!
//! graft combines a list of hierarchical documents into one, then resolves
//! the `(( operator args ))` expressions embedded in the result.
//!
//! # Architecture
//!
//! - [`Node`]: the document tree (scalar, ordered mapping, sequence)
//! - [`Cursor`]: a structured path into a tree
//! - [`Merger`] / [`merge_all`]: the deep merge with array directives
//! - [`Registry`] / [`Evaluator`]: phased, dependency-ordered operator calls
//! - [`walk`] and [`PostProcessor`]: single-visitor tree walks
//! - [`RunContext`]: caches and allocation tables scoped to one run
//! - [`pipeline::run`]: merge, evaluate and prune in one step
//!
//! # Example
//!
//! ```
//! use graft_core::{PipelineOptions, Registry, RunContext, node, pipeline};
//!
//! let base = node!({ "name" => "web", "url" => "(( concat \"https://\" name \".example.com\" ))" });
//! let overlay = node!({ "name" => "api" });
//!
//! let result = pipeline::run(
//!     &[base, overlay],
//!     &PipelineOptions::default(),
//!     &mut Registry::with_builtins(),
//!     &mut RunContext::new(),
//! )
//! .unwrap();
//! assert_eq!(result.get("url").and_then(|v| v.as_str()), Some("https://api.example.com"));
//! ```

pub mod context;
pub mod cursor;
pub mod error;
pub mod evaluator;
pub mod merge;
pub mod node;
pub mod operator;
pub mod operators;
pub mod pipeline;
pub mod postprocess;
pub mod prune;
pub mod resolve;
pub mod secrets;
pub mod syntax;

pub use context::RunContext;
pub use cursor::Cursor;
pub use error::{Error, MultiError, NotFoundError, NotFoundReason, Result, SyntaxError};
pub use evaluator::Evaluator;
pub use merge::{ArrayDefault, MergeOptions, Merger, merge_all};
pub use node::{NAME_FIELDS, Node};
pub use operator::{Arg, OpContext, OpError, Operator, Phase, Registry, Response};
pub use pipeline::PipelineOptions;
pub use postprocess::{
    Action, CallSite, CallSiteCollector, DEFAULT_DEPTH_BUDGET, Dereferencer, EvalOptions, Location,
    ParamChecker, PostProcessor, walk, walk_with_budget,
};
pub use resolve::resolve_node;
pub use secrets::{MemorySecretStore, SecretData, SecretError, SecretStore};

/*
 * evaluator.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Dependency-ordered evaluation of operator call sites.
 */

//! The evaluator.
//!
//! For each [`Phase`] in turn the evaluator
//!
//! 1. discovers every call site in the tree,
//! 2. keeps the calls whose operator runs in this phase,
//! 3. orders them so that each call runs after every call it depends on,
//! 4. runs them and substitutes the results.
//!
//! A call depends on another when one of its dependency paths is the other
//! call's location or an ancestor of it. A dependency cycle is fatal. Other
//! errors are collected for the whole phase, and a phase with errors ends
//! the run.

use crate::context::RunContext;
use crate::cursor::Cursor;
use crate::error::{Error, MultiError, SyntaxError};
use crate::node::Node;
use crate::operator::{Arg, OpContext, Operator, Phase, Registry, Response};
use crate::postprocess::{CallSite, CallSiteCollector, EvalOptions, walk_with_budget};
use crate::syntax::tokenize;
use indexmap::IndexMap;
use std::collections::BTreeSet;

struct Call<'r> {
    site: CallSite,
    op: &'r dyn Operator,
    args: Vec<Arg>,
    dependencies: Vec<Cursor>,
}

/// Split an argument string into parsed arguments.
pub fn parse_args(text: &str) -> Result<Vec<Arg>, SyntaxError> {
    tokenize(text)?.iter().map(Arg::from_token).collect()
}

/// Canonical forms of the reference arguments.
///
/// A reference into a value that does not exist yet (typically something
/// another call will produce) is trimmed to its longest existing prefix.
fn auto_dependencies(args: &[Arg], tree: &Node) -> Vec<Cursor> {
    let mut found = Vec::new();
    for arg in args {
        let Arg::Reference(path) = arg else { continue };
        let mut path = path.clone();
        while !path.is_root() {
            match path.canonical(tree) {
                Ok(canonical) => {
                    found.push(canonical);
                    break;
                }
                Err(e) => {
                    tracing::trace!(path = %path, error = %e, "dependency not resolvable yet");
                    path.pop();
                }
            }
        }
    }
    found
}

pub struct Evaluator<'r> {
    registry: &'r Registry,
    options: EvalOptions,
}

impl<'r> Evaluator<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self::with_options(registry, EvalOptions::default())
    }

    pub fn with_options(registry: &'r Registry, options: EvalOptions) -> Self {
        Self { registry, options }
    }

    /// Run every phase, in order.
    pub fn run(&self, tree: &mut Node, ctx: &mut RunContext) -> Result<(), Error> {
        for phase in Phase::ALL {
            self.run_phase(phase, tree, ctx)?;
        }
        Ok(())
    }

    pub fn run_phase(&self, phase: Phase, tree: &mut Node, ctx: &mut RunContext) -> Result<(), Error> {
        let mut collector = CallSiteCollector::default();
        walk_with_budget(tree, &mut collector, self.options.depth_budget)?;

        let mut errors = MultiError::new();
        let mut calls = Vec::new();
        for site in collector.sites {
            let Some(op) = self.registry.get(&site.name) else {
                if phase == Phase::Eval {
                    errors.append(Error::operator(
                        site.at.path(),
                        format!("unknown operator '{}'", site.name),
                    ));
                }
                continue;
            };
            if op.phase() != phase {
                continue;
            }
            match parse_args(&site.args) {
                Ok(args) => {
                    let auto = auto_dependencies(&args, tree);
                    let dependencies = op.dependencies(&site.at.cursor, tree, &args, auto);
                    calls.push(Call {
                        site,
                        op,
                        args,
                        dependencies,
                    });
                }
                Err(e) => errors.append(Error::operator(site.at.path(), e.to_string())),
            }
        }

        let order = schedule(&calls)?;
        tracing::debug!(phase = ?phase, calls = order.len(), "evaluating phase");

        for index in order {
            let call = &calls[index];
            let here = &call.site.at.cursor;
            tracing::debug!("{}: running (( {} {} ))", call.site.at.path(), call.site.name, call.site.args);

            let response = {
                let mut op_ctx = OpContext {
                    tree: &*tree,
                    here,
                    run: &mut *ctx,
                };
                call.op.run(&mut op_ctx, &call.args)
            };

            let outcome = match response {
                Ok(Response::Replace(value)) => here
                    .resolve_mut(tree)
                    .map(|slot| *slot = value)
                    .map_err(Error::from),
                Ok(Response::Inject(entries)) => inject(tree, here, entries),
                Err(e) => Err(Error::operator(call.site.at.path(), e.0)),
            };
            if let Err(e) = outcome {
                errors.append(e);
            }
        }

        errors.into_result(()).map_err(Error::from)
    }
}

/// Order calls so that dependencies run first.
///
/// Ties are broken by discovery order, so the schedule is deterministic.
fn schedule(calls: &[Call<'_>]) -> Result<Vec<usize>, Error> {
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); calls.len()];
    let mut indegree = vec![0usize; calls.len()];

    for (i, call) in calls.iter().enumerate() {
        for (j, other) in calls.iter().enumerate() {
            let location = &other.site.at.cursor;
            if call
                .dependencies
                .iter()
                .any(|dep| location == dep || location.under(dep))
            {
                dependents[j].push(i);
                indegree[i] += 1;
            }
        }
    }

    let mut ready: BTreeSet<usize> = (0..calls.len()).filter(|&i| indegree[i] == 0).collect();
    let mut order = Vec::with_capacity(calls.len());
    while let Some(next) = ready.pop_first() {
        order.push(next);
        for &dependent in &dependents[next] {
            indegree[dependent] -= 1;
            if indegree[dependent] == 0 {
                ready.insert(dependent);
            }
        }
    }

    if order.len() < calls.len() {
        let mut stuck: Vec<String> = (0..calls.len())
            .filter(|&i| indegree[i] > 0)
            .map(|i| calls[i].site.at.path())
            .collect();
        stuck.sort();
        return Err(Error::cycle(
            "$",
            format!("cycle detected in operator data-flow graph: {}", stuck.join(", ")),
        ));
    }
    Ok(order)
}

/// Replace the key at `here` with the entries of `injected`, keeping the
/// parent's own keys.
fn inject(tree: &mut Node, here: &Cursor, injected: IndexMap<String, Node>) -> Result<(), Error> {
    let mut parent = here.clone();
    let Some(key) = parent.pop() else {
        return Err(Error::structural("$", "(( inject )) cannot replace the document root"));
    };
    let Node::Mapping(siblings) = parent.resolve_mut(tree)? else {
        return Err(Error::structural(
            here.qualified(),
            "(( inject )) can only be used as the value of a map key",
        ));
    };

    siblings.shift_remove(&key);
    for (name, value) in injected {
        if !siblings.contains_key(&name) {
            siblings.insert(name, value);
        }
    }
    Ok(())
}

/*
 * pipeline.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Merge, evaluate and prune in one call.
 */

use crate::context::RunContext;
use crate::cursor::Cursor;
use crate::error::Error;
use crate::evaluator::Evaluator;
use crate::merge::{MergeOptions, merge_all};
use crate::node::Node;
use crate::operator::Registry;
use crate::postprocess::EvalOptions;
use crate::prune::prune;

/// Configuration for one [`run`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineOptions {
    pub merge: MergeOptions,
    pub eval: EvalOptions,
    /// Stop after merging; operator calls are left in place.
    pub skip_eval: bool,
    /// Extra paths to delete from the result.
    pub prune: Vec<String>,
}

/// Merge `docs`, evaluate operators and apply pruning.
///
/// Pruning runs even when evaluation is skipped, so paths recorded while
/// merging and the caller's `prune` paths are always honored.
pub fn run(
    docs: &[Node],
    options: &PipelineOptions,
    registry: &mut Registry,
    ctx: &mut RunContext,
) -> Result<Node, Error> {
    let extra_prune = options
        .prune
        .iter()
        .map(|path| Cursor::parse(path))
        .collect::<Result<Vec<Cursor>, _>>()?;

    let mut tree = merge_all(docs, options.merge.clone(), ctx)?;

    if options.skip_eval {
        tracing::debug!("skipping evaluation");
    } else {
        registry
            .setup()
            .map_err(|(name, e)| Error::operator("$", format!("setup of (( {} )) failed: {}", name, e)))?;
        Evaluator::with_options(registry, options.eval).run(&mut tree, ctx)?;
    }

    let mut paths = ctx.take_prune_paths();
    paths.extend(extra_prune);
    let removed = prune(&mut tree, &paths);
    tracing::debug!(removed, "pruning complete");

    Ok(tree)
}

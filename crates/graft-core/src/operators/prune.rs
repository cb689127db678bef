/*
 * operators/prune.rs
 * Copyright (c) 2025 Posit, PBC
 */

use crate::node::Node;
use crate::operator::{Arg, OpContext, OpError, Operator, Phase, Response};

/// `(( prune ))`: remove this key once evaluation is complete.
#[derive(Debug, Clone, Copy, Default)]
pub struct Prune;

impl Operator for Prune {
    fn phase(&self) -> Phase {
        Phase::Eval
    }

    fn run(&self, ctx: &mut OpContext<'_>, _args: &[Arg]) -> Result<Response, OpError> {
        ctx.run.mark_prune(ctx.here.clone());
        Ok(Response::Replace(Node::null()))
    }
}

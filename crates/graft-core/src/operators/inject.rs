/*
 * operators/inject.rs
 * Copyright (c) 2025 Posit, PBC
 */

use crate::node::Node;
use crate::operator::{Arg, OpContext, OpError, Operator, Phase, Response};

/// `(( inject <path> ))`: splice a mapping into the caller's parent.
///
/// The calling key disappears. Keys the parent already has win over
/// injected ones.
#[derive(Debug, Clone, Copy, Default)]
pub struct Inject;

impl Operator for Inject {
    fn phase(&self) -> Phase {
        Phase::Merge
    }

    fn run(&self, ctx: &mut OpContext<'_>, args: &[Arg]) -> Result<Response, OpError> {
        let [arg @ Arg::Reference(path)] = args else {
            return Err(OpError::new("inject operator requires exactly one path argument"));
        };
        match ctx.resolve(arg)? {
            Node::Mapping(entries) => Ok(Response::Inject(entries)),
            other => Err(OpError(format!(
                "cannot inject `{}`: it is a {}, not a map",
                path,
                other.kind()
            ))),
        }
    }
}

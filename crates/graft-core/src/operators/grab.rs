/*
 * operators/grab.rs
 * Copyright (c) 2025 Posit, PBC
 */

use crate::node::Node;
use crate::operator::{Arg, OpContext, OpError, Operator, Phase, Response};

/// `(( grab <path>... ))`: the value at a path.
///
/// With several arguments the result is a list of their values.
#[derive(Debug, Clone, Copy, Default)]
pub struct Grab;

impl Operator for Grab {
    fn phase(&self) -> Phase {
        Phase::Eval
    }

    fn run(&self, ctx: &mut OpContext<'_>, args: &[Arg]) -> Result<Response, OpError> {
        match args {
            [] => Err(OpError::new("no arguments specified to (( grab ))")),
            [single] => Ok(Response::Replace(ctx.resolve(single)?)),
            many => {
                let values = many
                    .iter()
                    .map(|arg| ctx.resolve(arg))
                    .collect::<Result<Vec<Node>, OpError>>()?;
                Ok(Response::Replace(Node::Sequence(values)))
            }
        }
    }
}

/*
 * operators/join.rs
 * Copyright (c) 2025 Posit, PBC
 */

use super::scalar_text;
use crate::node::Node;
use crate::operator::{Arg, OpContext, OpError, Operator, Phase, Response};

/// `(( join "<separator>" <list-or-scalar>... ))`
#[derive(Debug, Clone, Copy, Default)]
pub struct Join;

impl Operator for Join {
    fn phase(&self) -> Phase {
        Phase::Eval
    }

    fn run(&self, ctx: &mut OpContext<'_>, args: &[Arg]) -> Result<Response, OpError> {
        let [separator, rest @ ..] = args else {
            return Err(OpError::new("join operator requires at least two arguments"));
        };
        if rest.is_empty() {
            return Err(OpError::new("join operator requires at least two arguments"));
        }
        let separator = match separator {
            Arg::Literal(Node::Scalar(_)) => scalar_text(&ctx.resolve(separator)?, "the separator")?,
            _ => return Err(OpError::new("join separator must be a literal string")),
        };

        let mut pieces = Vec::new();
        for arg in rest {
            match ctx.resolve(arg)? {
                Node::Sequence(items) => {
                    for (i, item) in items.iter().enumerate() {
                        pieces.push(scalar_text(item, &format!("list entry {}", i))?);
                    }
                }
                value => pieces.push(scalar_text(&value, "an argument")?),
            }
        }
        Ok(Response::Replace(Node::string(pieces.join(&separator))))
    }
}

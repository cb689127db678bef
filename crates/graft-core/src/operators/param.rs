/*
 * operators/param.rs
 * Copyright (c) 2025 Posit, PBC
 */

use crate::cursor::Cursor;
use crate::node::Node;
use crate::operator::{Arg, OpContext, OpError, Operator, Phase, Response};

/// `(( param "<message>" ))`: a value that must be overridden.
///
/// Reaching evaluation at all is the error.
#[derive(Debug, Clone, Copy, Default)]
pub struct Param;

impl Operator for Param {
    fn phase(&self) -> Phase {
        Phase::Param
    }

    fn dependencies(&self, _here: &Cursor, _tree: &Node, _args: &[Arg], _auto: Vec<Cursor>) -> Vec<Cursor> {
        Vec::new()
    }

    fn run(&self, ctx: &mut OpContext<'_>, args: &[Arg]) -> Result<Response, OpError> {
        let message = match args.first() {
            Some(arg) => ctx
                .resolve(arg)
                .ok()
                .and_then(|v| v.scalar_string())
                .unwrap_or_else(|| "parameter was never overridden".to_string()),
            None => "parameter was never overridden".to_string(),
        };
        Err(OpError(message))
    }
}

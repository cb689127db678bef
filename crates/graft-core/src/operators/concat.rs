/*
 * operators/concat.rs
 * Copyright (c) 2025 Posit, PBC
 */

use super::scalar_text;
use crate::node::Node;
use crate::operator::{Arg, OpContext, OpError, Operator, Phase, Response};

/// `(( concat <tokens>... ))`, also registered as `string`.
///
/// Quoted tokens are used as-is, references are resolved. Every piece must
/// be a scalar.
#[derive(Debug, Clone, Copy, Default)]
pub struct Concat;

/// Resolve and stringify every argument, in order.
pub(crate) fn concat_args(ctx: &OpContext<'_>, args: &[Arg]) -> Result<String, OpError> {
    let mut out = String::new();
    for arg in args {
        let value = ctx.resolve(arg)?;
        let what = match arg {
            Arg::Reference(path) => format!("`{}`", path),
            Arg::Literal(_) => "a literal".to_string(),
        };
        out.push_str(&scalar_text(&value, &what)?);
    }
    Ok(out)
}

impl Operator for Concat {
    fn phase(&self) -> Phase {
        Phase::Eval
    }

    fn run(&self, ctx: &mut OpContext<'_>, args: &[Arg]) -> Result<Response, OpError> {
        if args.len() < 2 {
            return Err(OpError::new("concat operator requires at least two arguments"));
        }
        Ok(Response::Replace(Node::string(concat_args(ctx, args)?)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RunContext;
    use crate::node;
    use crate::operators::testing::{call, replaced};

    #[test]
    fn test_concat_literal_and_reference() {
        let tree = node!({ "a" => { "b" => "value" }, "port" => 8080 });
        let mut run = RunContext::new();

        assert_eq!(
            replaced(call(&Concat, &tree, "out", "\"literal \" a.b", &mut run)),
            node!("literal value")
        );
        assert_eq!(
            replaced(call(&Concat, &tree, "out", "\"host:\" port", &mut run)),
            node!("host:8080")
        );
    }

    #[test]
    fn test_concat_rejects_composites() {
        let tree = node!({ "a" => { "b" => { "nested" => 1 } } });
        let err = call(&Concat, &tree, "out", "\"literal \" a.b", &mut RunContext::new()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "tried to use `a.b`, which is a map and not a string scalar"
        );
    }

    #[test]
    fn test_concat_needs_two_arguments() {
        let tree = node!({});
        assert!(call(&Concat, &tree, "out", "\"alone\"", &mut RunContext::new()).is_err());
    }
}

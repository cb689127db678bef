/*
 * operators/vault.rs
 * Copyright (c) 2025 Posit, PBC
 */

use super::concat::concat_args;
use crate::node::Node;
use crate::operator::{Arg, OpContext, OpError, Operator, Phase, Response};

/// Value substituted for every secret in redact mode.
pub const REDACTED: &str = "REDACTED";

/// `(( vault <tokens>... ))`: a secret from the configured store.
///
/// The tokens are concatenated into `path:key`. Each path is fetched at most
/// once per run.
#[derive(Debug, Clone, Copy, Default)]
pub struct Vault;

impl Operator for Vault {
    fn phase(&self) -> Phase {
        Phase::Eval
    }

    fn run(&self, ctx: &mut OpContext<'_>, args: &[Arg]) -> Result<Response, OpError> {
        if args.is_empty() {
            return Err(OpError::new("no arguments specified to (( vault ))"));
        }
        let target = concat_args(ctx, args)?;
        let Some((path, key)) = target.rsplit_once(':') else {
            return Err(OpError(format!(
                "invalid secret reference `{}`: expected <path>:<key>",
                target
            )));
        };

        if ctx.run.redact {
            return Ok(Response::Replace(Node::string(REDACTED)));
        }
        if !ctx.run.has_secret_store() {
            return Err(OpError::new("no secret store configured"));
        }

        let data = ctx
            .run
            .secret(path)?
            .ok_or_else(|| OpError::new("no secret store configured"))?;
        let value = data
            .get(key)
            .ok_or_else(|| OpError(format!("secret `{}` has no key `{}`", path, key)))?;
        Ok(Response::Replace(Node::string(value.clone())))
    }
}

/*
 * operators/mod.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Built-in operators.
 */

mod concat;
mod grab;
mod inject;
mod join;
mod param;
mod prune;
mod static_ips;
mod vault;

pub use concat::Concat;
pub use grab::Grab;
pub use inject::Inject;
pub use join::Join;
pub use param::Param;
pub use prune::Prune;
pub use static_ips::StaticIps;
pub use vault::{REDACTED, Vault};

use crate::node::Node;
use crate::operator::OpError;

/// Text of a scalar argument, for operators that build strings.
///
/// Strings, numbers and booleans are accepted. `what` names the argument in
/// the error.
pub(crate) fn scalar_text(value: &Node, what: &str) -> Result<String, OpError> {
    value.scalar_string().ok_or_else(|| {
        OpError(format!(
            "tried to use {}, which is a {} and not a string scalar",
            what,
            value.kind()
        ))
    })
}

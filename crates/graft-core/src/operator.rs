/*
 * operator.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * The operator interface and the registry of named operators.
 */

//! Operators.
//!
//! An operator is invoked by a scalar of the form `(( name args... ))` and
//! replaced by whatever it computes. Each operator declares the [`Phase`] it
//! runs in and which paths it depends on; the
//! [`Evaluator`](crate::evaluator::Evaluator) uses that to order calls.

use crate::context::RunContext;
use crate::cursor::Cursor;
use crate::error::{NotFoundError, SyntaxError};
use crate::node::Node;
use crate::operators;
use crate::secrets::SecretError;
use crate::syntax::Token;
use indexmap::IndexMap;
use thiserror::Error;
use yaml_rust2::Yaml;

/// Evaluation stage. Every call of one phase completes before the next
/// phase starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Merge,
    Param,
    Eval,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Merge, Phase::Param, Phase::Eval];
}

/// One parsed operator argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// A quoted string, number, boolean or null.
    Literal(Node),
    /// A path into the tree.
    Reference(Cursor),
}

impl Arg {
    /// Convert a token. Bare numbers and the words `true`, `false`, `nil`,
    /// `null` and `~` are literals; any other bare word is a path.
    pub fn from_token(token: &Token) -> Result<Arg, SyntaxError> {
        let word = match token {
            Token::Literal(text) => return Ok(Arg::Literal(Node::string(text.clone()))),
            Token::Reference(word) => word.as_str(),
        };

        let literal = match word {
            "true" => Some(Node::boolean(true)),
            "false" => Some(Node::boolean(false)),
            "nil" | "null" | "~" => Some(Node::null()),
            _ if word.parse::<i64>().is_ok() => word.parse::<i64>().ok().map(Node::integer),
            _ if word.parse::<f64>().is_ok() && word.contains(['.', 'e', 'E']) => {
                Some(Node::Scalar(Yaml::Real(word.to_string())))
            }
            _ => None,
        };

        match literal {
            Some(node) => Ok(Arg::Literal(node)),
            None => Cursor::parse(word).map(Arg::Reference),
        }
    }
}

/// What a call site becomes.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Replace the call site with this value.
    Replace(Node),
    /// Remove the calling key and merge these entries into its parent.
    Inject(IndexMap<String, Node>),
}

/// Why a single call failed. The evaluator attaches the call-site path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct OpError(pub String);

impl OpError {
    pub fn new(message: impl Into<String>) -> Self {
        OpError(message.into())
    }
}

impl From<SecretError> for OpError {
    fn from(e: SecretError) -> Self {
        OpError(e.to_string())
    }
}

impl From<NotFoundError> for OpError {
    fn from(e: NotFoundError) -> Self {
        OpError(e.to_string())
    }
}

/// Everything an operator sees while it runs.
pub struct OpContext<'a> {
    /// The tree as it is at this point of evaluation.
    pub tree: &'a Node,
    /// The call site, with list elements addressed by index.
    pub here: &'a Cursor,
    pub run: &'a mut RunContext,
}

impl OpContext<'_> {
    /// Resolve an argument to a value.
    pub fn resolve(&self, arg: &Arg) -> Result<Node, OpError> {
        match arg {
            Arg::Literal(value) => Ok(value.clone()),
            Arg::Reference(path) => path
                .resolve(self.tree)
                .cloned()
                .map_err(|e| OpError(format!("Unable to resolve `{}`: {}", path, e))),
        }
    }
}

pub trait Operator {
    /// Called once before evaluation starts.
    fn setup(&mut self) -> Result<(), OpError> {
        Ok(())
    }

    fn phase(&self) -> Phase;

    /// Paths this call must see in their final state.
    ///
    /// `auto` holds the canonical form of every reference argument (trimmed
    /// to its longest existing prefix). Most operators return it unchanged;
    /// operators that read the tree around `here` add those paths.
    fn dependencies(&self, _here: &Cursor, _tree: &Node, _args: &[Arg], auto: Vec<Cursor>) -> Vec<Cursor> {
        auto
    }

    fn run(&self, ctx: &mut OpContext<'_>, args: &[Arg]) -> Result<Response, OpError>;
}

/// Named operators available to an evaluator.
#[derive(Default)]
pub struct Registry {
    operators: IndexMap<String, Box<dyn Operator>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in operator.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("grab", Box::new(operators::Grab));
        registry.register("concat", Box::new(operators::Concat));
        registry.register("string", Box::new(operators::Concat));
        registry.register("join", Box::new(operators::Join));
        registry.register("param", Box::new(operators::Param));
        registry.register("static_ips", Box::new(operators::StaticIps));
        registry.register("vault", Box::new(operators::Vault));
        registry.register("inject", Box::new(operators::Inject));
        registry.register("prune", Box::new(operators::Prune));
        registry
    }

    /// Add an operator, replacing any previous one of the same name.
    pub fn register(&mut self, name: impl Into<String>, op: Box<dyn Operator>) {
        self.operators.insert(name.into(), op);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Operator> {
        self.operators.get(name).map(|op| op.as_ref())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.operators.keys().map(String::as_str)
    }

    /// Run every operator's [`Operator::setup`].
    pub fn setup(&mut self) -> Result<(), (String, OpError)> {
        for (name, op) in self.operators.iter_mut() {
            op.setup().map_err(|e| (name.clone(), e))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arg(token: Token) -> Arg {
        Arg::from_token(&token).unwrap()
    }

    #[test]
    fn test_literal_forms() {
        assert_eq!(arg(Token::Reference("42".into())), Arg::Literal(Node::integer(42)));
        assert_eq!(arg(Token::Reference("-1".into())), Arg::Literal(Node::integer(-1)));
        assert_eq!(
            arg(Token::Reference("1.5".into())),
            Arg::Literal(Node::Scalar(Yaml::Real("1.5".into())))
        );
        assert_eq!(arg(Token::Reference("true".into())), Arg::Literal(Node::boolean(true)));
        assert_eq!(arg(Token::Reference("~".into())), Arg::Literal(Node::null()));
        assert_eq!(arg(Token::Literal("a.b".into())), Arg::Literal(Node::string("a.b")));
    }

    #[test]
    fn test_reference_forms() {
        assert_eq!(
            arg(Token::Reference("meta.name".into())),
            Arg::Reference(Cursor::parse("meta.name").unwrap())
        );
        assert!(Arg::from_token(&Token::Reference("a]".into())).is_err());
    }

    #[test]
    fn test_builtins_registered() {
        let registry = Registry::with_builtins();
        let names: Vec<&str> = registry.names().collect();
        assert_eq!(
            names,
            ["grab", "concat", "string", "join", "param", "static_ips", "vault", "inject", "prune"]
        );
        assert_eq!(registry.get("inject").map(|op| op.phase()), Some(Phase::Merge));
        assert_eq!(registry.get("param").map(|op| op.phase()), Some(Phase::Param));
        assert_eq!(registry.get("grab").map(|op| op.phase()), Some(Phase::Eval));
        assert!(registry.get("nope").is_none());
    }
}

/*
 * syntax.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * The `(( name args ))` call syntax shared by array-merge markers and operators.
 */

//! Operator call syntax.
//!
//! A scalar is an operator call only when its entire trimmed text matches
//! `(( name args... ))`. Arguments are split by [`tokenize`] into quoted
//! literals and bare references. Backslash escapes the next character,
//! including quotes and whitespace.

use crate::error::SyntaxError;
use once_cell::sync::Lazy;
use regex::Regex;

static CALL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\(\(\s*([A-Za-z][A-Za-z0-9_-]*)\s*(.*?)\s*\)\)$").unwrap());

/// An operator call found in a scalar, not yet tokenized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallText<'a> {
    pub name: &'a str,
    pub args: &'a str,
}

/// Match `text` against the call syntax.
pub fn parse_call(text: &str) -> Option<CallText<'_>> {
    let caps = CALL_RE.captures(text.trim())?;
    Some(CallText {
        name: caps.get(1)?.as_str(),
        args: caps.get(2).map_or("", |m| m.as_str()),
    })
}

/// True when `text` is a call to the operator `name`.
pub fn is_call_to(text: &str, name: &str) -> bool {
    parse_call(text).is_some_and(|call| call.name == name)
}

/// One argument token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Quoted text, with quotes removed and escapes applied.
    Literal(String),
    /// A bare word: usually a path, sometimes a number or keyword.
    Reference(String),
}

impl Token {
    pub fn text(&self) -> &str {
        match self {
            Token::Literal(s) | Token::Reference(s) => s,
        }
    }
}

fn finish(buf: &mut String, quoted: &mut bool, tokens: &mut Vec<Token>) {
    let text = std::mem::take(buf);
    tokens.push(if *quoted {
        Token::Literal(text)
    } else {
        Token::Reference(text)
    });
    *quoted = false;
}

/// Split an argument string into tokens.
pub fn tokenize(args: &str) -> Result<Vec<Token>, SyntaxError> {
    let mut tokens = Vec::new();
    let mut buf = String::new();
    let mut in_token = false;
    let mut quoted = false;
    let mut open_quote: Option<usize> = None;

    let mut chars = args.chars().enumerate();
    while let Some((position, c)) = chars.next() {
        match c {
            '\\' => {
                in_token = true;
                match chars.next() {
                    Some((_, escaped)) => buf.push(escaped),
                    None => buf.push('\\'),
                }
            }
            '"' => {
                in_token = true;
                quoted = true;
                open_quote = match open_quote {
                    Some(_) => None,
                    None => Some(position),
                };
            }
            c if c.is_whitespace() && open_quote.is_none() => {
                if in_token {
                    finish(&mut buf, &mut quoted, &mut tokens);
                    in_token = false;
                }
            }
            c => {
                in_token = true;
                buf.push(c);
            }
        }
    }

    if let Some(position) = open_quote {
        return Err(SyntaxError {
            problem: "unterminated quoted string".into(),
            position,
        });
    }
    if in_token {
        finish(&mut buf, &mut quoted, &mut tokens);
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_call_shapes() {
        let call = parse_call("(( grab meta.name ))").unwrap();
        assert_eq!(call.name, "grab");
        assert_eq!(call.args, "meta.name");

        let call = parse_call("  ((grab meta.name))  ").unwrap();
        assert_eq!(call.name, "grab");
        assert_eq!(call.args, "meta.name");

        let call = parse_call("(( inline ))").unwrap();
        assert_eq!(call.name, "inline");
        assert_eq!(call.args, "");
    }

    #[test]
    fn test_parse_call_is_anchored() {
        assert!(parse_call("prefix (( grab x ))").is_none());
        assert!(parse_call("\"(( grab x ))\"").is_none());
        assert!(parse_call("(( grab x )) suffix").is_none());
        assert!(parse_call("plain text").is_none());
    }

    #[test]
    fn test_is_call_to() {
        assert!(is_call_to("(( prune ))", "prune"));
        assert!(!is_call_to("(( pruned ))", "prune"));
    }

    #[test]
    fn test_tokenize_literals_and_references() {
        let tokens = tokenize(r#""literal " a.b  c"#).unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Literal("literal ".into()),
                Token::Reference("a.b".into()),
                Token::Reference("c".into()),
            ]
        );
    }

    #[test]
    fn test_tokenize_escapes() {
        let tokens = tokenize(r#""say \"hi\"" a\ b"#).unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Literal("say \"hi\"".into()),
                Token::Reference("a b".into()),
            ]
        );
    }

    #[test]
    fn test_tokenize_empty_literal() {
        assert_eq!(tokenize(r#""""#).unwrap(), vec![Token::Literal(String::new())]);
        assert!(tokenize("   ").unwrap().is_empty());
    }

    #[test]
    fn test_tokenize_unterminated() {
        let err = tokenize(r#"a "open"#).unwrap_err();
        assert_eq!(err.position, 2);
    }
}

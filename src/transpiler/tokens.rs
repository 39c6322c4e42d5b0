//! Single-Pass Token Sweep
//!
//! One regex pass that splits declaration text into whitespace, comments,
//! string/template literals, numbers, identifiers, and punctuation. The
//! encoder classifies these into referenceable identifiers and opaque text;
//! the decoder and the bundling engine reuse the same sweep for safe
//! identifier renaming (a rename must never touch string contents).

use once_cell::sync::Lazy;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Whitespace,
    LineComment,
    BlockComment,
    Str,
    Template,
    Number,
    Ident,
    Punct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
}

impl<'a> Token<'a> {
    pub fn is_trivia(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Whitespace | TokenKind::LineComment | TokenKind::BlockComment
        )
    }
}

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?x)
        (?P<ws>\s+)
      | (?P<line_comment>//[^\n]*)
      | (?P<block_comment>/\*[\s\S]*?\*/)
      | (?P<string>'(?:[^'\\\n]|\\[\s\S])*'|"(?:[^"\\\n]|\\[\s\S])*")
      | (?P<template>`(?:[^`\\]|\\[\s\S])*`)
      | (?P<number>0[xXbBoO][0-9a-fA-F_]+n?|\d[\d_]*(?:\.[\d_]*)?(?:[eE][+-]?\d+)?n?)
      | (?P<ident>[A-Za-z_$][A-Za-z0-9_$]*)
      | (?P<punct>[^\sA-Za-z0-9_$])
    "#,
    )
    .unwrap()
});

/// Split `text` into tokens. Every byte of the input belongs to exactly one
/// token, so joining the token texts reproduces the input.
pub fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    for captures in TOKEN_RE.captures_iter(text) {
        let (kind, m) = if let Some(m) = captures.name("ws") {
            (TokenKind::Whitespace, m)
        } else if let Some(m) = captures.name("line_comment") {
            (TokenKind::LineComment, m)
        } else if let Some(m) = captures.name("block_comment") {
            (TokenKind::BlockComment, m)
        } else if let Some(m) = captures.name("string") {
            (TokenKind::Str, m)
        } else if let Some(m) = captures.name("template") {
            (TokenKind::Template, m)
        } else if let Some(m) = captures.name("number") {
            (TokenKind::Number, m)
        } else if let Some(m) = captures.name("ident") {
            (TokenKind::Ident, m)
        } else if let Some(m) = captures.name("punct") {
            (TokenKind::Punct, m)
        } else {
            continue;
        };
        tokens.push(Token {
            kind,
            text: m.as_str(),
        });
    }
    tokens
}

/// Rename every identifier token equal to `from` into `to`, leaving strings,
/// comments, and everything else untouched.
pub fn rename_identifier(text: &str, from: &str, to: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for token in tokenize(text) {
        if token.kind == TokenKind::Ident && token.text == from {
            out.push_str(to);
        } else {
            out.push_str(token.text);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_cover_every_byte() {
        let text = "declare function f(a: string, b?: number): void; // tail\n";
        let joined: String = tokenize(text).iter().map(|t| t.text).collect();
        assert_eq!(joined, text);
    }

    #[test]
    fn classifies_literals_and_identifiers() {
        let tokens = tokenize(r#"type X = "a|b" | `t` | 0x1F | foo;"#);
        let kinds: Vec<TokenKind> = tokens
            .iter()
            .filter(|t| !t.is_trivia())
            .map(|t| t.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Ident,  // type
                TokenKind::Ident,  // X
                TokenKind::Punct,  // =
                TokenKind::Str,    // "a|b"
                TokenKind::Punct,  // |
                TokenKind::Template,
                TokenKind::Punct,  // |
                TokenKind::Number, // 0x1F
                TokenKind::Punct,  // |
                TokenKind::Ident,  // foo
                TokenKind::Punct,  // ;
            ]
        );
    }

    #[test]
    fn rename_skips_string_contents() {
        let renamed = rename_identifier("var User = [\"interface User\", User];", "User", "User$1");
        assert_eq!(renamed, "var User$1 = [\"interface User\", User$1];");
    }

    #[test]
    fn rename_matches_whole_identifiers_only() {
        let renamed = rename_identifier("UserName + User", "User", "U");
        assert_eq!(renamed, "UserName + U");
    }
}

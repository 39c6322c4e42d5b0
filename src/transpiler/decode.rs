//! Pseudocode → Declaration Decoding
//!
//! Reverses the encoding after the bundling engine has done its module-graph
//! work. Import/export statements pass through (chunk-relative specifiers
//! lose their JS-like extension so they resolve as type-only references);
//! recognized namespace-object calls become `declare namespace` blocks;
//! every other `var` declaration whose initializer is an array literal is
//! reduced back to the original statement text, with identifier elements
//! substituted by (possibly engine-renamed) name. Statement order is
//! preserved.

use crate::transpiler::statement::split_statements;
use crate::transpiler::tokens::{Token, TokenKind, tokenize};
use rustc_hash::FxHashSet;
use tracing::warn;

/// Strip a JS-like extension from a chunk-relative specifier so the emitted
/// declaration references the sibling declaration module.
fn strip_js_extension(specifier: &str) -> String {
    if specifier.starts_with("./") || specifier.starts_with("../") {
        for ext in [".js", ".mjs", ".cjs", ".jsx"] {
            if let Some(stripped) = specifier.strip_suffix(ext) {
                return stripped.to_string();
            }
        }
    }
    specifier.to_string()
}

/// Rewrite the string literal of an import/export `from` clause (or a
/// side-effect import) with its JS extension stripped.
fn rewrite_specifier(text: &str) -> String {
    let tokens = tokenize(text);
    let mut out = String::with_capacity(text.len());

    for token in &tokens {
        if token.kind == TokenKind::Str && token.text.len() >= 2 {
            let quote = &token.text[..1];
            let inner = &token.text[1..token.text.len() - 1];
            let stripped = strip_js_extension(inner);
            out.push_str(&format!("{quote}{stripped}{quote}"));
        } else {
            out.push_str(token.text);
        }
    }

    out
}

/// Unescape one string-literal token back into its text fragment.
fn unescape_string(token: &str) -> String {
    if token.starts_with('"') {
        if let Ok(text) = serde_json::from_str::<String>(token) {
            return text;
        }
    }
    // Single-quoted or malformed: minimal manual unescape.
    let inner = token
        .strip_prefix('\'')
        .and_then(|t| t.strip_suffix('\''))
        .or_else(|| {
            token
                .strip_prefix('"')
                .and_then(|t| t.strip_suffix('"'))
        })
        .unwrap_or(token);

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Significant tokens of a statement.
fn significant<'a>(text: &'a str) -> Vec<Token<'a>> {
    tokenize(text).into_iter().filter(|t| !t.is_trivia()).collect()
}

/// Try to reduce a `var <name> = [...];` statement to its declaration text.
/// Returns `None` when the statement is not an array-initialized variable.
fn reduce_array_statement(tokens: &[Token<'_>]) -> Option<String> {
    let mut idx = 0usize;
    match tokens.first() {
        Some(t) if t.kind == TokenKind::Ident && matches!(t.text, "var" | "let" | "const") => {
            idx += 1;
        }
        _ => return None,
    }
    if tokens.get(idx).map(|t| t.kind) != Some(TokenKind::Ident) {
        return None;
    }
    idx += 1;
    if tokens.get(idx).map(|t| t.text) != Some("=") {
        return None;
    }
    idx += 1;
    if tokens.get(idx).map(|t| t.text) != Some("[") {
        return None;
    }
    idx += 1;

    let mut text = String::new();
    let mut depth = 1i32;
    while idx < tokens.len() {
        let token = tokens[idx];
        match (token.kind, token.text) {
            (TokenKind::Punct, "[") => depth += 1,
            (TokenKind::Punct, "]") => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            (TokenKind::Punct, ",") if depth == 1 => {}
            (TokenKind::Str, _) => text.push_str(&unescape_string(token.text)),
            (TokenKind::Ident, name) => text.push_str(name),
            (TokenKind::Number, n) => text.push_str(n),
            _ => {}
        }
        idx += 1;
    }

    Some(text)
}

/// Try to reconstruct a namespace-object call of the recognized shape
/// `ns(Name, { key: () => ident, ... })` (optionally `var x = ns(...)`)
/// into a `declare namespace` block.
fn reduce_namespace_call(tokens: &[Token<'_>]) -> Option<String> {
    let mut idx = 0usize;

    // Optional `var x =` prefix.
    if tokens
        .first()
        .is_some_and(|t| t.kind == TokenKind::Ident && matches!(t.text, "var" | "let" | "const"))
    {
        if tokens.get(1).map(|t| t.kind) != Some(TokenKind::Ident) {
            return None;
        }
        if tokens.get(2).map(|t| t.text) != Some("=") {
            return None;
        }
        idx = 3;
    }

    // Callee identifier followed by `( Name , {`.
    if tokens.get(idx).map(|t| t.kind) != Some(TokenKind::Ident) {
        return None;
    }
    if tokens.get(idx + 1).map(|t| t.text) != Some("(") {
        return None;
    }
    let name = tokens
        .get(idx + 2)
        .filter(|t| t.kind == TokenKind::Ident)?
        .text;
    if tokens.get(idx + 3).map(|t| t.text) != Some(",") {
        return None;
    }
    if tokens.get(idx + 4).map(|t| t.text) != Some("{") {
        return None;
    }

    let mut idx = idx + 5;
    let mut members: Vec<(String, String)> = Vec::new();

    while idx < tokens.len() && tokens[idx].text != "}" {
        // key : ( ) => value
        let key = match tokens[idx].kind {
            TokenKind::Ident => tokens[idx].text.to_string(),
            TokenKind::Str => unescape_string(tokens[idx].text),
            _ => return None,
        };
        if tokens.get(idx + 1).map(|t| t.text) != Some(":") {
            return None;
        }
        if tokens.get(idx + 2).map(|t| t.text) != Some("(") {
            return None;
        }
        if tokens.get(idx + 3).map(|t| t.text) != Some(")") {
            return None;
        }
        if tokens.get(idx + 4).map(|t| t.text) != Some("=") {
            return None;
        }
        if tokens.get(idx + 5).map(|t| t.text) != Some(">") {
            return None;
        }
        let value = tokens
            .get(idx + 6)
            .filter(|t| t.kind == TokenKind::Ident)?
            .text
            .to_string();
        members.push((value, key));
        idx += 7;
        if tokens.get(idx).map(|t| t.text) == Some(",") {
            idx += 1;
        }
    }

    let specifiers: Vec<String> = members
        .iter()
        .map(|(value, key)| {
            if value == key {
                value.clone()
            } else {
                format!("{value} as {key}")
            }
        })
        .collect();

    Some(format!(
        "declare namespace {name} {{\n  export {{ {} }};\n}}",
        specifiers.join(", ")
    ))
}

/// Decode the bundling engine's pseudocode output back into declaration text.
pub fn pseudocode_to_dts(pseudocode: &str) -> String {
    let statements = split_statements(pseudocode);
    let mut out = String::with_capacity(pseudocode.len());
    let mut seen_exports: FxHashSet<String> = FxHashSet::default();

    for statement in &statements {
        let tokens = significant(&statement.text);
        let head = tokens.first().map(|t| t.text).unwrap_or_default();

        let decoded = if head == "import" || head == "export" {
            // Header statements pass through with extensions stripped;
            // exact duplicates (merged by the engine) collapse.
            let rewritten = rewrite_specifier(&statement.text);
            if !seen_exports.insert(rewritten.clone()) {
                continue;
            }
            rewritten
        } else if let Some(namespace) = reduce_namespace_call(&tokens) {
            namespace
        } else if let Some(text) = reduce_array_statement(&tokens) {
            text
        } else if matches!(head, "var" | "let" | "const") {
            // Engine-generated helper without an array initializer; it has
            // no declaration counterpart.
            warn!(statement = %statement.text, "dropping non-declaration helper");
            continue;
        } else {
            statement.text.clone()
        };

        if let Some(comment) = &statement.leading_comment {
            out.push_str(comment);
            out.push('\n');
        }
        out.push_str(decoded.trim_end());
        out.push('\n');
    }

    out
}

//! Declaration Statement Splitting and Classification
//!
//! A lightweight statement scanner for declaration text: splits a document
//! into top-level statements (tracking strings, template literals, comments,
//! bracket depth, and generic angle depth), captures leading comments
//! verbatim, and classifies each statement into a closed set of kinds.
//!
//! Classification is a tagged union over statement kinds, so downstream
//! code gets an exhaustive `match` instead of stringly-typed node tags.

use crate::transpiler::tokens::{Token, TokenKind, tokenize};

/// One top-level statement as found in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawStatement {
    /// Comment block immediately preceding the statement, verbatim.
    pub leading_comment: Option<String>,
    /// Statement text, trimmed, including any trailing `;`.
    pub text: String,
    /// Byte offset of the statement start in the document.
    pub offset: u32,
}

/// The closed set of top-level statement kinds the pipeline distinguishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementKind {
    /// `import ...` in any form, including `import x = require(...)`.
    Import,
    /// `export ... from "..."` (re-export, a genuine module edge).
    ExportFrom,
    /// `export { ... };` without a module specifier.
    ExportNamed,
    /// `export = X;`
    ExportAssignment { name: Option<String> },
    /// `export default <expression>;` where the expression is not a
    /// declaration (declarations keep their own kind and set `is_default`).
    ExportDefaultExpr { name: Option<String> },
    Interface { name: String },
    TypeAlias { name: String },
    Class { name: Option<String> },
    Function { name: Option<String> },
    Enum { name: String },
    /// `namespace N`, `module N`, `declare module "spec"`, `declare global`.
    Namespace { name: String },
    /// Single-identifier `const`/`let`/`var` declaration.
    Var { name: Option<String> },
    /// Anything else (unrecognized or executable statements).
    Other,
}

impl StatementKind {
    /// The name this statement declares, if any.
    pub fn declared_name(&self) -> Option<&str> {
        match self {
            StatementKind::Interface { name }
            | StatementKind::TypeAlias { name }
            | StatementKind::Enum { name }
            | StatementKind::Namespace { name } => Some(name),
            StatementKind::Class { name }
            | StatementKind::Function { name }
            | StatementKind::Var { name } => name.as_deref(),
            _ => None,
        }
    }

    /// Whether this kind needs a `declare` modifier to stand alone in a
    /// declaration file (interfaces and type aliases do not).
    pub fn needs_declare(&self) -> bool {
        matches!(
            self,
            StatementKind::Class { .. }
                | StatementKind::Function { .. }
                | StatementKind::Enum { .. }
                | StatementKind::Var { .. }
                | StatementKind::Namespace { .. }
        )
    }
}

/// A classified statement: the kind plus its export modifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedStatement {
    pub kind: StatementKind,
    pub exported: bool,
    pub is_default: bool,
}

/// Keywords that open a brace-terminated statement (no trailing `;`).
fn is_brace_form_head(head: &str) -> bool {
    matches!(
        head,
        "interface" | "namespace" | "module" | "enum" | "class" | "global" | "function"
    )
}

/// Modifier keywords skipped when looking for a statement's head keyword.
fn is_modifier(word: &str) -> bool {
    matches!(word, "export" | "default" | "declare" | "abstract" | "async")
}

/// Find the head keyword of a statement prefix (identifier words only).
fn head_keyword(prefix: &str) -> Option<String> {
    let mut words = prefix
        .split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$'))
        .filter(|w| !w.is_empty());

    let mut head = words.next()?;
    while is_modifier(head) {
        head = words.next()?;
    }
    // `const enum E {}` is brace-form even though plain `const` is not.
    if head == "const" {
        if let Some(next) = words.next() {
            if next == "enum" {
                return Some("enum".to_string());
            }
        }
        return Some("const".to_string());
    }
    Some(head.to_string())
}

/// Split a declaration document into top-level statements.
pub fn split_statements(source: &str) -> Vec<RawStatement> {
    let bytes = source.as_bytes();
    let len = bytes.len();
    let mut statements = Vec::new();

    let mut i = 0usize;
    let mut pending_comment: Vec<&str> = Vec::new();

    while i < len {
        let c = bytes[i];

        // Between statements: skip whitespace, collect comments.
        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }
        if c == b'/' && i + 1 < len && bytes[i + 1] == b'/' {
            let start = i;
            while i < len && bytes[i] != b'\n' {
                i += 1;
            }
            pending_comment.push(&source[start..i]);
            continue;
        }
        if c == b'/' && i + 1 < len && bytes[i + 1] == b'*' {
            let start = i;
            i += 2;
            while i + 1 < len && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                i += 1;
            }
            i = (i + 2).min(len);
            pending_comment.push(&source[start..i]);
            continue;
        }

        // Statement start.
        let stmt_start = i;
        let mut depth = 0i32;
        let mut angle = 0i32;
        let mut brace_form: Option<bool> = None;
        let mut stmt_end = len;

        while i < len {
            let b = bytes[i];
            match b {
                b'\'' | b'"' => {
                    let quote = b;
                    i += 1;
                    while i < len && bytes[i] != quote {
                        if bytes[i] == b'\\' {
                            i += 1;
                        }
                        i += 1;
                    }
                    i += 1;
                    continue;
                }
                b'`' => {
                    i += 1;
                    while i < len && bytes[i] != b'`' {
                        if bytes[i] == b'\\' {
                            i += 1;
                        }
                        i += 1;
                    }
                    i += 1;
                    continue;
                }
                b'/' if i + 1 < len && bytes[i + 1] == b'/' => {
                    while i < len && bytes[i] != b'\n' {
                        i += 1;
                    }
                    continue;
                }
                b'/' if i + 1 < len && bytes[i + 1] == b'*' => {
                    i += 2;
                    while i + 1 < len && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                        i += 1;
                    }
                    i = (i + 2).min(len);
                    continue;
                }
                b'<' => {
                    angle += 1;
                }
                b'>' => {
                    if i > stmt_start && bytes[i - 1] == b'=' {
                        // `=>` arrow, not a generic close.
                    } else if angle > 0 {
                        angle -= 1;
                    }
                }
                b'{' => {
                    if depth == 0 && angle == 0 && brace_form.is_none() {
                        let head = head_keyword(&source[stmt_start..i]);
                        brace_form = Some(
                            head.as_deref()
                                .map(is_brace_form_head)
                                .unwrap_or(false),
                        );
                    }
                    depth += 1;
                }
                b'(' | b'[' => {
                    depth += 1;
                }
                b'}' => {
                    depth -= 1;
                    if depth == 0 && angle == 0 && brace_form == Some(true) {
                        stmt_end = i + 1;
                        i += 1;
                        break;
                    }
                }
                b')' | b']' => {
                    depth -= 1;
                }
                b';' => {
                    if depth == 0 && angle == 0 {
                        stmt_end = i + 1;
                        i += 1;
                        break;
                    }
                }
                _ => {}
            }
            i += 1;
        }

        let text = source[stmt_start..stmt_end.min(len)].trim();
        if !text.is_empty() {
            let leading_comment = if pending_comment.is_empty() {
                None
            } else {
                Some(pending_comment.join("\n"))
            };
            statements.push(RawStatement {
                leading_comment,
                text: text.to_string(),
                offset: stmt_start as u32,
            });
        }
        pending_comment.clear();
    }

    statements
}

/// Significant (non-trivia) tokens of a statement.
fn significant<'a>(tokens: &'a [Token<'a>]) -> Vec<Token<'a>> {
    tokens.iter().copied().filter(|t| !t.is_trivia()).collect()
}

/// Classify one statement's text.
pub fn classify(text: &str) -> ClassifiedStatement {
    let all = tokenize(text);
    let tokens = significant(&all);

    let mut idx = 0usize;
    let word = |i: usize| -> Option<&str> {
        tokens
            .get(i)
            .filter(|t| t.kind == TokenKind::Ident)
            .map(|t| t.text)
    };
    let punct = |i: usize| -> Option<&str> {
        tokens
            .get(i)
            .filter(|t| t.kind == TokenKind::Punct)
            .map(|t| t.text)
    };

    let mut exported = false;
    let mut is_default = false;

    if word(idx) == Some("import") {
        return ClassifiedStatement {
            kind: StatementKind::Import,
            exported: false,
            is_default: false,
        };
    }

    if word(idx) == Some("export") {
        exported = true;
        idx += 1;

        if punct(idx) == Some("=") {
            let name = word(idx + 1).map(|s| s.to_string());
            return ClassifiedStatement {
                kind: StatementKind::ExportAssignment { name },
                exported,
                is_default: false,
            };
        }

        if word(idx) == Some("default") {
            is_default = true;
            idx += 1;
        }

        if word(idx) == Some("type") && matches!(punct(idx + 1), Some("{") | Some("*")) {
            // `export type { ... }` / `export type * from ...`
            idx += 1;
        }

        if matches!(punct(idx), Some("{") | Some("*")) {
            let has_from = tokens[idx..]
                .iter()
                .any(|t| t.kind == TokenKind::Ident && t.text == "from");
            let kind = if has_from {
                StatementKind::ExportFrom
            } else {
                StatementKind::ExportNamed
            };
            return ClassifiedStatement {
                kind,
                exported,
                is_default,
            };
        }
    }

    // Skip remaining modifiers (`declare`, `abstract`, `async`).
    while word(idx).is_some_and(is_modifier) {
        idx += 1;
    }

    let kind = match word(idx) {
        Some("interface") => StatementKind::Interface {
            name: word(idx + 1).unwrap_or_default().to_string(),
        },
        Some("type") => match word(idx + 1) {
            Some(name) => StatementKind::TypeAlias {
                name: name.to_string(),
            },
            None => StatementKind::Other,
        },
        Some("class") => StatementKind::Class {
            name: word(idx + 1).map(|s| s.to_string()),
        },
        Some("function") => {
            // Skip a generator star if present.
            let name = if punct(idx + 1) == Some("*") {
                word(idx + 2)
            } else {
                word(idx + 1)
            };
            StatementKind::Function {
                name: name.map(|s| s.to_string()),
            }
        }
        Some("enum") => StatementKind::Enum {
            name: word(idx + 1).unwrap_or_default().to_string(),
        },
        Some("const") if word(idx + 1) == Some("enum") => StatementKind::Enum {
            name: word(idx + 2).unwrap_or_default().to_string(),
        },
        Some("namespace") | Some("module") => {
            let name = match tokens.get(idx + 1) {
                Some(t) if t.kind == TokenKind::Ident => t.text.to_string(),
                Some(t) if t.kind == TokenKind::Str => t.text.to_string(),
                _ => String::new(),
            };
            StatementKind::Namespace { name }
        }
        Some("global") => StatementKind::Namespace {
            name: "global".to_string(),
        },
        Some("const") | Some("let") | Some("var") => {
            // Single-identifier declarator only; destructuring stays opaque.
            let name = word(idx + 1).filter(|_| {
                matches!(punct(idx + 2), Some(":") | Some("=") | Some(";") | None)
            });
            StatementKind::Var {
                name: name.map(|s| s.to_string()),
            }
        }
        Some(ident) if is_default => {
            // `export default Foo;`
            let name = if tokens.len() == idx + 1
                || (tokens.len() == idx + 2 && punct(idx + 1) == Some(";"))
            {
                Some(ident.to_string())
            } else {
                None
            };
            StatementKind::ExportDefaultExpr { name }
        }
        _ if is_default => StatementKind::ExportDefaultExpr { name: None },
        _ => StatementKind::Other,
    };

    ClassifiedStatement {
        kind,
        exported,
        is_default,
    }
}

/// Local names bound by an `import` statement: default imports, namespace
/// imports, named imports (the local side of `as`), and `import x = require`.
pub fn import_bindings(text: &str) -> Vec<String> {
    let all = tokenize(text);
    let tokens = significant(&all);
    let mut bindings = Vec::new();

    if tokens.first().map(|t| t.text) != Some("import") {
        return bindings;
    }

    let mut in_braces = false;
    let mut pending: Option<&str> = None;
    let mut idx = 1usize;

    // Skip the modifier in `import type ...`.
    if tokens.get(idx).is_some_and(|t| t.kind == TokenKind::Ident && t.text == "type")
        && tokens
            .get(idx + 1)
            .is_some_and(|t| t.kind != TokenKind::Ident || t.text != "from")
    {
        idx += 1;
    }

    while idx < tokens.len() {
        let token = tokens[idx];
        match (token.kind, token.text) {
            (TokenKind::Ident, "from") if !in_braces => break,
            (TokenKind::Str, _) => break,
            (TokenKind::Punct, "{") => in_braces = true,
            (TokenKind::Punct, "}") => {
                if let Some(name) = pending.take() {
                    bindings.push(name.to_string());
                }
                in_braces = false;
            }
            (TokenKind::Punct, ",") => {
                if let Some(name) = pending.take() {
                    bindings.push(name.to_string());
                }
            }
            (TokenKind::Punct, "=") => {
                // `import x = require(...)`: x was already recorded.
                break;
            }
            (TokenKind::Ident, "as") => {
                // The local name is whatever follows; discard the imported one.
                pending = None;
            }
            (TokenKind::Ident, "type") if in_braces && pending.is_none() => {
                // Inline type modifier: `{ type A }`.
            }
            (TokenKind::Ident, name) => pending = Some(name),
            _ => {}
        }
        idx += 1;
    }

    if let Some(name) = pending.take() {
        bindings.push(name.to_string());
    }

    bindings
}

/// One specifier of an `export { ... }` clause as `(local, exported)`:
/// identical for `export { A }`, distinct for `export { A as B }`.
pub fn export_specifiers(text: &str) -> Vec<(String, String)> {
    let all = tokenize(text);
    let tokens: Vec<Token<'_>> = significant(&all);
    let mut specifiers = Vec::new();
    let mut in_braces = false;
    let mut local: Option<&str> = None;
    let mut exported: Option<&str> = None;

    let mut flush = |local: &mut Option<&str>, exported: &mut Option<&str>| {
        if let Some(l) = local.take() {
            let e = exported.take().unwrap_or(l);
            specifiers.push((l.to_string(), e.to_string()));
        }
    };

    for token in &tokens {
        match (token.kind, token.text) {
            (TokenKind::Punct, "{") => in_braces = true,
            (TokenKind::Punct, "}") => {
                flush(&mut local, &mut exported);
                break;
            }
            (TokenKind::Punct, ",") if in_braces => flush(&mut local, &mut exported),
            (TokenKind::Ident, "as") if in_braces && local.is_some() => {
                exported = None; // next identifier is the exported name
            }
            (TokenKind::Ident, "type") if in_braces && local.is_none() => {}
            (TokenKind::Ident, name) if in_braces => {
                if local.is_none() {
                    local = Some(name);
                } else {
                    exported = Some(name);
                }
            }
            _ => {}
        }
    }

    specifiers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_semicolon_and_brace_statements() {
        let source = "interface User { id: number; name: string }\ndeclare function getUserName(user: User): string;\n";
        let statements = split_statements(source);
        assert_eq!(statements.len(), 2);
        assert!(statements[0].text.starts_with("interface User"));
        assert!(statements[0].text.ends_with('}'));
        assert!(statements[1].text.ends_with(';'));
    }

    #[test]
    fn object_type_alias_runs_to_semicolon() {
        let source = "type Point = { x: number; y: number };\ntype Pair = [Point, Point];\n";
        let statements = split_statements(source);
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[0].text, "type Point = { x: number; y: number };");
    }

    #[test]
    fn generic_constraint_brace_does_not_end_interface() {
        let source = "interface Box<T extends { id: number }> { value: T }\n";
        let statements = split_statements(source);
        assert_eq!(statements.len(), 1);
        assert!(statements[0].text.ends_with("value: T }"));
    }

    #[test]
    fn captures_leading_comments_verbatim() {
        let source = "/** The user shape. */\ninterface User { id: number }\n// loose trailer\n";
        let statements = split_statements(source);
        assert_eq!(statements.len(), 1);
        assert_eq!(
            statements[0].leading_comment.as_deref(),
            Some("/** The user shape. */")
        );
    }

    #[test]
    fn function_body_terminates_statement() {
        let source = "export function f(): number { return 1; }\nexport const x: number = 2;\n";
        let statements = split_statements(source);
        assert_eq!(statements.len(), 2);
        assert!(statements[0].text.starts_with("export function f"));
    }

    #[test]
    fn classifies_declarations() {
        assert_eq!(
            classify("interface User { id: number }").kind,
            StatementKind::Interface {
                name: "User".to_string()
            }
        );
        assert_eq!(
            classify("export type Role = 'admin' | 'user';"),
            ClassifiedStatement {
                kind: StatementKind::TypeAlias {
                    name: "Role".to_string()
                },
                exported: true,
                is_default: false,
            }
        );
        assert_eq!(
            classify("declare const enum Flag { A }").kind,
            StatementKind::Enum {
                name: "Flag".to_string()
            }
        );
        assert_eq!(
            classify("export declare function f(): void;").kind,
            StatementKind::Function {
                name: Some("f".to_string())
            }
        );
        assert_eq!(
            classify("declare module \"ambient\" { }").kind,
            StatementKind::Namespace {
                name: "\"ambient\"".to_string()
            }
        );
        assert_eq!(
            classify("export declare const VERSION: string;").kind,
            StatementKind::Var {
                name: Some("VERSION".to_string())
            }
        );
    }

    #[test]
    fn classifies_exports() {
        assert_eq!(
            classify("export { User, Role } from './user';").kind,
            StatementKind::ExportFrom
        );
        assert_eq!(
            classify("export { getUserName };").kind,
            StatementKind::ExportNamed
        );
        assert_eq!(
            classify("export type { User } from './user';").kind,
            StatementKind::ExportFrom
        );
        let assignment = classify("export = Config;");
        assert_eq!(
            assignment.kind,
            StatementKind::ExportAssignment {
                name: Some("Config".to_string())
            }
        );
        let default_expr = classify("export default Logger;");
        assert_eq!(
            default_expr.kind,
            StatementKind::ExportDefaultExpr {
                name: Some("Logger".to_string())
            }
        );
        assert!(default_expr.is_default);
    }

    #[test]
    fn default_declaration_keeps_its_kind() {
        let classified = classify("export default class Widget { }");
        assert_eq!(
            classified.kind,
            StatementKind::Class {
                name: Some("Widget".to_string())
            }
        );
        assert!(classified.is_default);
        assert!(classified.exported);
    }

    #[test]
    fn extracts_export_specifiers() {
        assert_eq!(
            export_specifiers("export { User, getUserName as getName, type Role };"),
            vec![
                ("User".to_string(), "User".to_string()),
                ("getUserName".to_string(), "getName".to_string()),
                ("Role".to_string(), "Role".to_string()),
            ]
        );
        assert!(export_specifiers("export * from './m';").is_empty());
    }

    #[test]
    fn extracts_import_bindings() {
        assert_eq!(
            import_bindings("import Default, { A, B as C, type D } from './m';"),
            vec!["Default", "A", "C", "D"]
        );
        assert_eq!(
            import_bindings("import * as helpers from './helpers';"),
            vec!["helpers"]
        );
        assert_eq!(
            import_bindings("import fs = require('fs');"),
            vec!["fs"]
        );
        assert!(import_bindings("import './side-effect';").is_empty());
        assert_eq!(
            import_bindings("import type { User } from './user';"),
            vec!["User"]
        );
    }
}

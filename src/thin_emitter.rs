//! Thin Declaration Emitter
//!
//! The in-tree [`IsolatedDeclarationEmitter`]: derives declaration text from
//! one source file using statement-level analysis only: no type inference
//! beyond literal initializers, no cross-file information. Signatures are
//! kept, bodies and initializers dropped. A value whose type cannot be read
//! off the statement gets an Error diagnostic and `unknown`, never a crash:
//! emission is best-effort by contract.
//!
//! Files already in declaration form pass through unchanged.

use crate::diagnostics::{Diagnostic, Span};
use crate::dts_path::SourceExtension;
use crate::transpiler::statement::{RawStatement, StatementKind, classify, split_statements};
use std::path::Path;
use tracing::trace;

/// Result of emitting one file's declaration text.
#[derive(Debug, Clone, Default)]
pub struct EmitOutput {
    /// Best-effort declaration text; empty means "nothing to declare".
    pub text: String,
    /// Per-file problems found while emitting.
    pub diagnostics: Vec<Diagnostic>,
}

/// Boundary for isolated declaration emission: one source file in,
/// declaration text plus diagnostics out. Implementations must not hold
/// state between calls.
pub trait IsolatedDeclarationEmitter: Sync {
    fn emit(&self, path: &Path, source: &str) -> EmitOutput;
}

/// The default emitter.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThinDeclarationEmitter;

impl ThinDeclarationEmitter {
    pub fn new() -> Self {
        ThinDeclarationEmitter
    }
}

impl IsolatedDeclarationEmitter for ThinDeclarationEmitter {
    fn emit(&self, path: &Path, source: &str) -> EmitOutput {
        let ext = SourceExtension::from_path(path);
        if ext.is_declaration() {
            return EmitOutput {
                text: source.to_string(),
                diagnostics: Vec::new(),
            };
        }
        if ext == SourceExtension::Json {
            // JSON module shape inference is out of scope; declare the
            // default export opaquely.
            return EmitOutput {
                text: "declare const json: unknown;\nexport default json;\n".to_string(),
                diagnostics: Vec::new(),
            };
        }

        let file = path.display().to_string();
        let mut out = String::with_capacity(source.len() / 2);
        let mut diagnostics = Vec::new();

        for statement in split_statements(source) {
            if let Some(declared) = emit_statement(&statement, &file, &mut diagnostics) {
                if let Some(comment) = &statement.leading_comment {
                    out.push_str(comment);
                    out.push('\n');
                }
                out.push_str(declared.trim_end());
                out.push('\n');
            }
        }

        trace!(path = %path.display(), bytes = out.len(), "thin emission finished");
        EmitOutput {
            text: out,
            diagnostics,
        }
    }
}

/// Emit the declaration form of one statement, or `None` when the statement
/// has no declaration counterpart (executable code).
fn emit_statement(
    statement: &RawStatement,
    file: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<String> {
    let info = classify(&statement.text);
    let text = statement.text.as_str();

    match &info.kind {
        StatementKind::Import
        | StatementKind::ExportFrom
        | StatementKind::ExportNamed
        | StatementKind::ExportAssignment { .. }
        | StatementKind::ExportDefaultExpr { .. }
        | StatementKind::Interface { .. }
        | StatementKind::TypeAlias { .. }
        | StatementKind::Namespace { .. } => Some(text.to_string()),
        StatementKind::Enum { .. } => Some(ensure_declare(text)),
        StatementKind::Function { .. } => Some(emit_function(text)),
        StatementKind::Class { .. } => Some(emit_class(text)),
        StatementKind::Var { .. } => Some(emit_var(statement, file, diagnostics)),
        StatementKind::Other => None,
    }
}

/// Insert a `declare` modifier after an `export` prefix, unless one is
/// already present. `export default` declarations stand alone in ambient
/// context and never take `declare`.
fn ensure_declare(text: &str) -> String {
    let mut prefix_len = 0usize;
    let rest = text.trim_start();
    if let Some(r) = rest.strip_prefix("export") {
        let r = r.trim_start();
        if r.starts_with("default") {
            return text.to_string();
        }
        prefix_len = text.len() - r.len();
    }
    let (prefix, body) = text.split_at(prefix_len);
    if body.starts_with("declare") {
        text.to_string()
    } else {
        format!("{prefix}declare {body}")
    }
}

/// Strip a leading `async` modifier from the statement head (declarations
/// carry the `Promise` return type instead).
fn strip_async(text: &str) -> String {
    if let Some(pos) = text.find("async ") {
        // Only strip when it appears before the parameter list.
        let paren = text.find('(').unwrap_or(text.len());
        if pos < paren {
            let mut out = String::with_capacity(text.len());
            out.push_str(&text[..pos]);
            out.push_str(&text[pos + "async ".len()..]);
            return out;
        }
    }
    text.to_string()
}

/// Keep a function's signature; drop its body.
fn emit_function(text: &str) -> String {
    let text = strip_async(text);
    let signature = match body_start(&text) {
        Some(start) => format!("{};", text[..start].trim_end()),
        None => text.to_string(), // overload signature, already body-less
    };
    ensure_declare(&signature)
}

/// Byte offset of a top-level `{` opening a body, tracking strings,
/// comments, bracket depth, and generic angle depth.
fn body_start(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0i32;
    let mut angle = 0i32;
    let mut i = 0usize;

    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' | b'`' => {
                let quote = bytes[i];
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            b'/' if i + 1 < bytes.len() && bytes[i + 1] == b'/' => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if i + 1 < bytes.len() && bytes[i + 1] == b'*' => {
                i += 2;
                while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                    i += 1;
                }
                i += 1;
            }
            b'<' => angle += 1,
            b'>' => {
                if i > 0 && bytes[i - 1] == b'=' {
                    // arrow
                } else if angle > 0 {
                    angle -= 1;
                }
            }
            b'{' => {
                if depth == 0 && angle == 0 {
                    return Some(i);
                }
                depth += 1;
            }
            b'(' | b'[' => depth += 1,
            b'}' | b')' | b']' => depth -= 1,
            _ => {}
        }
        i += 1;
    }
    None
}

/// Keep a class's shape; members lose bodies and initializers.
fn emit_class(text: &str) -> String {
    let text = strip_async(text);
    let Some(start) = body_start(&text) else {
        return ensure_declare(&text);
    };
    let header = text[..start].trim_end();
    let body = &text[start + 1..text.rfind('}').unwrap_or(text.len())];

    let mut members = Vec::new();
    for member in split_class_members(body) {
        let member = member.trim();
        if member.is_empty() {
            continue;
        }
        members.push(format!("    {}", strip_async(member)));
    }

    let declared = if members.is_empty() {
        format!("{header} {{\n}}")
    } else {
        format!("{header} {{\n{}\n}}", members.join("\n"))
    };
    ensure_declare(&declared)
}

/// Split a class body into declaration-form members: method bodies become
/// `;`, property initializers are dropped.
fn split_class_members(body: &str) -> Vec<String> {
    let bytes = body.as_bytes();
    let mut members = Vec::new();
    let mut member_start = 0usize;
    let mut depth = 0i32;
    let mut angle = 0i32;
    let mut seen_eq = false;
    let mut i = 0usize;

    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' | b'`' => {
                let quote = bytes[i];
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            b'/' if i + 1 < bytes.len() && bytes[i + 1] == b'/' => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if i + 1 < bytes.len() && bytes[i + 1] == b'*' => {
                i += 2;
                while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                    i += 1;
                }
                i += 1;
            }
            b'<' => angle += 1,
            b'>' => {
                if i > 0 && bytes[i - 1] == b'=' {
                } else if angle > 0 {
                    angle -= 1;
                }
            }
            b'=' if depth == 0 && angle == 0 => {
                // `=>` belongs to an arrow type, not an initializer.
                if i + 1 >= bytes.len() || bytes[i + 1] != b'>' {
                    seen_eq = true;
                }
            }
            b'{' if depth == 0 && angle == 0 && !seen_eq => {
                // Method body: emit the head, skip the body.
                let head = body[member_start..i].trim_end();
                if !head.is_empty() {
                    members.push(format!("{head};"));
                }
                let mut body_depth = 1i32;
                i += 1;
                while i < bytes.len() && body_depth > 0 {
                    match bytes[i] {
                        b'{' => body_depth += 1,
                        b'}' => body_depth -= 1,
                        _ => {}
                    }
                    i += 1;
                }
                member_start = i;
                seen_eq = false;
                continue;
            }
            b'{' | b'(' | b'[' => depth += 1,
            b'}' | b')' | b']' => depth -= 1,
            b';' if depth == 0 && angle == 0 => {
                let member = body[member_start..i].trim();
                if !member.is_empty() {
                    members.push(declare_member(member));
                }
                member_start = i + 1;
                seen_eq = false;
            }
            _ => {}
        }
        i += 1;
    }

    let tail = body[member_start..].trim();
    if !tail.is_empty() {
        members.push(declare_member(tail));
    }

    members
}

/// Declaration form of one property member: keep the annotation, drop the
/// initializer.
fn declare_member(member: &str) -> String {
    if let Some(eq) = top_level_eq(member) {
        format!("{};", member[..eq].trim_end())
    } else if member.ends_with(';') {
        member.to_string()
    } else {
        format!("{member};")
    }
}

/// Byte offset of a top-level `=` (not `=>`, not `==`), if any.
fn top_level_eq(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0i32;
    let mut angle = 0i32;
    let mut i = 0usize;

    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' | b'`' => {
                let quote = bytes[i];
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            b'<' => angle += 1,
            b'>' => {
                if i > 0 && bytes[i - 1] == b'=' {
                    // The `=` we just saw was an arrow; never report it.
                } else if angle > 0 {
                    angle -= 1;
                }
            }
            b'=' if depth == 0 && angle == 0 => {
                let next = bytes.get(i + 1).copied();
                if next != Some(b'>') && next != Some(b'=') {
                    return Some(i);
                }
                if next == Some(b'>') {
                    i += 1;
                }
            }
            b'{' | b'(' | b'[' => depth += 1,
            b'}' | b')' | b']' => depth -= 1,
            _ => {}
        }
        i += 1;
    }
    None
}

/// Declaration form of a `const`/`let`/`var` statement.
fn emit_var(statement: &RawStatement, file: &str, diagnostics: &mut Vec<Diagnostic>) -> String {
    let text = statement.text.trim_end_matches(';');
    let eq = top_level_eq(text);
    let colon = top_level_colon(text, eq.unwrap_or(text.len()));

    match (colon, eq) {
        // Explicit annotation: keep it, drop the initializer.
        (Some(_), Some(eq)) => ensure_declare(&format!("{};", text[..eq].trim_end())),
        (Some(_), None) => ensure_declare(&format!("{};", text.trim_end())),
        // No annotation: infer literal initializers only.
        (None, Some(eq)) => {
            let head = text[..eq].trim_end();
            let init = text[eq + 1..].trim();
            let is_const = head.contains("const");
            match literal_type(init, is_const) {
                Some(ty) => ensure_declare(&format!("{head}: {ty};")),
                None => {
                    diagnostics.push(Diagnostic::error(
                        file,
                        Span::at(statement.offset),
                        format!(
                            "variable declaration requires an explicit type annotation \
                             for declaration emit: `{head}`"
                        ),
                    ));
                    ensure_declare(&format!("{head}: unknown;"))
                }
            }
        }
        (None, None) => ensure_declare(&format!("{};", text.trim_end())),
    }
}

/// Byte offset of a top-level `:` before `limit`, if any.
fn top_level_colon(text: &str, limit: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0i32;
    let mut angle = 0i32;
    let mut i = 0usize;

    while i < bytes.len().min(limit) {
        match bytes[i] {
            b'\'' | b'"' | b'`' => {
                let quote = bytes[i];
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            b'<' => angle += 1,
            b'>' => {
                if i > 0 && bytes[i - 1] == b'=' {
                } else if angle > 0 {
                    angle -= 1;
                }
            }
            b':' if depth == 0 && angle == 0 => return Some(i),
            b'{' | b'(' | b'[' => depth += 1,
            b'}' | b')' | b']' => depth -= 1,
            _ => {}
        }
        i += 1;
    }
    None
}

/// The declared type of a literal initializer, or `None` when the
/// initializer is not a literal.
fn literal_type(init: &str, is_const: bool) -> Option<String> {
    let init = init.trim().trim_end_matches(';').trim();

    if init == "true" || init == "false" {
        return Some(if is_const {
            init.to_string()
        } else {
            "boolean".to_string()
        });
    }
    if (init.starts_with('"') && init.ends_with('"') && init.len() >= 2)
        || (init.starts_with('\'') && init.ends_with('\'') && init.len() >= 2)
    {
        // Literal must be a single string token.
        if init[1..init.len() - 1].contains(['"', '\'']) {
            return None;
        }
        return Some(if is_const {
            init.to_string()
        } else {
            "string".to_string()
        });
    }
    let numeric = init
        .strip_prefix('-')
        .unwrap_or(init);
    if !numeric.is_empty()
        && numeric
            .chars()
            .all(|c| c.is_ascii_digit() || c == '.' || c == '_')
    {
        return Some(if is_const {
            init.to_string()
        } else {
            "number".to_string()
        });
    }
    None
}

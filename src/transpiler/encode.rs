//! Declaration → Pseudocode Encoding
//!
//! Losslessly re-shapes declaration text into executable-looking JS so a
//! JS-grammar-only bundling engine can analyze it:
//!
//! - import/export header statements stay real import/export statements
//!   (with `type` keywords stripped) so the engine sees genuine module edges;
//! - every other top-level statement becomes `var <name> = [...];` whose
//!   array elements are either bare identifiers (referenceable, so the
//!   engine's dead-code elimination can follow cross-statement references)
//!   or JSON-escaped string fragments (opaque text);
//! - a default export becomes a re-export of its generated variable name.
//!
//! Nothing is dropped, only re-shaped; `decode` reverses the mapping.

use crate::transpiler::statement::{
    ClassifiedStatement, StatementKind, classify, export_specifiers, import_bindings,
    split_statements,
};
use crate::transpiler::tokens::{TokenKind, tokenize};
use rand::Rng;
use rustc_hash::FxHashSet;

/// Generate a fallback identifier for statements that declare no name.
fn fallback_ident() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..8)
        .map(|_| {
            let chars = b"abcdefghijklmnopqrstuvwxyz0123456789";
            chars[rng.gen_range(0..chars.len())] as char
        })
        .collect();
    format!("_decl_{suffix}")
}

/// Strip `type` keywords from an import/export header statement so the
/// bundling engine treats it as a value-level module edge.
fn strip_type_keywords(text: &str) -> String {
    let tokens = tokenize(text);
    let mut out = String::with_capacity(text.len());
    let mut i = 0usize;

    while i < tokens.len() {
        let token = tokens[i];
        if token.kind == TokenKind::Ident && token.text == "type" {
            // Find the previous and next significant tokens.
            let prev = tokens[..i].iter().rev().find(|t| !t.is_trivia());
            let next = tokens[i + 1..].iter().find(|t| !t.is_trivia());

            let after_header = prev.is_some_and(|t| {
                matches!(t.text, "import" | "export" | "{" | ",")
            });
            // Keep `type` when it is itself the imported binding
            // (`{ type }` or `{ type as t }` or `{ type,`).
            let is_binding = next.is_none_or(|t| matches!(t.text, "}" | "," | "as" | "from"));

            if after_header && !is_binding {
                // Swallow the following whitespace too.
                i += 1;
                while i < tokens.len() && tokens[i].kind == TokenKind::Whitespace {
                    i += 1;
                }
                continue;
            }
        }
        out.push_str(token.text);
        i += 1;
    }

    out
}

/// Strip a leading `export` / `export default` modifier from a statement,
/// ensuring kinds that need it keep a `declare` modifier so the text remains
/// valid declaration syntax on its own.
fn strip_export_modifier(text: &str, classified: &ClassifiedStatement) -> String {
    let mut rest = text;
    if let Some(stripped) = rest.strip_prefix("export") {
        rest = stripped.trim_start();
        if let Some(stripped) = rest.strip_prefix("default") {
            rest = stripped.trim_start();
        }
    }

    if classified.kind.needs_declare() && !rest.starts_with("declare") {
        format!("declare {rest}")
    } else {
        rest.to_string()
    }
}

/// Whether an identifier token should stay referenceable in the encoded
/// array: capitalized identifiers, plus anything in the referenced set.
fn is_referenceable(ident: &str, referenced: &FxHashSet<String>) -> bool {
    ident
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_uppercase())
        || referenced.contains(ident)
}

/// Tokenize a statement body into the encoded array-literal elements.
fn encode_elements(text: &str, referenced: &FxHashSet<String>) -> Vec<String> {
    let mut elements = Vec::new();
    let mut opaque = String::new();

    for token in tokenize(text) {
        if token.kind == TokenKind::Ident && is_referenceable(token.text, referenced) {
            if !opaque.is_empty() {
                elements.push(serde_json::to_string(&opaque).unwrap_or_default());
                opaque.clear();
            }
            elements.push(token.text.to_string());
        } else {
            opaque.push_str(token.text);
        }
    }
    if !opaque.is_empty() {
        elements.push(serde_json::to_string(&opaque).unwrap_or_default());
    }

    elements
}

/// Render an `export { ... };` statement from `(local, exported)` pairs.
fn render_export(specifiers: &[(String, String)]) -> String {
    let parts: Vec<String> = specifiers
        .iter()
        .map(|(local, exported)| {
            if local == exported {
                local.clone()
            } else {
                format!("{local} as {exported}")
            }
        })
        .collect();
    format!("export {{ {} }};", parts.join(", "))
}

/// Encode one declaration document into its pseudocode form.
///
/// Statement order is preserved. Encoding is lossless for round-trip decode:
/// no declared symbol or import/export specifier is dropped, only re-shaped.
pub fn dts_to_pseudocode(dts: &str) -> String {
    let statements = split_statements(dts);

    // Referenced names: seeded from import bindings, plus every name any
    // statement declares (forward references included).
    let mut referenced: FxHashSet<String> = FxHashSet::default();
    let classified: Vec<ClassifiedStatement> =
        statements.iter().map(|s| classify(&s.text)).collect();

    for (statement, info) in statements.iter().zip(&classified) {
        match &info.kind {
            StatementKind::Import => {
                referenced.extend(import_bindings(&statement.text));
            }
            kind => {
                if let Some(name) = kind.declared_name() {
                    if !name.is_empty() && !name.starts_with('"') {
                        referenced.insert(name.to_string());
                    }
                }
            }
        }
    }

    let mut out = String::with_capacity(dts.len() + dts.len() / 2);
    let mut already_exported: FxHashSet<String> = FxHashSet::default();

    for (statement, info) in statements.iter().zip(&classified) {
        if let Some(comment) = &statement.leading_comment {
            out.push_str(comment);
            out.push('\n');
        }

        match &info.kind {
            StatementKind::Import | StatementKind::ExportFrom => {
                out.push_str(&strip_type_keywords(&statement.text));
                out.push('\n');
            }
            StatementKind::ExportNamed => {
                // Keep only names not already exported by an earlier
                // statement; drop the statement entirely when none remain.
                let fresh: Vec<(String, String)> = export_specifiers(&statement.text)
                    .into_iter()
                    .filter(|(_, exported)| already_exported.insert(exported.clone()))
                    .collect();
                if !fresh.is_empty() {
                    out.push_str(&render_export(&fresh));
                    out.push('\n');
                }
            }
            StatementKind::ExportAssignment { name } => {
                // `export = X` has no JS equivalent; surface it as the
                // default export so the engine keeps X alive.
                if let Some(name) = name {
                    if already_exported.insert("default".to_string()) {
                        out.push_str(&format!("export {{ {name} as default }};\n"));
                    }
                }
            }
            StatementKind::ExportDefaultExpr { name } => {
                let name = name.clone().unwrap_or_else(fallback_ident);
                if already_exported.insert("default".to_string()) {
                    out.push_str(&format!("export {{ {name} as default }};\n"));
                }
            }
            kind => {
                let name = kind
                    .declared_name()
                    .filter(|n| !n.is_empty() && !n.starts_with('"'))
                    .map(|n| n.to_string())
                    .unwrap_or_else(fallback_ident);

                let body = strip_export_modifier(&statement.text, info);
                let elements = encode_elements(&body, &referenced);
                out.push_str(&format!("var {name} = [{}];\n", elements.join(", ")));

                if info.is_default {
                    if already_exported.insert("default".to_string()) {
                        out.push_str(&format!("export {{ {name} as default }};\n"));
                    }
                } else if info.exported && already_exported.insert(name.clone()) {
                    out.push_str(&format!("export {{ {name} }};\n"));
                }
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn imports_pass_through_with_type_stripped() {
        let dts = "import type { User } from './user';\nimport { type Role, Flag } from './role';\n";
        let encoded = dts_to_pseudocode(dts);
        assert!(encoded.contains("import { User } from './user';"));
        assert!(encoded.contains("import { Role, Flag } from './role';"));
        assert!(!encoded.contains("type"));
    }

    #[test]
    fn interface_becomes_var_with_referenceable_name() {
        let encoded = dts_to_pseudocode("export interface User { id: number }\n");
        assert!(encoded.contains("var User = ["));
        assert!(
            encoded.contains("User,") || encoded.contains(", User") || encoded.contains("[User"),
            "declared name must appear as a bare identifier: {encoded}"
        );
        assert!(encoded.contains("export { User };"));
    }

    #[test]
    fn lowercase_declared_names_are_referenceable() {
        let dts = "export declare function getUserName(user: User): string;\n";
        let encoded = dts_to_pseudocode(dts);
        // Both the declared lowercase name and the capitalized type reference
        // must stay bare so the engine can follow them.
        assert!(encoded.contains("getUserName"));
        assert!(!encoded.contains("\"getUserName"));
        assert!(encoded.contains("User"));
        assert!(encoded.contains("export { getUserName };"));
    }

    #[test]
    fn default_export_reexports_generated_name() {
        let encoded = dts_to_pseudocode("export default class Widget { render(): void; }\n");
        assert!(encoded.contains("var Widget = ["));
        assert!(encoded.contains("export { Widget as default };"));
    }

    #[test]
    fn anonymous_default_gets_fallback_name() {
        let encoded = dts_to_pseudocode("export default function(): void;\n");
        assert!(encoded.contains("var _decl_"));
        assert!(encoded.contains("as default };"));
    }

    #[test]
    fn duplicate_exports_are_guarded() {
        let dts = "export declare const VERSION: string;\nexport { VERSION };\n";
        let encoded = dts_to_pseudocode(dts);
        let count = encoded.matches("export { VERSION }").count();
        assert_eq!(count, 1, "exactly one export of VERSION: {encoded}");
    }

    #[test]
    fn leading_comment_is_preserved() {
        let dts = "/** Current version. */\nexport declare const VERSION: string;\n";
        let encoded = dts_to_pseudocode(dts);
        assert!(encoded.contains("/** Current version. */"));
    }

    #[test]
    fn opaque_text_is_json_escaped() {
        let dts = "declare const banner: \"multi\\nline\";\n";
        let encoded = dts_to_pseudocode(dts);
        // The string literal must survive as escaped JSON inside the array.
        assert!(encoded.contains("var banner = ["));
        assert!(encoded.contains("\\\""), "inner quotes escaped: {encoded}");
    }

    #[test]
    fn export_from_kept_as_module_edge() {
        let dts = "export { User, getUserName } from './user';\n";
        let encoded = dts_to_pseudocode(dts);
        assert!(encoded.contains("export { User, getUserName } from './user';"));
    }

    #[test]
    fn export_assignment_becomes_default_reexport() {
        let encoded = dts_to_pseudocode("declare const config: object;\nexport = config;\n");
        assert!(encoded.contains("var config = ["));
        assert!(encoded.contains("export { config as default };"));
    }

    #[test]
    fn statement_order_is_preserved() {
        let dts = "interface A { }\ninterface B { }\ninterface C { }\n";
        let encoded = dts_to_pseudocode(dts);
        let a = encoded.find("var A").unwrap();
        let b = encoded.find("var B").unwrap();
        let c = encoded.find("var C").unwrap();
        assert!(a < b && b < c);
    }
}

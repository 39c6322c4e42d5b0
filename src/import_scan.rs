//! Import Specifier Extraction
//!
//! Pulls import specifiers out of a source file with a fixed battery of
//! lightweight textual patterns. This is deliberately heuristic (it is not
//! a parser) and sits behind [`ImportExtractor`] so a real lightweight
//! parser could be swapped in without touching the dependency traversal.
//!
//! Covered forms:
//! - Static imports and re-exports: `import { x } from "./m"`, `export * from "./m"`
//! - Side-effect imports: `import "./m"`
//! - Dynamic imports: `import("./m")`
//! - CommonJS: `require("./m")`, `import x = require("./m")`
//! - Triple-slash directives: `/// <reference path="./m.ts" />`,
//!   `/// <reference types="node" />`

use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashSet;

/// How a specifier was referenced. Only used for tracing; resolution treats
/// all kinds identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    Static,
    SideEffect,
    Dynamic,
    Require,
    ReferencePath,
    ReferenceTypes,
}

/// One extracted specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedImport {
    pub specifier: String,
    pub kind: ImportKind,
}

/// Extraction boundary: turns one file's text into its import specifiers.
pub trait ImportExtractor: Sync {
    fn extract(&self, source: &str) -> Vec<ExtractedImport>;
}

static STATIC_FROM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^[ \t]*(?:import|export)\b[^;'"`]*?\bfrom\s*['"]([^'"\n]+)['"]"#).unwrap()
});

static SIDE_EFFECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?m)^[ \t]*import\s*['"]([^'"\n]+)['"]"#).unwrap());

static DYNAMIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\bimport\s*\(\s*['"]([^'"\n]+)['"]\s*\)"#).unwrap());

static REQUIRE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\brequire\s*\(\s*['"]([^'"\n]+)['"]\s*\)"#).unwrap());

static REFERENCE_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?m)^\s*///\s*<reference\s+path\s*=\s*['"]([^'"\n]+)['"]"#).unwrap());

static REFERENCE_TYPES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^\s*///\s*<reference\s+types\s*=\s*['"]([^'"\n]+)['"]"#).unwrap()
});

/// The default extractor: the regex battery above, applied in order, with
/// duplicate specifiers collapsed while preserving first-seen order.
#[derive(Debug, Default, Clone, Copy)]
pub struct RegexImportScanner;

impl RegexImportScanner {
    pub fn new() -> Self {
        RegexImportScanner
    }
}

impl ImportExtractor for RegexImportScanner {
    fn extract(&self, source: &str) -> Vec<ExtractedImport> {
        let mut seen: FxHashSet<&str> = FxHashSet::default();
        let mut imports = Vec::new();

        let batteries: [(&Regex, ImportKind); 6] = [
            (&STATIC_FROM, ImportKind::Static),
            (&SIDE_EFFECT, ImportKind::SideEffect),
            (&DYNAMIC, ImportKind::Dynamic),
            (&REQUIRE, ImportKind::Require),
            (&REFERENCE_PATH, ImportKind::ReferencePath),
            (&REFERENCE_TYPES, ImportKind::ReferenceTypes),
        ];

        for (regex, kind) in batteries {
            for captures in regex.captures_iter(source) {
                let specifier = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
                if specifier.is_empty() || !seen.insert(specifier) {
                    continue;
                }
                imports.push(ExtractedImport {
                    specifier: specifier.to_string(),
                    kind,
                });
            }
        }

        imports
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specifiers(source: &str) -> Vec<String> {
        RegexImportScanner::new()
            .extract(source)
            .into_iter()
            .map(|i| i.specifier)
            .collect()
    }

    #[test]
    fn extracts_static_imports_and_reexports() {
        let source = r#"
import { User } from "./user";
import type { Role } from './role';
import * as helpers from "./helpers";
export { getUserName } from "./user";
export * from "./types";
"#;
        assert_eq!(
            specifiers(source),
            vec!["./user", "./role", "./helpers", "./types"]
        );
    }

    #[test]
    fn extracts_multiline_import_clause() {
        let source = "import {\n  User,\n  Role,\n} from './user';\n";
        assert_eq!(specifiers(source), vec!["./user"]);
    }

    #[test]
    fn extracts_side_effect_import() {
        assert_eq!(specifiers("import \"./polyfill\";\n"), vec!["./polyfill"]);
    }

    #[test]
    fn extracts_dynamic_import_and_require() {
        let source = r#"
const lazy = import("./lazy");
const legacy = require("./legacy");
import fs = require("fs");
"#;
        assert_eq!(specifiers(source), vec!["./lazy", "./legacy", "fs"]);
    }

    #[test]
    fn extracts_triple_slash_references() {
        let source = "/// <reference path=\"./ambient.d.ts\" />\n/// <reference types=\"node\" />\n";
        let extracted = RegexImportScanner::new().extract(source);
        assert_eq!(extracted.len(), 2);
        assert_eq!(extracted[0].specifier, "./ambient.d.ts");
        assert_eq!(extracted[0].kind, ImportKind::ReferencePath);
        assert_eq!(extracted[1].specifier, "node");
        assert_eq!(extracted[1].kind, ImportKind::ReferenceTypes);
    }

    #[test]
    fn deduplicates_repeated_specifiers() {
        let source = "import { A } from './m';\nimport { B } from './m';\n";
        assert_eq!(specifiers(source), vec!["./m"]);
    }

    #[test]
    fn ignores_plain_code() {
        let source = "export const x: number = 1;\nfunction f() { return 'from'; }\n";
        assert!(specifiers(source).is_empty());
    }
}

//! Module Resolution
//!
//! Resolves an import specifier seen inside one source file to an absolute
//! file path, honoring tsconfig-style path mappings and node-style
//! directory/extension probing:
//!
//! - Path mapping from tsconfig (`paths`, `baseUrl`), one wildcard per pattern
//! - Relative imports (`./foo`, `../bar`, `.`)
//! - Absolute paths
//! - `baseUrl` fallback for bare specifiers (default: project root)
//!
//! A specifier that resolves to nothing is *not* an error: callers treat
//! `None` as "external, leave unresolved". Compiled path-mapping patterns are
//! owned by a [`ResolverContext`] that lives for one build and can be cleared
//! at configuration-change boundaries (e.g. between watch-mode restarts).

use dashmap::DashMap;
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Compiler-options-like configuration consumed by the resolver.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolverOptions {
    /// Project root; also the default `baseUrl`.
    pub project_root: PathBuf,
    /// Base directory for non-relative specifiers.
    pub base_url: Option<PathBuf>,
    /// tsconfig `paths` mapping table, in declaration order.
    pub paths: IndexMap<String, Vec<String>>,
    /// Probe `.js`/`.jsx` in addition to the TypeScript extensions.
    pub allow_js: bool,
    /// Probe `.json` files.
    pub resolve_json_module: bool,
}

impl ResolverOptions {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        ResolverOptions {
            project_root: project_root.into(),
            ..Default::default()
        }
    }

    /// The directory non-relative specifiers resolve against.
    fn effective_base(&self) -> &Path {
        self.base_url.as_deref().unwrap_or(&self.project_root)
    }

    /// Extension probe order. Fixed: TypeScript first, then JS when
    /// `allow_js`, then JSON when `resolve_json_module`.
    fn extensions(&self) -> Vec<&'static str> {
        let mut exts = vec![".ts", ".tsx", ".d.ts"];
        if self.allow_js {
            exts.push(".js");
            exts.push(".jsx");
        }
        if self.resolve_json_module {
            exts.push(".json");
        }
        exts
    }
}

/// A compiled `paths` pattern. Patterns contain at most one `*` wildcard;
/// patterns with more are rejected once and never retried.
#[derive(Debug)]
struct CompiledPattern {
    regex: Regex,
    has_wildcard: bool,
}

/// Per-build cache of compiled path-mapping patterns.
///
/// Append-only while a build runs, safe for concurrent reads (multiple
/// output formats resolve in parallel against the same context). `clear()`
/// marks a configuration-change boundary.
#[derive(Debug, Default)]
pub struct ResolverContext {
    patterns: DashMap<String, Option<Arc<CompiledPattern>>>,
}

impl ResolverContext {
    pub fn new() -> Self {
        ResolverContext {
            patterns: DashMap::new(),
        }
    }

    /// Drop all compiled patterns. Call between builds whose configuration
    /// may differ; stale patterns must not survive a config change.
    pub fn clear(&self) {
        self.patterns.clear();
    }

    /// Number of cached patterns (including rejected ones).
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Compile a mapping pattern, caching by pattern string.
    fn compiled(&self, pattern: &str) -> Option<Arc<CompiledPattern>> {
        if let Some(entry) = self.patterns.get(pattern) {
            return entry.clone();
        }

        let compiled = compile_pattern(pattern).map(Arc::new);
        self.patterns
            .insert(pattern.to_string(), compiled.clone());
        compiled
    }
}

/// Build an anchored regex from a mapping pattern, escaping everything but
/// the single optional `*` wildcard.
fn compile_pattern(pattern: &str) -> Option<CompiledPattern> {
    let wildcard_count = pattern.matches('*').count();
    if wildcard_count > 1 {
        warn!(pattern, "path mapping pattern has more than one wildcard; ignoring");
        return None;
    }

    let mut source = String::with_capacity(pattern.len() + 8);
    source.push('^');
    for (i, part) in pattern.split('*').enumerate() {
        if i > 0 {
            source.push_str("(.*)");
        }
        source.push_str(&regex::escape(part));
    }
    source.push('$');

    match Regex::new(&source) {
        Ok(regex) => Some(CompiledPattern {
            regex,
            has_wildcard: wildcard_count == 1,
        }),
        Err(err) => {
            warn!(pattern, %err, "failed to compile path mapping pattern");
            None
        }
    }
}

/// Resolve `specifier` as seen from `importer` to an absolute existing file.
///
/// Priority order: `paths` mappings, then relative specifiers, then absolute
/// paths, then `baseUrl`. Returns `None` when nothing resolves; callers must
/// treat that as "external", never as an error.
pub fn resolve(
    specifier: &str,
    importer: &Path,
    options: &ResolverOptions,
    ctx: &ResolverContext,
) -> Option<PathBuf> {
    trace!(specifier, importer = %importer.display(), "resolve");

    // Step 1: path mappings, in declaration order; first resolvable hit wins.
    if !options.paths.is_empty() {
        if let Some(resolved) = try_path_mappings(specifier, options, ctx) {
            return Some(resolved);
        }
    }

    // Step 2: relative specifiers resolve against the importer's directory.
    if specifier.starts_with("./") || specifier.starts_with("../") || specifier == "." {
        let importer_dir = importer.parent().unwrap_or(Path::new("."));
        return probe(&importer_dir.join(specifier), options);
    }

    // Step 3: absolute specifiers are used directly.
    if Path::new(specifier).is_absolute() {
        return probe(Path::new(specifier), options);
    }

    // Step 4: everything else resolves against baseUrl (default project root).
    probe(&options.effective_base().join(specifier), options)
}

fn try_path_mappings(
    specifier: &str,
    options: &ResolverOptions,
    ctx: &ResolverContext,
) -> Option<PathBuf> {
    for (pattern, targets) in &options.paths {
        let Some(compiled) = ctx.compiled(pattern) else {
            continue;
        };
        let Some(captures) = compiled.regex.captures(specifier) else {
            continue;
        };

        let wildcard = if compiled.has_wildcard {
            captures.get(1).map(|m| m.as_str()).unwrap_or("")
        } else {
            ""
        };

        for target in targets {
            let substituted = target.replace('*', wildcard);
            let candidate = options.effective_base().join(&substituted);
            if let Some(resolved) = probe(&candidate, options) {
                debug!(
                    specifier,
                    pattern,
                    resolved = %resolved.display(),
                    "path mapping hit"
                );
                return Some(resolved);
            }
        }
    }
    None
}

/// Probe a candidate base path: exact file, then each configured extension
/// appended, then `index` + extension inside a matching directory. Hits are
/// canonicalized so every layer keys files by the same path text.
fn probe(candidate: &Path, options: &ResolverOptions) -> Option<PathBuf> {
    if candidate.is_file() {
        return Some(clean(candidate));
    }

    let candidate_str = candidate.to_string_lossy();
    for ext in options.extensions() {
        let with_ext = PathBuf::from(format!("{candidate_str}{ext}"));
        if with_ext.is_file() {
            return Some(clean(&with_ext));
        }
    }

    if candidate.is_dir() {
        for ext in options.extensions() {
            let index = candidate.join(format!("index{ext}"));
            if index.is_file() {
                return Some(clean(&index));
            }
        }
    }

    None
}

fn clean(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

//! Graph Bundling Engine
//!
//! The in-tree [`BundlingEngine`]: a deliberately small bundler that works
//! on the pseudocode modules exposed through [`ModuleHooks`]. It walks the
//! module graph from the entry, orders modules dependencies-first (cycle
//! tolerant), includes only reachable modules, hoists external imports,
//! renames top-level identifier collisions, resolves re-export chains, and
//! emits a single chunk whose exports are the entry's exports.
//!
//! Real engines can be swapped in through the trait; the pipeline only
//! relies on the resolve/load contract and on import/export edges being
//! genuine JS syntax.

use crate::OutputFormat;
use crate::transpiler::statement::{
    RawStatement, StatementKind, classify, export_specifiers, split_statements,
};
use crate::transpiler::tokens::{TokenKind, rename_identifier, tokenize};
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;
use tracing::{debug, trace, warn};

/// Resolution/loading hooks a module source exposes to the engine.
///
/// `resolve_id` may decline (returning `None`) to mark a specifier as
/// external; `load` may decline for ids it does not own.
pub trait ModuleHooks: Sync {
    fn resolve_id(&self, specifier: &str, importer: Option<&str>) -> Option<String>;
    fn load(&self, id: &str) -> Option<String>;
}

/// Errors the engine can produce.
#[derive(Debug)]
pub enum EngineError {
    /// The entry id could not be loaded through the hooks.
    EntryNotLoadable(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::EntryNotLoadable(id) => {
                write!(f, "entry module '{id}' could not be loaded")
            }
        }
    }
}

impl std::error::Error for EngineError {}

/// External bundling engine contract: entry id plus hooks in, one chunk out.
pub trait BundlingEngine: Sync {
    fn bundle(
        &self,
        entry_id: &str,
        hooks: &dyn ModuleHooks,
        format: OutputFormat,
    ) -> Result<String, EngineError>;
}

/// Where an exported name of a module comes from.
#[derive(Debug, Clone)]
enum ExportTarget {
    /// A top-level name in the flattened output (post-rename).
    Local(String),
    /// Re-exported from another module under a possibly different name.
    Reexport { module: String, name: String },
}

/// Parsed import clause of one pseudocode import statement.
#[derive(Debug, Default, Clone)]
struct ImportClause {
    default_local: Option<String>,
    namespace_local: Option<String>,
    /// `(imported, local)` pairs.
    named: Vec<(String, String)>,
}

#[derive(Debug, Default)]
struct ModuleRecord {
    /// Body statements, renames applied, exports/imports removed.
    body: Vec<RawStatement>,
    /// Exported name → target.
    exports: FxHashMap<String, ExportTarget>,
    /// Export order, for stable entry output.
    export_order: Vec<String>,
}

/// The default engine.
#[derive(Debug, Default, Clone, Copy)]
pub struct GraphBundler;

impl GraphBundler {
    pub fn new() -> Self {
        GraphBundler
    }
}

impl BundlingEngine for GraphBundler {
    fn bundle(
        &self,
        entry_id: &str,
        hooks: &dyn ModuleHooks,
        format: OutputFormat,
    ) -> Result<String, EngineError> {
        debug!(entry = entry_id, ?format, "graph bundling");
        let mut sources: FxHashMap<String, String> = FxHashMap::default();
        let mut order: Vec<String> = Vec::new();
        let mut visiting: FxHashSet<String> = FxHashSet::default();

        discover(entry_id, hooks, &mut sources, &mut order, &mut visiting);
        if !sources.contains_key(entry_id) {
            return Err(EngineError::EntryNotLoadable(entry_id.to_string()));
        }

        let mut assembled: FxHashMap<String, ModuleRecord> = FxHashMap::default();
        let mut used_names: FxHashSet<String> = FxHashSet::default();
        let mut externals: Vec<String> = Vec::new();
        let mut seen_externals: FxHashSet<String> = FxHashSet::default();

        for id in &order {
            let record = assemble_module(
                id,
                &sources[id.as_str()],
                hooks,
                &assembled,
                &mut used_names,
                &mut externals,
                &mut seen_externals,
            );
            assembled.insert(id.clone(), record);
        }

        // Emit: externals, bodies in dependency order, entry exports.
        let mut out = String::new();
        for external in &externals {
            out.push_str(external);
            out.push('\n');
        }
        for id in &order {
            for statement in &assembled[id.as_str()].body {
                if let Some(comment) = &statement.leading_comment {
                    out.push_str(comment);
                    out.push('\n');
                }
                out.push_str(&statement.text);
                out.push('\n');
            }
        }

        let entry = &assembled[entry_id];
        let mut export_parts: Vec<String> = Vec::new();
        for exported in &entry.export_order {
            let Some(local) = resolve_export(&assembled, entry_id, exported, &mut FxHashSet::default())
            else {
                warn!(exported, "entry export target not found; dropping");
                continue;
            };
            if local == *exported {
                export_parts.push(local);
            } else {
                export_parts.push(format!("{local} as {exported}"));
            }
        }
        if !export_parts.is_empty() {
            out.push_str(&format!("export {{ {} }};\n", export_parts.join(", ")));
        }

        Ok(out)
    }
}

/// Post-order DFS: dependencies first, entry last, each module once.
fn discover(
    id: &str,
    hooks: &dyn ModuleHooks,
    sources: &mut FxHashMap<String, String>,
    order: &mut Vec<String>,
    visiting: &mut FxHashSet<String>,
) {
    if sources.contains_key(id) || !visiting.insert(id.to_string()) {
        return;
    }
    let Some(content) = hooks.load(id) else {
        visiting.remove(id);
        return;
    };

    for statement in split_statements(&content) {
        let info = classify(&statement.text);
        if !matches!(info.kind, StatementKind::Import | StatementKind::ExportFrom) {
            continue;
        }
        let Some(specifier) = statement_specifier(&statement.text) else {
            continue;
        };
        if let Some(resolved) = hooks.resolve_id(&specifier, Some(id)) {
            discover(&resolved, hooks, sources, order, visiting);
        }
    }

    visiting.remove(id);
    sources.insert(id.to_string(), content);
    order.push(id.to_string());
}

/// The module specifier of an import/export-from statement: its last string
/// literal token.
fn statement_specifier(text: &str) -> Option<String> {
    tokenize(text)
        .into_iter()
        .filter(|t| t.kind == TokenKind::Str)
        .next_back()
        .map(|t| t.text[1..t.text.len() - 1].to_string())
}

/// Parse the binding clause of an import statement.
fn parse_import_clause(text: &str) -> ImportClause {
    let tokens: Vec<_> = tokenize(text).into_iter().filter(|t| !t.is_trivia()).collect();
    let mut clause = ImportClause::default();
    let mut in_braces = false;
    let mut imported: Option<&str> = None;
    let mut local: Option<&str> = None;
    let mut star = false;
    let mut idx = 1usize; // skip `import`

    while idx < tokens.len() {
        let token = tokens[idx];
        match (token.kind, token.text) {
            (TokenKind::Ident, "from") if !in_braces => break,
            (TokenKind::Str, _) => break,
            (TokenKind::Punct, "=") => break, // import x = require(...)
            (TokenKind::Punct, "*") => star = true,
            (TokenKind::Punct, "{") => in_braces = true,
            (TokenKind::Punct, "}") => {
                if let Some(i) = imported.take() {
                    let l = local.take().unwrap_or(i);
                    clause.named.push((i.to_string(), l.to_string()));
                }
                in_braces = false;
            }
            (TokenKind::Punct, ",") => {
                if in_braces {
                    if let Some(i) = imported.take() {
                        let l = local.take().unwrap_or(i);
                        clause.named.push((i.to_string(), l.to_string()));
                    }
                }
            }
            (TokenKind::Ident, "as") => {
                // Next identifier is the local side.
                local = None;
            }
            (TokenKind::Ident, name) => {
                if star {
                    clause.namespace_local = Some(name.to_string());
                } else if in_braces {
                    if imported.is_none() {
                        imported = Some(name);
                        local = Some(name);
                    } else {
                        local = Some(name);
                    }
                } else {
                    clause.default_local = Some(name.to_string());
                }
            }
            _ => {}
        }
        idx += 1;
    }

    clause
}

/// Resolve an exported name of `module_id` to its final top-level name,
/// following re-export chains with a cycle guard.
fn resolve_export(
    assembled: &FxHashMap<String, ModuleRecord>,
    module_id: &str,
    name: &str,
    guard: &mut FxHashSet<(String, String)>,
) -> Option<String> {
    if !guard.insert((module_id.to_string(), name.to_string())) {
        return None;
    }
    match assembled.get(module_id)?.exports.get(name)? {
        ExportTarget::Local(local) => Some(local.clone()),
        ExportTarget::Reexport { module, name } => resolve_export(assembled, module, name, guard),
    }
}

/// Names declared by `var <name> = [...]` statements.
fn declared_var_name(text: &str) -> Option<String> {
    let tokens: Vec<_> = tokenize(text).into_iter().filter(|t| !t.is_trivia()).collect();
    match (tokens.first(), tokens.get(1), tokens.get(2)) {
        (Some(kw), Some(name), Some(eq))
            if kw.kind == TokenKind::Ident
                && matches!(kw.text, "var" | "let" | "const")
                && name.kind == TokenKind::Ident
                && eq.text == "=" =>
        {
            Some(name.text.to_string())
        }
        _ => None,
    }
}

/// Pick a collision-free top-level name, `Name`, `Name$1`, `Name$2`, ...
fn unique_name(base: &str, used: &mut FxHashSet<String>) -> String {
    if used.insert(base.to_string()) {
        return base.to_string();
    }
    let mut counter = 1usize;
    loop {
        let candidate = format!("{base}${counter}");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        counter += 1;
    }
}

#[allow(clippy::too_many_arguments)]
fn assemble_module(
    id: &str,
    source: &str,
    hooks: &dyn ModuleHooks,
    assembled: &FxHashMap<String, ModuleRecord>,
    used_names: &mut FxHashSet<String>,
    externals: &mut Vec<String>,
    seen_externals: &mut FxHashSet<String>,
) -> ModuleRecord {
    let statements = split_statements(source);
    let mut record = ModuleRecord::default();
    let mut renames: Vec<(String, String)> = Vec::new();
    let mut body: Vec<RawStatement> = Vec::new();
    let mut synthesized_ns: Vec<RawStatement> = Vec::new();

    // First pass: imports and exports; collect renames and export map.
    for statement in &statements {
        let info = classify(&statement.text);
        match info.kind {
            StatementKind::Import => {
                let Some(specifier) = statement_specifier(&statement.text) else {
                    continue;
                };
                match hooks.resolve_id(&specifier, Some(id)) {
                    Some(target) => {
                        let clause = parse_import_clause(&statement.text);
                        for (imported, local) in &clause.named {
                            if let Some(final_name) = resolve_export(
                                assembled,
                                &target,
                                imported,
                                &mut FxHashSet::default(),
                            ) {
                                if final_name != *local {
                                    renames.push((local.clone(), final_name));
                                }
                            }
                        }
                        if let Some(local) = &clause.default_local {
                            if let Some(final_name) = resolve_export(
                                assembled,
                                &target,
                                "default",
                                &mut FxHashSet::default(),
                            ) {
                                if final_name != *local {
                                    renames.push((local.clone(), final_name));
                                }
                            }
                        }
                        if let Some(ns_local) = &clause.namespace_local {
                            if let Some(target_record) = assembled.get(&target) {
                                let ns_name = unique_name(ns_local, used_names);
                                if ns_name != *ns_local {
                                    renames.push((ns_local.clone(), ns_name.clone()));
                                }
                                synthesized_ns.push(synthesize_namespace(
                                    &ns_name,
                                    target_record,
                                    assembled,
                                    &target,
                                ));
                            } else {
                                warn!(
                                    specifier,
                                    importer = id,
                                    "namespace import into unassembled module (cycle); skipped"
                                );
                            }
                        }
                    }
                    None => {
                        // External: hoist, dedup by exact text.
                        if seen_externals.insert(statement.text.clone()) {
                            externals.push(statement.text.clone());
                        }
                    }
                }
            }
            StatementKind::ExportFrom => {
                let Some(specifier) = statement_specifier(&statement.text) else {
                    continue;
                };
                match hooks.resolve_id(&specifier, Some(id)) {
                    Some(target) => {
                        let is_star = statement.text.contains('*');
                        if is_star {
                            // Splice the target's exports, except default.
                            if let Some(target_record) = assembled.get(&target) {
                                for exported in &target_record.export_order {
                                    if exported == "default" {
                                        continue;
                                    }
                                    record_export(
                                        &mut record,
                                        exported.clone(),
                                        ExportTarget::Reexport {
                                            module: target.clone(),
                                            name: exported.clone(),
                                        },
                                    );
                                }
                            }
                        } else {
                            for (imported, exported) in export_specifiers(&statement.text) {
                                record_export(
                                    &mut record,
                                    exported,
                                    ExportTarget::Reexport {
                                        module: target.clone(),
                                        name: imported,
                                    },
                                );
                            }
                        }
                    }
                    None => {
                        // External re-export: keep the module edge as an
                        // import and surface the names as local exports.
                        let import_form = reexport_to_import(&statement.text);
                        if seen_externals.insert(import_form.clone()) {
                            externals.push(import_form);
                        }
                        for (imported, exported) in export_specifiers(&statement.text) {
                            record_export(
                                &mut record,
                                exported,
                                ExportTarget::Local(imported),
                            );
                        }
                    }
                }
            }
            StatementKind::ExportNamed => {
                for (local, exported) in export_specifiers(&statement.text) {
                    record_export(&mut record, exported, ExportTarget::Local(local));
                }
            }
            _ => body.push(statement.clone()),
        }
    }

    // Second pass: collision renames for this module's declarations.
    for statement in &body {
        if let Some(name) = declared_var_name(&statement.text) {
            // Names introduced by import renames are not declarations.
            if renames.iter().any(|(_, to)| *to == name) {
                continue;
            }
            let unique = unique_name(&name, used_names);
            if unique != name {
                trace!(module = id, from = %name, to = %unique, "collision rename");
                renames.push((name, unique));
            }
        }
    }

    // Apply renames to body statements and export targets.
    let mut final_body: Vec<RawStatement> = Vec::with_capacity(body.len() + synthesized_ns.len());
    for mut statement in body {
        for (from, to) in &renames {
            statement.text = rename_identifier(&statement.text, from, to);
        }
        final_body.push(statement);
    }
    final_body.extend(synthesized_ns);

    for target in record.exports.values_mut() {
        if let ExportTarget::Local(local) = target {
            if let Some((_, to)) = renames.iter().find(|(from, _)| from.as_str() == local.as_str()) {
                *local = to.clone();
            }
        }
    }

    record.body = final_body;
    record
}

fn record_export(record: &mut ModuleRecord, exported: String, target: ExportTarget) {
    if !record.exports.contains_key(&exported) {
        record.export_order.push(exported.clone());
    }
    record.exports.insert(exported, target);
}

/// Rewrite `export { a, b as c } from 'ext';` into the equivalent import.
fn reexport_to_import(text: &str) -> String {
    let specifier = statement_specifier(text).unwrap_or_default();
    if text.contains('*') {
        // `export * from 'ext'`: keep the namespace edge alive.
        return format!("import * as _reexport from '{specifier}';");
    }
    let parts: Vec<String> = export_specifiers(text)
        .into_iter()
        .map(|(local, _)| local)
        .collect();
    format!("import {{ {} }} from '{specifier}';", parts.join(", "))
}

/// Build the namespace-object call the decoder recognizes:
/// `__ns(name, { exported: () => local, ... });`
fn synthesize_namespace(
    ns_name: &str,
    target_record: &ModuleRecord,
    assembled: &FxHashMap<String, ModuleRecord>,
    target_id: &str,
) -> RawStatement {
    let mut entries: Vec<String> = Vec::new();
    for exported in &target_record.export_order {
        let Some(local) =
            resolve_export(assembled, target_id, exported, &mut FxHashSet::default())
        else {
            continue;
        };
        entries.push(format!("{exported}: () => {local}"));
    }
    RawStatement {
        leading_comment: None,
        text: format!("__ns({ns_name}, {{ {} }});", entries.join(", ")),
        offset: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    /// Hooks over an in-memory map: ids are plain names, specifiers resolve
    /// by stripping a leading `./`.
    struct MapHooks {
        modules: IndexMap<String, String>,
    }

    impl MapHooks {
        fn new(modules: &[(&str, &str)]) -> Self {
            MapHooks {
                modules: modules
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            }
        }
    }

    impl ModuleHooks for MapHooks {
        fn resolve_id(&self, specifier: &str, _importer: Option<&str>) -> Option<String> {
            let key = specifier.trim_start_matches("./");
            self.modules.contains_key(key).then(|| key.to_string())
        }

        fn load(&self, id: &str) -> Option<String> {
            self.modules.get(id).cloned()
        }
    }

    fn bundle(modules: &[(&str, &str)], entry: &str) -> String {
        GraphBundler::new()
            .bundle(entry, &MapHooks::new(modules), OutputFormat::Esm)
            .unwrap()
    }

    #[test]
    fn inlines_dependency_before_dependent() {
        let output = bundle(
            &[
                (
                    "index",
                    "import { User } from './user';\nvar getUserName = [\"declare function getUserName(user: \", User, \"): string;\"];\nexport { getUserName };\n",
                ),
                (
                    "user",
                    "var User = [\"interface \", User, \" { id: number }\"];\nexport { User };\n",
                ),
            ],
            "index",
        );
        let user_pos = output.find("var User").unwrap();
        let fn_pos = output.find("var getUserName").unwrap();
        assert!(user_pos < fn_pos, "dependency body must come first");
        assert!(output.contains("export { getUserName };"));
        // Non-entry exports must not surface.
        assert!(!output.contains("export { User };"));
    }

    #[test]
    fn diamond_includes_shared_module_once() {
        let output = bundle(
            &[
                (
                    "index",
                    "import { L } from './left';\nimport { R } from './right';\nvar Both = [\"type Both = \", L, \" | \", R, \";\"];\nexport { Both };\n",
                ),
                (
                    "left",
                    "import { S } from './shared';\nvar L = [\"type L = \", S, \";\"];\nexport { L };\n",
                ),
                (
                    "right",
                    "import { S } from './shared';\nvar R = [\"type R = \", S, \";\"];\nexport { R };\n",
                ),
                ("shared", "var S = [\"type S = string;\"];\nexport { S };\n"),
            ],
            "index",
        );
        assert_eq!(output.matches("var S = ").count(), 1);
    }

    #[test]
    fn renames_colliding_top_level_names() {
        let output = bundle(
            &[
                (
                    "index",
                    "import { Conflict } from './a';\nimport { Conflict as Conflict2 } from './b';\nvar Use = [\"type Use = \", Conflict, \" | \", Conflict2, \";\"];\nexport { Use };\n",
                ),
                (
                    "a",
                    "var Conflict = [\"interface \", Conflict, \" { a: 1 }\"];\nexport { Conflict };\n",
                ),
                (
                    "b",
                    "var Conflict = [\"interface \", Conflict, \" { b: 2 }\"];\nexport { Conflict };\n",
                ),
            ],
            "index",
        );
        assert!(output.contains("var Conflict = "));
        assert!(output.contains("var Conflict$1 = "));
        // The second import's alias must now point at the renamed decl.
        assert!(output.contains("Conflict$1, \";\"]") || output.contains(", Conflict$1,"));
    }

    #[test]
    fn unreachable_modules_are_excluded() {
        let hooks = MapHooks::new(&[
            ("index", "var A = [\"type A = 1;\"];\nexport { A };\n"),
            ("orphan", "var B = [\"type B = 2;\"];\nexport { B };\n"),
        ]);
        let output = GraphBundler::new()
            .bundle("index", &hooks, OutputFormat::Esm)
            .unwrap();
        assert!(!output.contains("var B"));
    }

    #[test]
    fn external_imports_are_hoisted_and_deduped() {
        let output = bundle(
            &[
                (
                    "index",
                    "import { Readable } from 'stream';\nimport { mid } from './mid';\nvar A = [\"type A = \", Readable, \";\"];\nexport { A };\n",
                ),
                (
                    "mid",
                    "import { Readable } from 'stream';\nvar mid = [\"type mid = \", Readable, \";\"];\nexport { mid };\n",
                ),
            ],
            "index",
        );
        assert_eq!(output.matches("import { Readable } from 'stream';").count(), 1);
        assert!(output.starts_with("import { Readable } from 'stream';"));
    }

    #[test]
    fn reexport_chain_resolves_through_modules() {
        let output = bundle(
            &[
                ("index", "export { User as PublicUser } from './mid';\n"),
                ("mid", "export { User } from './base';\n"),
                (
                    "base",
                    "var User = [\"interface \", User, \" { id: number }\"];\nexport { User };\n",
                ),
            ],
            "index",
        );
        assert!(output.contains("var User = "));
        assert!(output.contains("export { User as PublicUser };"));
    }

    #[test]
    fn star_reexport_splices_all_names() {
        let output = bundle(
            &[
                ("index", "export * from './types';\n"),
                (
                    "types",
                    "var A = [\"type A = 1;\"];\nexport { A };\nvar B = [\"type B = 2;\"];\nexport { B };\n",
                ),
            ],
            "index",
        );
        assert!(output.contains("export { A, B };"));
    }

    #[test]
    fn namespace_import_synthesizes_namespace_call() {
        let output = bundle(
            &[
                (
                    "index",
                    "import * as models from './models';\nvar Use = [\"type Use = typeof \", models, \";\"];\nexport { Use };\n",
                ),
                (
                    "models",
                    "var User = [\"interface \", User, \" { }\"];\nexport { User };\n",
                ),
            ],
            "index",
        );
        assert!(output.contains("__ns(models, { User: () => User });"));
    }

    #[test]
    fn mutual_imports_terminate() {
        let output = bundle(
            &[
                (
                    "a",
                    "import { B } from './b';\nvar A = [\"type A = \", B, \";\"];\nexport { A };\n",
                ),
                (
                    "b",
                    "import { A } from './a';\nvar B = [\"type B = \", A, \";\"];\nexport { B };\n",
                ),
            ],
            "a",
        );
        assert!(output.contains("var A = "));
        assert!(output.contains("var B = "));
        assert!(output.contains("export { A };"));
    }

    #[test]
    fn missing_entry_is_an_error() {
        let hooks = MapHooks::new(&[]);
        let result = GraphBundler::new().bundle("nope", &hooks, OutputFormat::Esm);
        assert!(result.is_err());
    }
}

//! Virtual Module Graph
//!
//! Exposes the in-memory DeclarationMap to the bundling engine through the
//! resolve/load hooks, so no temporary files are needed. Virtual ids are
//! declaration paths behind a sentinel prefix no real path starts with.
//!
//! `resolve_id` resolves a specifier exactly like the module resolver does
//! for source files, maps the hit to its declaration path, and answers a
//! virtual id only when that path is present in the map. Anything else is
//! declined so the host's default resolution (e.g. genuinely external
//! packages) applies. `load` serves content for owned ids and records the
//! declaration path as used for later reporting.

use crate::dts_path::declaration_path;
use crate::engine::ModuleHooks;
use crate::module_resolver::{ResolverContext, ResolverOptions, resolve};
use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::trace;

/// Declaration path → encoded pseudocode content. Built once per entry
/// build, read-only afterwards.
pub type DeclarationMap = IndexMap<PathBuf, String>;

/// Sentinel prefix marking ids owned by the virtual graph. The NUL byte
/// cannot appear in real paths.
pub const VIRTUAL_PREFIX: &str = "\0dts:";

/// Wrap a declaration path in its virtual id.
pub fn virtual_id(declaration: &Path) -> String {
    format!("{VIRTUAL_PREFIX}{}", declaration.display())
}

/// Strip the sentinel, if present.
pub fn from_virtual_id(id: &str) -> Option<PathBuf> {
    id.strip_prefix(VIRTUAL_PREFIX).map(PathBuf::from)
}

/// The read-only module source handed to the bundling engine for one pass.
pub struct VirtualModuleGraph<'a> {
    declarations: &'a DeclarationMap,
    options: &'a ResolverOptions,
    ctx: &'a ResolverContext,
    used: Mutex<FxHashSet<PathBuf>>,
}

impl<'a> VirtualModuleGraph<'a> {
    pub fn new(
        declarations: &'a DeclarationMap,
        options: &'a ResolverOptions,
        ctx: &'a ResolverContext,
    ) -> Self {
        VirtualModuleGraph {
            declarations,
            options,
            ctx,
            used: Mutex::new(FxHashSet::default()),
        }
    }

    /// Declaration paths the engine actually loaded during the pass.
    pub fn used_paths(&self) -> Vec<PathBuf> {
        let used = self.used.lock().expect("virtual graph lock poisoned");
        self.declarations
            .keys()
            .filter(|path| used.contains(*path))
            .cloned()
            .collect()
    }

    /// Declaration paths the engine never asked for (tree-shaken away).
    pub fn unused_paths(&self) -> Vec<PathBuf> {
        let used = self.used.lock().expect("virtual graph lock poisoned");
        self.declarations
            .keys()
            .filter(|path| !used.contains(*path))
            .cloned()
            .collect()
    }
}

impl ModuleHooks for VirtualModuleGraph<'_> {
    fn resolve_id(&self, specifier: &str, importer: Option<&str>) -> Option<String> {
        // Only resolve on behalf of our own modules.
        let importer_declaration = importer.and_then(from_virtual_id)?;

        // Resolution happens in source-path space: the declaration lives
        // next to its source, so the declaration path works as importer.
        let resolved = resolve(specifier, &importer_declaration, self.options, self.ctx)?;
        let declaration = declaration_path(&resolved);

        if self.declarations.contains_key(&declaration) {
            trace!(
                specifier,
                declaration = %declaration.display(),
                "virtual resolve"
            );
            Some(virtual_id(&declaration))
        } else {
            None
        }
    }

    fn load(&self, id: &str) -> Option<String> {
        let declaration = from_virtual_id(id)?;
        let content = self.declarations.get(&declaration)?;
        self.used
            .lock()
            .expect("virtual graph lock poisoned")
            .insert(declaration);
        Some(content.clone())
    }
}

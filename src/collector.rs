//! Dependency Collection
//!
//! Walks the import graph of one entry file to discover the transitive
//! closure of local source files that need declarations generated. The
//! traversal is an iterative depth-first walk with an explicit work stack
//! and a visited set keyed by absolute path: no recursion, no revisits,
//! cycle-safe by construction.
//!
//! Specifiers the resolver cannot place are silently treated as external.
//! Unreadable files are logged and skipped, never fatal.

use crate::import_scan::ImportExtractor;
use crate::module_resolver::{ResolverContext, ResolverOptions, resolve};
use rustc_hash::FxHashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Collects the local file set reachable from an entry.
pub struct DependencyCollector<'a> {
    options: &'a ResolverOptions,
    ctx: &'a ResolverContext,
    extractor: &'a dyn ImportExtractor,
}

impl<'a> DependencyCollector<'a> {
    pub fn new(
        options: &'a ResolverOptions,
        ctx: &'a ResolverContext,
        extractor: &'a dyn ImportExtractor,
    ) -> Self {
        DependencyCollector {
            options,
            ctx,
            extractor,
        }
    }

    /// Collect the entry file plus every local file it transitively imports,
    /// in visit order (entry first).
    pub fn collect(&self, entry: &Path) -> Vec<PathBuf> {
        let mut visited: FxHashSet<PathBuf> = FxHashSet::default();
        let mut collected: Vec<PathBuf> = Vec::new();
        let entry = entry
            .canonicalize()
            .unwrap_or_else(|_| entry.to_path_buf());
        let mut stack: Vec<PathBuf> = vec![entry.clone()];

        while let Some(path) = stack.pop() {
            if !visited.insert(path.clone()) {
                continue;
            }

            let source = match std::fs::read_to_string(&path) {
                Ok(source) => source,
                Err(err) => {
                    warn!(path = %path.display(), %err, "skipping unreadable file");
                    continue;
                }
            };

            collected.push(path.clone());

            // Push in reverse so the first import in the file is visited
            // first (stack order).
            let imports = self.extractor.extract(&source);
            for import in imports.iter().rev() {
                match resolve(&import.specifier, &path, self.options, self.ctx) {
                    Some(resolved) => {
                        if !visited.contains(&resolved) {
                            stack.push(resolved);
                        }
                    }
                    None => {
                        debug!(
                            specifier = %import.specifier,
                            importer = %path.display(),
                            "unresolved specifier treated as external"
                        );
                    }
                }
            }
        }

        debug!(
            entry = %entry.display(),
            files = collected.len(),
            "dependency collection finished"
        );
        collected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import_scan::RegexImportScanner;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path.canonicalize().unwrap()
    }

    fn collect(root: &Path, entry: &Path) -> Vec<PathBuf> {
        let options = ResolverOptions::new(root);
        let ctx = ResolverContext::new();
        let scanner = RegexImportScanner::new();
        DependencyCollector::new(&options, &ctx, &scanner).collect(entry)
    }

    #[test]
    fn collects_transitive_closure_entry_first() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let entry = write(root, "src/index.ts", "import { a } from './a';\n");
        let a = write(root, "src/a.ts", "import { b } from './b';\nexport const a = 1;\n");
        let b = write(root, "src/b.ts", "export const b = 2;\n");

        let files = collect(root, &entry);
        assert_eq!(files, vec![entry, a, b]);
    }

    #[test]
    fn mutual_imports_collected_exactly_once() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let a = write(
            root,
            "src/a.ts",
            "import { b } from './b';\nexport const a = 1;\n",
        );
        let b = write(
            root,
            "src/b.ts",
            "import { a } from './a';\nexport const b = 2;\n",
        );

        let files = collect(root, &a);
        assert_eq!(files.len(), 2, "cycle must terminate with both files once");
        assert!(files.contains(&a));
        assert!(files.contains(&b));
    }

    #[test]
    fn unresolved_package_import_is_excluded() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let entry = write(
            root,
            "src/index.ts",
            "import path from 'some-package-not-on-disk';\nexport const x: number = 1;\n",
        );

        let files = collect(root, &entry);
        assert_eq!(files, vec![entry]);
    }

    #[test]
    fn missing_file_is_skipped_not_fatal() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let missing = root.join("src/nope.ts");

        let files = collect(root, &missing);
        assert!(files.is_empty());
    }

    #[test]
    fn diamond_graph_visits_shared_dependency_once() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let entry = write(
            root,
            "src/index.ts",
            "import { l } from './left';\nimport { r } from './right';\n",
        );
        write(root, "src/left.ts", "import { s } from './shared';\nexport const l = 1;\n");
        write(root, "src/right.ts", "import { s } from './shared';\nexport const r = 1;\n");
        write(root, "src/shared.ts", "export const s = 1;\n");

        let files = collect(root, &entry);
        assert_eq!(files.len(), 4);
        let shared = root.join("src/shared.ts");
        assert_eq!(files.iter().filter(|f| **f == shared).count(), 1);
    }
}

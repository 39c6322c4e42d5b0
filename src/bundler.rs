//! Declaration Bundler
//!
//! Orchestrates one entry point's declaration build: validate the entry,
//! collect its local import graph, emit per-file declarations in parallel,
//! encode them into the DeclarationMap, expose the map to the bundling
//! engine through the virtual module graph, run the engine once per output
//! format (in parallel; the graph is read-only by then), and decode each
//! chunk back into declaration text.
//!
//! Failure policy: entry validation problems and engine failures are fatal
//! for the affected entry only; per-file problems become diagnostics or
//! logged warnings and the build keeps going.

use crate::OutputFormat;
use crate::collector::DependencyCollector;
use crate::diagnostics::{Diagnostic, DiagnosticBag, Span};
use crate::dts_path::{SourceExtension, declaration_path};
use crate::engine::{BundlingEngine, EngineError};
use crate::entry::Entry;
use crate::import_scan::ImportExtractor;
use crate::module_resolver::{ResolverContext, ResolverOptions};
use crate::thin_emitter::IsolatedDeclarationEmitter;
use crate::transpiler::{dts_to_pseudocode, pseudocode_to_dts};
use crate::virtual_graph::{DeclarationMap, VirtualModuleGraph, virtual_id};
use rayon::prelude::*;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// One bundled declaration text, per (entry, format).
#[derive(Debug, Clone)]
pub struct BundledOutput {
    pub entry_name: String,
    pub format: OutputFormat,
    pub text: String,
}

/// Everything one entry's build produced.
#[derive(Debug)]
pub struct EntryBundle {
    pub entry: Entry,
    pub outputs: Vec<BundledOutput>,
    pub diagnostics: DiagnosticBag,
    /// Source files that contributed declarations, in collection order.
    pub files: Vec<PathBuf>,
}

/// Fatal errors for one entry's build.
#[derive(Debug)]
pub enum BuildError {
    /// The entry file does not exist.
    EntryNotFound { entry: String, path: PathBuf },
    /// The entry resolves outside the project root.
    EntryOutsideRoot { entry: String, path: PathBuf },
    /// The entry has no supported source extension.
    UnsupportedEntry { entry: String, path: PathBuf },
    /// Nothing could be emitted for the entry file itself.
    EmptyEmission { entry: String },
    /// Error-severity emitter diagnostics under the strictness flag.
    StrictDiagnostics {
        entry: String,
        diagnostics: Vec<Diagnostic>,
    },
    /// The bundling engine failed.
    Bundling {
        entry: String,
        format: OutputFormat,
        source: EngineError,
    },
    /// The engine produced empty output for a non-empty input.
    EmptyBundle { entry: String, format: OutputFormat },
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::EntryNotFound { entry, path } => {
                write!(f, "entry '{entry}': file not found: {}", path.display())
            }
            BuildError::EntryOutsideRoot { entry, path } => write!(
                f,
                "entry '{entry}': {} is outside the project root",
                path.display()
            ),
            BuildError::UnsupportedEntry { entry, path } => write!(
                f,
                "entry '{entry}': {} is not a supported source file",
                path.display()
            ),
            BuildError::EmptyEmission { entry } => {
                write!(f, "entry '{entry}': no declaration could be emitted")
            }
            BuildError::StrictDiagnostics { entry, diagnostics } => write!(
                f,
                "entry '{entry}': {} error-severity declaration diagnostic(s)",
                diagnostics.len()
            ),
            BuildError::Bundling {
                entry,
                format,
                source,
            } => write!(f, "entry '{entry}' ({format}): bundling failed: {source}"),
            BuildError::EmptyBundle { entry, format } => write!(
                f,
                "entry '{entry}' ({format}): bundler produced empty output for non-empty input"
            ),
        }
    }
}

impl std::error::Error for BuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BuildError::Bundling { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Per-entry build knobs.
#[derive(Debug, Clone)]
pub struct BundleOptions {
    pub resolver: ResolverOptions,
    pub formats: Vec<OutputFormat>,
    /// Escalate Error-severity emitter diagnostics to a build failure.
    pub strict: bool,
}

/// The orchestrator. Collaborators come in through their boundary traits.
pub struct DtsBundler<'a> {
    emitter: &'a dyn IsolatedDeclarationEmitter,
    engine: &'a dyn BundlingEngine,
    extractor: &'a dyn ImportExtractor,
}

impl<'a> DtsBundler<'a> {
    pub fn new(
        emitter: &'a dyn IsolatedDeclarationEmitter,
        engine: &'a dyn BundlingEngine,
        extractor: &'a dyn ImportExtractor,
    ) -> Self {
        DtsBundler {
            emitter,
            engine,
            extractor,
        }
    }

    /// Run the full pass for one entry across the requested formats.
    pub fn bundle_entry(
        &self,
        entry: &Entry,
        options: &BundleOptions,
        ctx: &ResolverContext,
    ) -> Result<EntryBundle, BuildError> {
        let entry_path = self.validate_entry(entry, &options.resolver)?;

        let collector = DependencyCollector::new(&options.resolver, ctx, self.extractor);
        let files = collector.collect(&entry_path);
        debug!(entry = %entry.name, files = files.len(), "collected local file set");

        // Per-file emission is independent and file-local; fan out, then
        // join before the virtual graph is built.
        let emitted: Vec<(PathBuf, Option<String>, Vec<Diagnostic>)> = files
            .par_iter()
            .map(|path| {
                let source = match std::fs::read_to_string(path) {
                    Ok(source) => source,
                    Err(err) => {
                        warn!(path = %path.display(), %err, "file vanished during emission");
                        let diagnostic = Diagnostic::warning(
                            path.display().to_string(),
                            Span::at(0),
                            format!("could not read file during declaration emission: {err}"),
                        );
                        return (path.clone(), None, vec![diagnostic]);
                    }
                };
                let output = self.emitter.emit(path, &source);
                let encoded = if output.text.trim().is_empty() {
                    None
                } else {
                    Some(dts_to_pseudocode(&output.text))
                };
                (path.clone(), encoded, output.diagnostics)
            })
            .collect();

        let mut diagnostics = DiagnosticBag::new();
        let mut declarations = DeclarationMap::new();
        for (path, encoded, file_diagnostics) in emitted {
            diagnostics.extend_from(file_diagnostics);
            if let Some(encoded) = encoded {
                declarations.insert(declaration_path(&path), encoded);
            }
        }

        if options.strict && diagnostics.has_errors() {
            return Err(BuildError::StrictDiagnostics {
                entry: entry.name.clone(),
                diagnostics: diagnostics.into_vec(),
            });
        }

        let entry_declaration = declaration_path(&entry_path);
        if !declarations.contains_key(&entry_declaration) {
            return Err(BuildError::EmptyEmission {
                entry: entry.name.clone(),
            });
        }
        let entry_has_content = !declarations[&entry_declaration].trim().is_empty();

        let graph = VirtualModuleGraph::new(&declarations, &options.resolver, ctx);
        let entry_id = virtual_id(&entry_declaration);

        // The graph is read-only from here on; formats bundle in parallel.
        let outputs: Vec<Result<BundledOutput, BuildError>> = options
            .formats
            .par_iter()
            .map(|&format| {
                let chunk = self
                    .engine
                    .bundle(&entry_id, &graph, format)
                    .map_err(|source| BuildError::Bundling {
                        entry: entry.name.clone(),
                        format,
                        source,
                    })?;
                if chunk.trim().is_empty() && entry_has_content {
                    return Err(BuildError::EmptyBundle {
                        entry: entry.name.clone(),
                        format,
                    });
                }
                Ok(BundledOutput {
                    entry_name: entry.name.clone(),
                    format,
                    text: pseudocode_to_dts(&chunk),
                })
            })
            .collect();

        let outputs = outputs.into_iter().collect::<Result<Vec<_>, _>>()?;

        for unused in graph.unused_paths() {
            debug!(path = %unused.display(), "declaration tree-shaken away");
        }
        info!(
            entry = %entry.name,
            formats = outputs.len(),
            files = files.len(),
            "declaration bundle finished"
        );

        Ok(EntryBundle {
            entry: entry.clone(),
            outputs,
            diagnostics,
            files,
        })
    }

    /// Entry validation: must exist, sit inside the project root, and carry
    /// a supported source extension. All three are configuration errors,
    /// fatal for this entry.
    fn validate_entry(
        &self,
        entry: &Entry,
        resolver: &ResolverOptions,
    ) -> Result<PathBuf, BuildError> {
        let raw = PathBuf::from(&entry.path);
        let joined = if raw.is_absolute() {
            raw
        } else {
            resolver.project_root.join(&raw)
        };

        let Ok(entry_path) = joined.canonicalize() else {
            return Err(BuildError::EntryNotFound {
                entry: entry.name.clone(),
                path: joined,
            });
        };

        let root = resolver
            .project_root
            .canonicalize()
            .unwrap_or_else(|_| resolver.project_root.clone());
        if !entry_path.starts_with(&root) {
            return Err(BuildError::EntryOutsideRoot {
                entry: entry.name.clone(),
                path: entry_path,
            });
        }

        if !SourceExtension::from_path(&entry_path).is_supported_entry() {
            return Err(BuildError::UnsupportedEntry {
                entry: entry.name.clone(),
                path: entry_path,
            });
        }

        Ok(entry_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::GraphBundler;
    use crate::import_scan::RegexImportScanner;
    use crate::thin_emitter::ThinDeclarationEmitter;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path.canonicalize().unwrap()
    }

    fn options(root: &Path, formats: Vec<OutputFormat>) -> BundleOptions {
        BundleOptions {
            resolver: ResolverOptions::new(root),
            formats,
            strict: false,
        }
    }

    fn bundle(root: &Path, entry_rel: &str, opts: &BundleOptions) -> Result<EntryBundle, BuildError> {
        let emitter = ThinDeclarationEmitter::new();
        let engine = GraphBundler::new();
        let extractor = RegexImportScanner::new();
        let bundler = DtsBundler::new(&emitter, &engine, &extractor);
        let ctx = ResolverContext::new();
        let entry = Entry {
            name: "index".to_string(),
            path: entry_rel.to_string(),
        };
        bundler.bundle_entry(&entry, opts, &ctx)
    }

    #[test]
    fn missing_entry_is_a_config_error() {
        let dir = TempDir::new().unwrap();
        let result = bundle(dir.path(), "src/missing.ts", &options(dir.path(), vec![OutputFormat::Esm]));
        assert!(matches!(result, Err(BuildError::EntryNotFound { .. })));
    }

    #[test]
    fn entry_outside_root_is_rejected() {
        let dir = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        let file = write(outside.path(), "index.ts", "export const x: number = 1;\n");
        let result = bundle(
            dir.path(),
            file.to_str().unwrap(),
            &options(dir.path(), vec![OutputFormat::Esm]),
        );
        assert!(matches!(result, Err(BuildError::EntryOutsideRoot { .. })));
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "src/styles.css", "body {}\n");
        let result = bundle(
            dir.path(),
            "src/styles.css",
            &options(dir.path(), vec![OutputFormat::Esm]),
        );
        assert!(matches!(result, Err(BuildError::UnsupportedEntry { .. })));
    }

    #[test]
    fn strict_flag_escalates_error_diagnostics() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "src/index.ts",
            "export const client = createClient();\n",
        );
        let mut opts = options(dir.path(), vec![OutputFormat::Esm]);
        opts.strict = true;
        let result = bundle(dir.path(), "src/index.ts", &opts);
        assert!(matches!(result, Err(BuildError::StrictDiagnostics { .. })));
    }

    #[test]
    fn non_strict_build_surfaces_diagnostics_and_succeeds() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "src/index.ts",
            "export const client = createClient();\nexport const VERSION: string = \"1\";\n",
        );
        let bundle = bundle(
            dir.path(),
            "src/index.ts",
            &options(dir.path(), vec![OutputFormat::Esm]),
        )
        .unwrap();
        assert_eq!(bundle.diagnostics.error_count(), 1);
        assert!(bundle.outputs[0].text.contains("declare const VERSION: string;"));
    }

    #[test]
    fn multiple_formats_share_one_collection_pass() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "src/index.ts", "export const FLAG: boolean = true;\n");
        let bundle = bundle(
            dir.path(),
            "src/index.ts",
            &options(dir.path(), vec![OutputFormat::Esm, OutputFormat::Cjs]),
        )
        .unwrap();
        assert_eq!(bundle.outputs.len(), 2);
        let texts: Vec<&str> = bundle.outputs.iter().map(|o| o.text.as_str()).collect();
        assert_eq!(texts[0], texts[1], "declaration text is format-independent");
    }
}

//! dtspack: declaration bundling for TypeScript libraries.
//!
//! Turns a graph of per-file type declarations into a single, resolved,
//! de-duplicated declaration bundle per entry point and output format. The
//! pipeline performs its own module resolution (tsconfig path mapping,
//! node-style probing, virtual files) and bridges an isolated declaration
//! emitter and a JS-grammar-only bundling engine through a lossless
//! declaration ↔ pseudocode encoding:
//!
//! 1. [`entry`] normalizes the configured entries into collision-free
//!    (name, path) pairs.
//! 2. [`collector`] walks each entry's import graph with [`import_scan`]
//!    and [`module_resolver`].
//! 3. [`thin_emitter`] derives per-file declaration text, independently and
//!    in parallel.
//! 4. [`transpiler`] encodes declarations into JS-shaped pseudocode whose
//!    import/export edges are genuine.
//! 5. [`virtual_graph`] serves the encoded modules from memory to the
//!    bundling [`engine`].
//! 6. [`transpiler`] decodes the engine's chunk back into declaration text;
//!    [`bundler`] orchestrates the whole pass per entry and format.
//!
//! The emitter and the engine are boundary traits with in-tree reference
//! implementations; hosts with a native toolchain plug their own in.

pub mod bundler;
pub mod cli;
pub mod collector;
pub mod diagnostics;
pub mod dts_path;
pub mod engine;
pub mod entry;
pub mod import_scan;
pub mod module_resolver;
pub mod thin_emitter;
pub mod tracing_config;
pub mod transpiler;
pub mod virtual_graph;
pub mod worker;

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Output format token handed to the bundling engine. Declaration text is
/// format-independent; the format decides the emitted file extension.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Esm,
    Cjs,
    Iife,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Esm => "esm",
            OutputFormat::Cjs => "cjs",
            OutputFormat::Iife => "iife",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub use bundler::{BuildError, BundleOptions, BundledOutput, DtsBundler, EntryBundle};
pub use collector::DependencyCollector;
pub use diagnostics::{Diagnostic, DiagnosticBag, DiagnosticSeverity, Span};
pub use engine::{BundlingEngine, EngineError, GraphBundler, ModuleHooks};
pub use entry::{CollisionStrategy, Entry, EntryInput, normalize_entries};
pub use import_scan::{ImportExtractor, RegexImportScanner};
pub use module_resolver::{ResolverContext, ResolverOptions, resolve};
pub use thin_emitter::{EmitOutput, IsolatedDeclarationEmitter, ThinDeclarationEmitter};
pub use transpiler::{dts_to_pseudocode, pseudocode_to_dts};
pub use virtual_graph::{DeclarationMap, VirtualModuleGraph};
pub use worker::{JobDescriptor, JobOutcome, run_job, spawn_job};

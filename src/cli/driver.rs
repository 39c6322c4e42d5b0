//! Build Driver
//!
//! Wires configuration, entry normalization, the worker job boundary, and
//! output writing into one build run. A fatal error in one entry terminates
//! only that entry; the run fails at the end if any entry failed.

use crate::cli::args::CliArgs;
use crate::cli::config::{BuildConfig, load_build_config, load_tsconfig, resolver_options};
use crate::cli::reporter::Reporter;
use crate::dts_path::format_declaration_extension;
use crate::entry::{CollisionStrategy, EntryInput, normalize_entries};
use crate::worker::{EntryOutcome, JobDescriptor, spawn_job};
use crate::OutputFormat;
use anyhow::{Context, Result, bail};
use std::path::PathBuf;
use tracing::{debug, info};

/// Outcome of one driver run, for hosts embedding the driver.
#[derive(Debug, Default)]
pub struct BuildSummary {
    /// Files written, in entry order.
    pub written: Vec<PathBuf>,
    /// Names of entries whose build failed.
    pub failed_entries: Vec<String>,
    pub error_count: usize,
    pub warning_count: usize,
}

/// Run a full build from CLI arguments.
pub fn run(args: &CliArgs) -> Result<BuildSummary> {
    let project_root = args
        .project
        .canonicalize()
        .with_context(|| format!("project root not found: {}", args.project.display()))?;

    // Build config: explicit path, else dtspack.json when present.
    let config = match &args.config {
        Some(path) => load_build_config(path)?,
        None => {
            let default_path = project_root.join("dtspack.json");
            if default_path.is_file() {
                load_build_config(&default_path)?
            } else {
                BuildConfig::default()
            }
        }
    };

    if let Some(dts) = &config.dts {
        if !dts.is_enabled() {
            info!("declaration bundling disabled by config");
            return Ok(BuildSummary::default());
        }
    }

    // Entry input: CLI wins, then dts-specific entries, then build entries.
    let entry_input = if !args.entries.is_empty() {
        EntryInput::List(args.entries.clone())
    } else if let Some(input) = config.dts.as_ref().and_then(|d| d.entry()).cloned() {
        input
    } else if let Some(input) = config.entry.clone() {
        input
    } else {
        bail!("no entries given; pass entry files or configure `entry` in dtspack.json");
    };

    let formats: Vec<OutputFormat> = if !args.format.is_empty() {
        args.format.clone()
    } else {
        config.format.clone().unwrap_or_else(|| vec![OutputFormat::Esm])
    };
    let out_dir = args
        .out_dir
        .clone()
        .or_else(|| config.out_dir.clone())
        .unwrap_or_else(|| PathBuf::from("dist"));
    let out_dir = if out_dir.is_absolute() {
        out_dir
    } else {
        project_root.join(out_dir)
    };
    let collision = args
        .collision_suffix
        .or(config.collision_suffix)
        .unwrap_or(CollisionStrategy::Indexed);

    // Compiler options: explicit tsconfig, else tsconfig.json when present.
    let tsconfig_path = args
        .tsconfig
        .clone()
        .or_else(|| config.tsconfig.as_ref().map(|p| project_root.join(p)))
        .or_else(|| {
            let default = project_root.join("tsconfig.json");
            default.is_file().then_some(default)
        });
    let mut resolver = match &tsconfig_path {
        Some(path) => {
            let compiler = load_tsconfig(path)?;
            resolver_options(&compiler, &project_root, path.parent())
        }
        None => resolver_options(&Default::default(), &project_root, None),
    };
    if let Some(dts) = &config.dts {
        if !dts.resolve() {
            // Leave non-relative imports external.
            resolver.paths.clear();
            resolver.base_url = None;
        }
    }

    let entries = normalize_entries(&entry_input, &project_root, collision);
    if entries.is_empty() {
        bail!("entry input matched no files");
    }
    debug!(entries = entries.len(), ?formats, "dispatching build job");

    let descriptor = JobDescriptor {
        entries,
        formats,
        resolver,
        strict: args.strict_dts,
    };
    let outcome = spawn_job(descriptor).join();

    let mut summary = BuildSummary::default();
    let mut reporter = Reporter::new(!args.no_color);
    let mut all_diagnostics = Vec::new();

    for result in &outcome.results {
        match result {
            EntryOutcome::Success {
                entry,
                outputs,
                diagnostics,
                files,
            } => {
                all_diagnostics.extend(diagnostics.iter().cloned());
                std::fs::create_dir_all(&out_dir)
                    .with_context(|| format!("failed to create {}", out_dir.display()))?;
                for output in outputs {
                    let file_name =
                        format!("{}{}", entry.name, format_declaration_extension(output.format));
                    let path = out_dir.join(file_name);
                    std::fs::write(&path, &output.text)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    info!(path = %path.display(), "wrote declaration bundle");
                    summary.written.push(path);
                }
                debug!(entry = %entry.name, files = files.len(), "entry finished");
            }
            EntryOutcome::Failure { entry, message } => {
                eprintln!("{message}");
                summary.failed_entries.push(entry.name.clone());
            }
        }
    }

    summary.error_count = all_diagnostics
        .iter()
        .filter(|d| d.severity.is_error())
        .count();
    summary.warning_count = all_diagnostics
        .iter()
        .filter(|d| d.severity.is_warning())
        .count();

    if !all_diagnostics.is_empty() {
        eprintln!("{}", reporter.render(&all_diagnostics));
        if let Some(line) = reporter.summary(summary.error_count, summary.warning_count) {
            eprintln!("{line}");
        }
    }

    if !summary.failed_entries.is_empty() {
        bail!(
            "{} of {} entries failed: {}",
            summary.failed_entries.len(),
            outcome.results.len(),
            summary.failed_entries.join(", ")
        );
    }

    Ok(summary)
}

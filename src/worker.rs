//! Build Job Boundary
//!
//! A whole declaration pass modeled as message passing: the orchestration
//! host sends an immutable [`JobDescriptor`] (entries, formats, options) to
//! a worker, the worker answers with a [`JobOutcome`] (per-entry results,
//! files touched). No shared mutable memory crosses the boundary; the
//! descriptors are serde types so a host can just as well ship them across
//! a process boundary.

use crate::OutputFormat;
use crate::bundler::{BundleOptions, DtsBundler};
use crate::diagnostics::Diagnostic;
use crate::engine::GraphBundler;
use crate::entry::Entry;
use crate::import_scan::RegexImportScanner;
use crate::module_resolver::{ResolverContext, ResolverOptions};
use crate::thin_emitter::ThinDeclarationEmitter;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use tracing::debug;

/// Everything a worker needs to run one build. Owned and immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub entries: Vec<Entry>,
    pub formats: Vec<OutputFormat>,
    pub resolver: ResolverOptions,
    pub strict: bool,
}

/// One format's bundled text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOutput {
    pub format: OutputFormat,
    pub text: String,
}

/// Result for one entry: either its outputs or a failure message. A failed
/// entry never sinks the rest of the job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum EntryOutcome {
    Success {
        entry: Entry,
        outputs: Vec<JobOutput>,
        diagnostics: Vec<Diagnostic>,
        files: Vec<PathBuf>,
    },
    Failure {
        entry: Entry,
        message: String,
    },
}

impl EntryOutcome {
    pub fn entry(&self) -> &Entry {
        match self {
            EntryOutcome::Success { entry, .. } | EntryOutcome::Failure { entry, .. } => entry,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, EntryOutcome::Failure { .. })
    }
}

/// The worker's answer: one outcome per entry, descriptor order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOutcome {
    pub results: Vec<EntryOutcome>,
}

impl JobOutcome {
    pub fn failure_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_failure()).count()
    }
}

/// Run a job to completion on the calling thread. Entries are independent
/// and run in parallel; each gets its own verdict.
pub fn run_job(descriptor: &JobDescriptor) -> JobOutcome {
    let emitter = ThinDeclarationEmitter::new();
    let engine = GraphBundler::new();
    let extractor = RegexImportScanner::new();
    let bundler = DtsBundler::new(&emitter, &engine, &extractor);
    let ctx = ResolverContext::new();

    let options = BundleOptions {
        resolver: descriptor.resolver.clone(),
        formats: descriptor.formats.clone(),
        strict: descriptor.strict,
    };

    let results: Vec<EntryOutcome> = descriptor
        .entries
        .par_iter()
        .map(|entry| match bundler.bundle_entry(entry, &options, &ctx) {
            Ok(bundle) => EntryOutcome::Success {
                entry: bundle.entry,
                outputs: bundle
                    .outputs
                    .into_iter()
                    .map(|o| JobOutput {
                        format: o.format,
                        text: o.text,
                    })
                    .collect(),
                diagnostics: bundle.diagnostics.into_vec(),
                files: bundle.files,
            },
            Err(err) => EntryOutcome::Failure {
                entry: entry.clone(),
                message: err.to_string(),
            },
        })
        .collect();

    debug!(
        entries = results.len(),
        failures = results.iter().filter(|r| r.is_failure()).count(),
        "job finished"
    );
    JobOutcome { results }
}

/// Handle to a job running on its own thread.
pub struct JobHandle {
    receiver: mpsc::Receiver<JobOutcome>,
}

impl JobHandle {
    /// Block until the worker answers.
    pub fn join(self) -> JobOutcome {
        self.receiver
            .recv()
            .unwrap_or(JobOutcome { results: Vec::new() })
    }
}

/// Ship a descriptor to a worker thread; the outcome comes back over a
/// channel.
pub fn spawn_job(descriptor: JobDescriptor) -> JobHandle {
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        let outcome = run_job(&descriptor);
        // A dropped receiver just means nobody wants the answer anymore.
        let _ = sender.send(outcome);
    });
    JobHandle { receiver }
}

//! Diagnostic Reporting
//!
//! Renders aggregated diagnostics grouped per file, with line/column
//! positions derived from the original source offsets.

use crate::diagnostics::{Diagnostic, DiagnosticSeverity};
use colored::Colorize;
use std::collections::HashMap;

pub struct Reporter {
    color: bool,
    sources: HashMap<String, Option<String>>,
}

impl Reporter {
    pub fn new(color: bool) -> Self {
        Reporter {
            color,
            sources: HashMap::new(),
        }
    }

    /// Render all diagnostics, grouped per file in first-seen order.
    pub fn render(&mut self, diagnostics: &[Diagnostic]) -> String {
        let mut file_order: Vec<&str> = Vec::new();
        let mut by_file: HashMap<&str, Vec<&Diagnostic>> = HashMap::new();
        for diagnostic in diagnostics {
            let entry = by_file.entry(diagnostic.file.as_str()).or_default();
            if entry.is_empty() {
                file_order.push(&diagnostic.file);
            }
            entry.push(diagnostic);
        }

        let mut out = String::new();
        for file in file_order {
            for diagnostic in &by_file[file] {
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(&self.format_diagnostic(diagnostic));
            }
        }
        out
    }

    pub fn format_diagnostic(&mut self, diagnostic: &Diagnostic) -> String {
        let location = self
            .position_for(&diagnostic.file, diagnostic.span.start)
            .map(|(line, column)| format!("{}:{line}:{column}", diagnostic.file))
            .unwrap_or_else(|| diagnostic.file.clone());

        format!(
            "{location} - {}: {}",
            self.format_severity(diagnostic.severity),
            diagnostic.message
        )
    }

    /// Print a summary line when anything was reported.
    pub fn summary(&self, errors: usize, warnings: usize) -> Option<String> {
        if errors == 0 && warnings == 0 {
            return None;
        }
        let text = format!("{errors} error(s), {warnings} warning(s)");
        Some(if self.color && errors > 0 {
            text.red().to_string()
        } else if self.color {
            text.yellow().to_string()
        } else {
            text
        })
    }

    fn format_severity(&self, severity: DiagnosticSeverity) -> String {
        let label = severity.name();
        if !self.color {
            return label.to_string();
        }
        match severity {
            DiagnosticSeverity::Error => label.red().bold().to_string(),
            DiagnosticSeverity::Warning => label.yellow().bold().to_string(),
            DiagnosticSeverity::Info => label.blue().bold().to_string(),
            DiagnosticSeverity::Hint => label.cyan().to_string(),
        }
    }

    /// 1-based (line, column) for a byte offset, from the cached source.
    fn position_for(&mut self, file: &str, offset: u32) -> Option<(u32, u32)> {
        let source = self
            .sources
            .entry(file.to_string())
            .or_insert_with(|| std::fs::read_to_string(file).ok())
            .as_deref()?;

        let offset = (offset as usize).min(source.len());
        let before = &source[..offset];
        let line = before.bytes().filter(|b| *b == b'\n').count() as u32 + 1;
        let column = match before.rfind('\n') {
            Some(newline) => (offset - newline) as u32,
            None => offset as u32 + 1,
        };
        Some((line, column))
    }
}

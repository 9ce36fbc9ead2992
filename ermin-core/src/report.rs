use crate::checker::CheckOutcome;
use crate::error::OutputError;
use crate::types::{Finding, Repair};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufWriter, Write as _};
use std::path::Path;

/// Lines shown per list by `summary` unless all are requested.
pub const DEFAULT_SUMMARY_LIMIT: usize = 10;

/// Renders findings as text, one line per finding.
pub struct ReportFormatter;

impl ReportFormatter {
    /// `<Severity>: row <r>, column <c>: <description>`, with 1-based data
    /// row numbers. Structural findings have no row part.
    pub fn line(finding: &Finding) -> String {
        match finding.row {
            Some(row) => format!(
                "{}: row {}, column {}: {}",
                finding.severity,
                row + 1,
                finding.column,
                finding.description
            ),
            None => format!(
                "{}: column {}: {}",
                finding.severity, finding.column, finding.description
            ),
        }
    }

    /// Every warning then every error, newline-terminated.
    pub fn format(warnings: &[Finding], errors: &[Finding]) -> String {
        let mut out = String::new();
        for finding in warnings.iter().chain(errors) {
            out.push_str(&Self::line(finding));
            out.push('\n');
        }
        out
    }

    /// Counts followed by at most `limit` lines per list (all when `None`).
    pub fn summary(warnings: &[Finding], errors: &[Finding], limit: Option<usize>) -> String {
        let mut out = String::new();
        Self::push_section(&mut out, "warning", warnings, limit);
        Self::push_section(&mut out, "error", errors, limit);
        out
    }

    fn push_section(out: &mut String, noun: &str, findings: &[Finding], limit: Option<usize>) {
        let plural = if findings.len() == 1 { "" } else { "s" };
        let _ = writeln!(out, "{} {noun}{plural}", findings.len());

        let shown = limit.unwrap_or(findings.len()).min(findings.len());
        for finding in &findings[..shown] {
            let _ = writeln!(out, "  {}", Self::line(finding));
        }
        if shown < findings.len() {
            let _ = writeln!(out, "  ... and {} more", findings.len() - shown);
        }
    }
}

/// Finding totals for the JSON report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportCounts {
    pub warnings: usize,
    pub errors: usize,
    pub repairs: usize,
    pub rows: usize,
}

/// Machine-readable record of one validation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonReport {
    pub generated_at: DateTime<Utc>,
    pub spec_path: String,
    pub spec_fingerprint: String,
    pub input_path: String,
    pub output_path: Option<String>,
    pub counts: ReportCounts,
    pub warnings: Vec<Finding>,
    pub errors: Vec<Finding>,
    pub repairs: Vec<Repair>,
}

impl JsonReport {
    pub fn new(
        outcome: &CheckOutcome,
        spec_path: &Path,
        spec_fingerprint: String,
        input_path: &Path,
        output_path: Option<&Path>,
    ) -> Self {
        Self {
            generated_at: Utc::now(),
            spec_path: spec_path.display().to_string(),
            spec_fingerprint,
            input_path: input_path.display().to_string(),
            output_path: output_path.map(|p| p.display().to_string()),
            counts: ReportCounts {
                warnings: outcome.warnings.len(),
                errors: outcome.errors.len(),
                repairs: outcome.repairs.len(),
                rows: outcome.table.row_count(),
            },
            warnings: outcome.warnings.clone(),
            errors: outcome.errors.clone(),
            repairs: outcome.repairs.clone(),
        }
    }

    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<(), OutputError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| OutputError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush().map_err(|source| OutputError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "wrote JSON report");
        Ok(())
    }
}

/// SHA-256 of the raw spec file, hex encoded.
pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

use ermin_core::{ReportFormatter, ValidationRun, DEFAULT_SUMMARY_LIMIT};
use std::fmt::Write as _;

/// Console text for a finished run. `all_findings` lifts the per-list limit.
pub fn render_run(run: &ValidationRun, all_findings: bool) -> String {
    let outcome = &run.outcome;
    let limit = if all_findings {
        None
    } else {
        Some(DEFAULT_SUMMARY_LIMIT)
    };

    let mut out = String::new();
    let required = run.spec.required_rules().count();
    let _ = writeln!(
        out,
        "📋 Spec: {} fields ({} required)",
        run.spec.len(),
        required
    );
    let _ = writeln!(
        out,
        "📄 Checked {} rows x {} columns",
        outcome.table.row_count(),
        outcome.table.column_count()
    );
    out.push('\n');
    out.push_str(&ReportFormatter::summary(&outcome.warnings, &outcome.errors, limit));

    if !outcome.repairs.is_empty() {
        let plural = if outcome.repairs.len() == 1 { "" } else { "s" };
        let _ = writeln!(out, "\n🔧 Applied {} repair{plural}", outcome.repairs.len());
    }

    out.push('\n');
    if outcome.has_errors() {
        let _ = writeln!(out, "❌ Validation failed");
    } else {
        let _ = writeln!(out, "✅ Validation passed");
    }
    out
}

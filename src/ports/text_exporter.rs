//! Text Report Exporter
//!
//! Renders an AuditReport as a plain-text summary for terminals and CI logs.

use crate::application::report::{AuditReport, TraceAudit};
use crate::domain::MethodId;
use crate::ports::ReportExporter;

pub struct TextExporter;

impl TextExporter {
    /// Convert an AuditReport to its text form.
    pub fn to_text(report: &AuditReport) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Plugin: {}", report.plugin));
        lines.push(format!(
            "Contract: {} mandatory, {} skipped",
            report.contract.mandatory.len(),
            report.contract.skipped.len()
        ));
        lines.push("".to_string());

        for audit in &report.audits {
            Self::push_audit(&mut lines, audit);
            lines.push("".to_string());
        }

        for failure in &report.failures {
            lines.push(format!("[FAILED] {}: {}", failure.source, failure.message));
        }
        if !report.failures.is_empty() {
            lines.push("".to_string());
        }

        if report.never_used.is_empty() {
            lines.push("Every mandatory method is exercised by at least one trace.".to_string());
        } else {
            lines.push(format!(
                "Never exercised ({}): {}",
                report.never_used.len(),
                Self::join(&report.never_used)
            ));
        }

        lines.join("\n")
    }

    fn push_audit(lines: &mut Vec<String>, audit: &TraceAudit) {
        let status = if audit.unused.is_clean() { "OK" } else { "MISSING" };
        lines.push(format!("[{}] {} ({} methods used)", status, audit.source, audit.used.len()));

        if !audit.unused.mandatory.is_empty() {
            lines.push(format!("    unused mandatory: {}", Self::join(&audit.unused.mandatory)));
        }
        if !audit.unused.skipped.is_empty() {
            lines.push(format!("    unused skipped:   {}", Self::join(&audit.unused.skipped)));
        }
        if let Some(errors) = &audit.errors {
            for error in errors {
                lines.push(format!("    error: {}", error));
            }
        }
    }

    fn join(ids: &[MethodId]) -> String {
        ids.iter().map(MethodId::as_str).collect::<Vec<_>>().join(", ")
    }
}

impl ReportExporter for TextExporter {
    fn render(&self, report: &AuditReport) -> anyhow::Result<String> {
        Ok(Self::to_text(report))
    }
}

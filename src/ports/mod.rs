use std::path::Path;

use anyhow::Context;

use crate::application::report::AuditReport;
use crate::domain::ingest::DebugDocument;
use crate::domain::Registry;

pub mod format;
pub mod text_exporter;

/// Source of debug documents and registries.
pub trait TraceLoader: Send + Sync {
    fn load_document(&self, path: &Path) -> anyhow::Result<DebugDocument>;
    fn load_registry(&self, path: &Path) -> anyhow::Result<Registry>;
}

pub trait ReportExporter: Send + Sync {
    fn render(&self, report: &AuditReport) -> anyhow::Result<String>;

    /// Write the rendered report to `path`, or to stdout when `path` is `-`.
    fn export(&self, report: &AuditReport, path: &str) -> anyhow::Result<()> {
        let content = self.render(report)?;
        if path == "-" {
            println!("{}", content);
            Ok(())
        } else {
            std::fs::write(path, content).with_context(|| format!("Failed to write report to {}", path))
        }
    }
}

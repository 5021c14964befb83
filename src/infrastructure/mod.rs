// Infrastructure implementations for trace-audit.

use std::fs::File;
use std::path::Path;

use anyhow::{bail, Context, Result};
use memmap2::Mmap;

use crate::application::report::AuditReport;
use crate::domain::ingest::{DebugDocument, RegistryDocument};
use crate::domain::Registry;
use crate::ports::{ReportExporter, TraceLoader};

pub mod concurrency;
pub mod config;
pub mod trace_collector;

/// Loads debug documents from JSON files through a read-only memory map.
pub struct JsonTraceLoader;

impl JsonTraceLoader {
    fn map(path: &Path) -> Result<Mmap> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        let len = file
            .metadata()
            .with_context(|| format!("Failed to stat {}", path.display()))?
            .len();
        if len == 0 {
            bail!("{} is empty", path.display());
        }
        // SAFETY: trace files must not be modified while an audit reads them;
        // the map only lives for the duration of one parse.
        unsafe { Mmap::map(&file) }.with_context(|| format!("Failed to map {}", path.display()))
    }
}

impl TraceLoader for JsonTraceLoader {
    fn load_document(&self, path: &Path) -> Result<DebugDocument> {
        let mmap = Self::map(path)?;
        DebugDocument::from_slice(&mmap)
            .with_context(|| format!("Invalid debug document {}", path.display()))
    }

    fn load_registry(&self, path: &Path) -> Result<Registry> {
        let mmap = Self::map(path)?;
        let document = RegistryDocument::from_slice(&mmap)
            .with_context(|| format!("Invalid registry document {}", path.display()))?;
        Ok(document.registry()?)
    }
}

pub struct JsonExporter;

impl ReportExporter for JsonExporter {
    fn render(&self, report: &AuditReport) -> Result<String> {
        serde_json::to_string_pretty(report).context("Failed to serialize audit report")
    }
}

use std::path::{Path, PathBuf};

use anyhow::Result;
use dashmap::DashMap;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::domain::ingest::DebugDocument;
use crate::domain::{
    collect_errors, AnalyzerSettings, AuditResult, ContractResolver, CoverageAudit, CoverageAuditor,
    Registry, ResolvedContract,
};
use crate::ports::{ReportExporter, TraceLoader};

pub mod report;

use report::{AuditReport, TraceAudit, TraceFailure};

pub struct AuditUsecase<'a> {
    pub loader: &'a dyn TraceLoader,
    pub exporter: &'a dyn ReportExporter,
    pub settings: &'a AnalyzerSettings,
}

impl<'a> AuditUsecase<'a> {
    /// Audit one debug document. `registry` replaces the document's own plugins when given.
    pub fn audit_document(
        &self,
        plugin_id: &str,
        source: &str,
        document: &DebugDocument,
        registry: Option<&Registry>,
    ) -> AuditResult<(TraceAudit, ResolvedContract)> {
        let embedded;
        let registry = match registry {
            Some(registry) => registry,
            None => {
                embedded = document.registry()?;
                &embedded
            }
        };
        let trace = document.trace()?;

        let CoverageAudit {
            contract,
            used,
            unused,
        } = CoverageAuditor::new(registry, self.settings).audit(plugin_id, &trace)?;

        info!(
            source,
            plugin = plugin_id,
            used = used.len(),
            unused_mandatory = unused.mandatory.len(),
            unused_skipped = unused.skipped.len(),
            "trace audited"
        );

        let audit = TraceAudit {
            source: source.to_string(),
            unused,
            used,
            errors: collect_errors(&trace),
        };
        Ok((audit, contract))
    }

    fn audit_path(
        &self,
        plugin_id: &str,
        path: &Path,
        registry: Option<&Registry>,
    ) -> Result<(TraceAudit, ResolvedContract)> {
        let document = self.loader.load_document(path)?;
        Ok(self.audit_document(plugin_id, &path.display().to_string(), &document, registry)?)
    }

    /// Audit every trace in parallel. Traces that fail are reported, not fatal.
    pub fn build_report(
        &self,
        plugin_id: &str,
        paths: &[PathBuf],
        registry: Option<&Registry>,
    ) -> Result<AuditReport> {
        let outcomes: DashMap<usize, Result<(TraceAudit, ResolvedContract), String>> = DashMap::new();

        paths.par_iter().enumerate().for_each(|(i, path)| {
            let outcome = self
                .audit_path(plugin_id, path, registry)
                .map_err(|e| format!("{:#}", e));
            outcomes.insert(i, outcome);
        });

        let mut contract = match registry {
            Some(registry) => Some(ContractResolver::new(registry, self.settings).resolve_contract(plugin_id)?),
            None => None,
        };
        let mut audits = Vec::new();
        let mut failures = Vec::new();

        for (i, path) in paths.iter().enumerate() {
            match outcomes.remove(&i).map(|(_, outcome)| outcome) {
                Some(Ok((audit, trace_contract))) => {
                    contract.get_or_insert(trace_contract);
                    audits.push(audit);
                }
                Some(Err(message)) => {
                    warn!(path = %path.display(), %message, "trace audit failed");
                    failures.push(TraceFailure {
                        source: path.display().to_string(),
                        message,
                    });
                }
                None => {}
            }
        }

        Ok(AuditReport::new(
            plugin_id,
            contract.unwrap_or_default(),
            audits,
            failures,
        ))
    }

    /// Build the report and hand it to the exporter.
    pub fn run(
        &self,
        plugin_id: &str,
        paths: &[PathBuf],
        registry: Option<&Registry>,
        output: &str,
    ) -> Result<AuditReport> {
        let report = self.build_report(plugin_id, paths, registry)?;
        self.exporter.export(&report, output)?;
        Ok(report)
    }
}

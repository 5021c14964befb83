use serde::Serialize;

use crate::domain::{MethodId, ResolvedContract, UnusedMethods, UsedMethods};

/// Audit of one trace against one plugin contract.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceAudit {
    /// Where the trace came from (file path or caller-provided label)
    pub source: String,
    pub unused: UnusedMethods,
    pub used: UsedMethods,
    pub errors: Option<Vec<String>>,
}

/// A trace that could not be loaded or audited.
#[derive(Debug, Clone, Serialize)]
pub struct TraceFailure {
    pub source: String,
    pub message: String,
}

/// Result of auditing one plugin across a batch of traces.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    pub plugin: String,
    pub contract: ResolvedContract,
    pub audits: Vec<TraceAudit>,
    /// Mandatory methods no audited trace exercised
    pub never_used: Vec<MethodId>,
    pub failures: Vec<TraceFailure>,
}

impl AuditReport {
    pub fn new(
        plugin: impl Into<String>,
        contract: ResolvedContract,
        audits: Vec<TraceAudit>,
        failures: Vec<TraceFailure>,
    ) -> Self {
        let never_used = contract
            .mandatory
            .iter()
            .filter(|id| audits.iter().all(|a| a.unused.mandatory.contains(id)))
            .cloned()
            .collect();

        Self {
            plugin: plugin.into(),
            contract,
            audits,
            never_used,
            failures,
        }
    }

    /// No mandatory gap and no failed trace.
    pub fn is_clean(&self) -> bool {
        self.never_used.is_empty() && self.failures.is_empty()
    }
}

//! Coverage Audit
//!
//! Contract methods that a trace never exercised.

use serde::Serialize;

use crate::domain::contract::{ContractResolver, ResolvedContract};
use crate::domain::error::AuditResult;
use crate::domain::registry::Registry;
use crate::domain::settings::AnalyzerSettings;
use crate::domain::trace::{MethodId, Trace};
use crate::domain::usage::{UsageResolver, UsedMethods};

/// Contract methods missing from a trace, in contract order.
///
/// A non-empty `mandatory` list means either the test fixture is defective
/// or a required method regressed. `skipped` is informational.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UnusedMethods {
    pub mandatory: Vec<MethodId>,
    pub skipped: Vec<MethodId>,
}

impl UnusedMethods {
    pub fn from_parts(contract: &ResolvedContract, used: &UsedMethods) -> Self {
        Self {
            mandatory: contract
                .mandatory
                .iter()
                .filter(|id| !used.contains(id))
                .cloned()
                .collect(),
            skipped: contract
                .skipped
                .iter()
                .filter(|id| !used.contains(id))
                .cloned()
                .collect(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.mandatory.is_empty()
    }
}

/// Everything one coverage audit computed: the contract, what the trace used
/// and the difference between the two.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageAudit {
    pub contract: ResolvedContract,
    pub used: UsedMethods,
    pub unused: UnusedMethods,
}

pub struct CoverageAuditor<'a> {
    registry: &'a Registry,
    settings: &'a AnalyzerSettings,
}

impl<'a> CoverageAuditor<'a> {
    pub fn new(registry: &'a Registry, settings: &'a AnalyzerSettings) -> Self {
        Self { registry, settings }
    }

    /// Resolve the plugin's contract and the trace's used methods, then diff them.
    pub fn audit(&self, plugin_id: &str, trace: &Trace) -> AuditResult<CoverageAudit> {
        let contract = ContractResolver::new(self.registry, self.settings).resolve_contract(plugin_id)?;
        let used = UsageResolver::new(self.registry, self.settings).all_used_methods(trace)?;
        let unused = UnusedMethods::from_parts(&contract, &used);
        Ok(CoverageAudit {
            contract,
            used,
            unused,
        })
    }

    pub fn unused_methods(&self, plugin_id: &str, trace: &Trace) -> AuditResult<UnusedMethods> {
        Ok(self.audit(plugin_id, trace)?.unused)
    }
}

/// [`CoverageAuditor::unused_methods`] with default settings.
pub fn unused_methods(plugin_id: &str, trace: &Trace, registry: &Registry) -> AuditResult<UnusedMethods> {
    let settings = AnalyzerSettings::default();
    CoverageAuditor::new(registry, &settings).unused_methods(plugin_id, trace)
}

//! Contract Resolution
//!
//! Resolves the methods a plugin is expected to exercise, following its mixin
//! declarations depth-first. A skipped mixin forces its whole subtree into the
//! skipped category; the first classification of a method id always wins.

use std::collections::HashSet;

use indexmap::IndexSet;
use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::error::{AuditError, AuditResult};
use crate::domain::registry::Registry;
use crate::domain::settings::AnalyzerSettings;
use crate::domain::trace::MethodId;

/// How a plugin subtree is being resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveMode {
    Normal,
    /// An ancestor skipped this subtree; every method is classified skipped
    ForceSkip,
}

/// Mandatory and skipped method ids, disjoint, in classification order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedContract {
    pub mandatory: IndexSet<MethodId>,
    pub skipped: IndexSet<MethodId>,
}

impl ResolvedContract {
    fn is_classified(&self, id: &MethodId) -> bool {
        self.mandatory.contains(id) || self.skipped.contains(id)
    }

    pub fn len(&self) -> usize {
        self.mandatory.len() + self.skipped.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct ContractResolver<'a> {
    registry: &'a Registry,
    settings: &'a AnalyzerSettings,
}

impl<'a> ContractResolver<'a> {
    pub fn new(registry: &'a Registry, settings: &'a AnalyzerSettings) -> Self {
        Self { registry, settings }
    }

    pub fn resolve_contract(&self, plugin_id: &str) -> AuditResult<ResolvedContract> {
        let mut result = ResolvedContract::default();
        let mut visited = HashSet::new();
        let mut chain = Vec::new();

        self.resolve(
            plugin_id,
            ResolveMode::Normal,
            &mut result,
            &mut visited,
            &mut chain,
        )?;

        debug!(
            plugin = plugin_id,
            mandatory = result.mandatory.len(),
            skipped = result.skipped.len(),
            "contract resolved"
        );
        Ok(result)
    }

    fn resolve(
        &self,
        plugin_id: &str,
        mode: ResolveMode,
        result: &mut ResolvedContract,
        visited: &mut HashSet<String>,
        chain: &mut Vec<String>,
    ) -> AuditResult<()> {
        let contract = self.registry.get(plugin_id)?;

        // A revisited plugin has nothing left to classify.
        if !visited.insert(plugin_id.to_string()) {
            if chain.iter().any(|p| p == plugin_id) {
                warn!(plugin = plugin_id, chain = ?chain, "cyclic mixin declaration ignored");
            }
            return Ok(());
        }
        chain.push(plugin_id.to_string());

        let skip_mixins = contract.skip_mixins();
        let skip_methods = contract.skip_methods();

        for mixin in &contract.mixins {
            if !self.registry.contains(mixin) {
                return Err(AuditError::UnknownMixin {
                    plugin: plugin_id.to_string(),
                    mixin: mixin.clone(),
                });
            }

            let mixin_mode = if mode == ResolveMode::Normal && !skip_mixins.contains(mixin.as_str()) {
                ResolveMode::Normal
            } else {
                ResolveMode::ForceSkip
            };
            self.resolve(mixin, mixin_mode, result, visited, chain)?;
        }

        for capability in &self.settings.capabilities {
            if !contract.methods.contains_key(capability) {
                continue;
            }

            let id = MethodId::new(plugin_id, capability);
            if result.is_classified(&id) {
                continue;
            }

            if mode == ResolveMode::ForceSkip || skip_methods.contains(capability.as_str()) {
                result.skipped.insert(id);
            } else {
                result.mandatory.insert(id);
            }
        }

        chain.pop();
        Ok(())
    }
}

/// [`ContractResolver::resolve_contract`] with default settings.
pub fn resolve_contract(plugin_id: &str, registry: &Registry) -> AuditResult<ResolvedContract> {
    let settings = AnalyzerSettings::default();
    ContractResolver::new(registry, &settings).resolve_contract(plugin_id)
}

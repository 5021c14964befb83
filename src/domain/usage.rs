//! Used-Method Resolution
//!
//! Walks a layered trace backwards from its final outputs (meta fields and
//! links) to every method whose output was needed to produce them.

use std::collections::BTreeSet;

use indexmap::IndexSet;
use serde::Serialize;
use tracing::debug;

use crate::domain::error::AuditResult;
use crate::domain::registry::Registry;
use crate::domain::settings::AnalyzerSettings;
use crate::domain::trace::{Link, MethodDescriptor, MethodId, MethodRecord, OutputItem, Trace};

/// Method ids exercised by a trace, in discovery order, without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct UsedMethods {
    methods: IndexSet<MethodId>,
}

impl UsedMethods {
    /// Returns `false` when the id was already present.
    fn insert(&mut self, id: MethodId) -> bool {
        self.methods.insert(id)
    }

    pub fn contains(&self, id: &MethodId) -> bool {
        self.methods.contains(id)
    }

    pub fn contains_str(&self, id: &str) -> bool {
        self.methods.iter().any(|m| m.as_str() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MethodId> {
        self.methods.iter()
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl<'a> IntoIterator for &'a UsedMethods {
    type Item = &'a MethodId;
    type IntoIter = indexmap::set::Iter<'a, MethodId>;

    fn into_iter(self) -> Self::IntoIter {
        self.methods.iter()
    }
}

/// What one backward walk is looking for.
#[derive(Debug, Clone, Copy)]
enum Target<'a> {
    /// Producers of a final link (directly or through a collapsed duplicate)
    Link(&'a Link),
    /// The method registered as the source of a meta field
    Meta(&'a MethodDescriptor),
    /// Producers of any of the given fields
    Fields(&'a [String]),
}

impl Target<'_> {
    fn matches(&self, record: &MethodRecord, item: &OutputItem) -> bool {
        match self {
            Target::Link(link) => {
                let wanted = Some(link.source_id.as_str());
                item.source_id().as_deref() == wanted || item.duplicate_id().as_deref() == wanted
            }
            Target::Meta(descriptor) => record.method == **descriptor,
            Target::Fields(fields) => fields.iter().any(|f| item.has_field(f)),
        }
    }
}

/// Only levels strictly below the ceiling are scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LevelCeiling {
    Unbounded,
    Below(u32),
}

impl LevelCeiling {
    fn admits(self, index: u32) -> bool {
        match self {
            LevelCeiling::Unbounded => true,
            LevelCeiling::Below(ceiling) => index < ceiling,
        }
    }
}

/// Resolves which methods a trace actually exercised.
pub struct UsageResolver<'a> {
    registry: &'a Registry,
    settings: &'a AnalyzerSettings,
}

impl<'a> UsageResolver<'a> {
    pub fn new(registry: &'a Registry, settings: &'a AnalyzerSettings) -> Self {
        Self { registry, settings }
    }

    /// Union of the walks seeded from every meta source and every link.
    pub fn all_used_methods(&self, trace: &Trace) -> AuditResult<UsedMethods> {
        let default_context = self.default_context(trace);
        let mut used = UsedMethods::default();

        for (meta_key, descriptor) in &trace.meta_sources {
            debug!(meta = %meta_key, source = %descriptor.id(), "resolving meta source");
            self.find_used_methods(
                Target::Meta(descriptor),
                trace,
                LevelCeiling::Unbounded,
                &default_context,
                &mut used,
            )?;
        }

        for link in &trace.links {
            debug!(source_id = %link.source_id, "resolving link");
            self.find_used_methods(
                Target::Link(link),
                trace,
                LevelCeiling::Unbounded,
                &default_context,
                &mut used,
            )?;
        }

        Ok(used)
    }

    /// Methods that contributed to a single link.
    pub fn methods_for_link(&self, trace: &Trace, link: &Link) -> AuditResult<UsedMethods> {
        let default_context = self.default_context(trace);
        let mut used = UsedMethods::default();
        self.find_used_methods(
            Target::Link(link),
            trace,
            LevelCeiling::Unbounded,
            &default_context,
            &mut used,
        )?;
        Ok(used)
    }

    /// Methods that contributed to one meta field. Unknown keys yield an empty set.
    pub fn methods_for_meta(&self, trace: &Trace, meta_key: &str) -> AuditResult<UsedMethods> {
        let default_context = self.default_context(trace);
        let mut used = UsedMethods::default();
        if let Some(descriptor) = trace.meta_sources.get(meta_key) {
            self.find_used_methods(
                Target::Meta(descriptor),
                trace,
                LevelCeiling::Unbounded,
                &default_context,
                &mut used,
            )?;
        }
        Ok(used)
    }

    /// Level-0 context plus the implicit ambient inputs.
    fn default_context(&self, trace: &Trace) -> BTreeSet<String> {
        let mut context = trace.root_context();
        context.extend(self.settings.implicit_context.iter().cloned());
        context
    }

    fn find_used_methods(
        &self,
        target: Target<'_>,
        trace: &Trace,
        ceiling: LevelCeiling,
        default_context: &BTreeSet<String>,
        used: &mut UsedMethods,
    ) -> AuditResult<()> {
        for level in trace.levels.iter().filter(|l| ceiling.admits(l.index)) {
            for record in &level.records {
                for item in &record.data {
                    if !target.matches(record, item) {
                        continue;
                    }

                    let method_id = record.method.id();
                    if !used.insert(method_id.clone()) {
                        // Upstream of this method is already resolved
                        continue;
                    }
                    debug!(method = %method_id, level = level.index, "method used");

                    let required: Vec<String> = self
                        .registry
                        .requirements(&record.method.plugin_id, &record.method.method_name)?
                        .iter()
                        .filter(|field| !default_context.contains(field.as_str()))
                        .cloned()
                        .collect();

                    if !required.is_empty() {
                        debug!(method = %method_id, ?required, "searching producers");
                        self.find_used_methods(
                            Target::Fields(&required),
                            trace,
                            LevelCeiling::Below(level.index),
                            default_context,
                            used,
                        )?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// [`UsageResolver::all_used_methods`] with default settings.
pub fn all_used_methods(trace: &Trace, registry: &Registry) -> AuditResult<UsedMethods> {
    let settings = AnalyzerSettings::default();
    UsageResolver::new(registry, &settings).all_used_methods(trace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::AuditError;
    use crate::domain::registry::PluginContract;
    use crate::domain::trace::Level;
    use serde_json::json;

    fn record(plugin: &str, method: &str, items: Vec<OutputItem>) -> MethodRecord {
        MethodRecord::new(MethodDescriptor::new(plugin, method), items)
    }

    fn item(pairs: &[(&str, serde_json::Value)]) -> OutputItem {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn level(index: u32, context: &[&str], records: Vec<MethodRecord>) -> Level {
        Level {
            index,
            context: context.iter().map(|s| s.to_string()).collect(),
            records,
        }
    }

    fn ids(used: &UsedMethods) -> Vec<&str> {
        used.iter().map(MethodId::as_str).collect()
    }

    /// meta.getMeta (level 0) -> oembed.getLink needs `meta` (level 1) -> link.
    fn chained() -> (Trace, Registry) {
        let registry = Registry::new()
            .with_plugin("meta", PluginContract::new().method("getMeta", ["url", "htmlparser"]))
            .with_plugin(
                "oembed",
                PluginContract::new()
                    .method("getLink", ["meta"])
                    .method("getData", ["url"]),
            );

        let trace = Trace {
            levels: vec![
                level(
                    0,
                    &["url", "htmlparser"],
                    vec![record("meta", "getMeta", vec![item(&[("meta", json!({"title": "x"}))])])],
                ),
                level(
                    1,
                    &[],
                    vec![
                        record("oembed", "getLink", vec![item(&[("sourceId", json!("l1"))])]),
                        record("oembed", "getData", vec![item(&[("oembed", json!({}))])]),
                    ],
                ),
            ],
            links: vec![Link::new("l1")],
            ..Default::default()
        };
        (trace, registry)
    }

    #[test]
    fn test_link_walk_resolves_upstream_producer() {
        let (trace, registry) = chained();
        let used = all_used_methods(&trace, &registry).unwrap();
        assert_eq!(ids(&used), vec!["oembed - getLink", "meta - getMeta"]);
        assert!(!used.contains_str("oembed - getData"));
    }

    #[test]
    fn test_duplicate_id_matches_link() {
        let registry = Registry::new().with_plugin("a", PluginContract::new().method("getLink", ["url"]));
        let trace = Trace {
            levels: vec![level(
                0,
                &["url"],
                vec![record("a", "getLink", vec![item(&[("sourceId", json!("dup")), ("duplicateId", json!("orig"))])])],
            )],
            links: vec![Link::new("orig")],
            ..Default::default()
        };
        let used = all_used_methods(&trace, &registry).unwrap();
        assert!(used.contains_str("a - getLink"));
    }

    #[test]
    fn test_meta_target_ignores_item_content() {
        let registry = Registry::new().with_plugin("og", PluginContract::new().method("getMeta", ["meta"]));
        let mut trace = Trace {
            levels: vec![level(0, &["meta"], vec![record("og", "getMeta", vec![item(&[("title", json!("t"))])])])],
            ..Default::default()
        };
        trace
            .meta_sources
            .insert("title".to_string(), MethodDescriptor::new("og", "getMeta"));

        let used = all_used_methods(&trace, &registry).unwrap();
        assert_eq!(ids(&used), vec!["og - getMeta"]);
    }

    #[test]
    fn test_record_without_items_never_matches() {
        let registry = Registry::new().with_plugin("og", PluginContract::new().method("getMeta", ["meta"]));
        let mut trace = Trace {
            levels: vec![level(0, &["meta"], vec![record("og", "getMeta", vec![])])],
            ..Default::default()
        };
        trace
            .meta_sources
            .insert("title".to_string(), MethodDescriptor::new("og", "getMeta"));

        assert!(all_used_methods(&trace, &registry).unwrap().is_empty());
    }

    #[test]
    fn test_producer_at_same_level_is_not_a_dependency() {
        let registry = Registry::new()
            .with_plugin("a", PluginContract::new().method("getLink", ["oembed"]))
            .with_plugin("b", PluginContract::new().method("getData", ["url"]));
        let trace = Trace {
            levels: vec![
                level(0, &["url"], vec![]),
                level(
                    1,
                    &[],
                    vec![
                        record("b", "getData", vec![item(&[("oembed", json!({}))])]),
                        record("a", "getLink", vec![item(&[("sourceId", json!("x"))])]),
                    ],
                ),
            ],
            links: vec![Link::new("x")],
            ..Default::default()
        };

        let used = all_used_methods(&trace, &registry).unwrap();
        assert_eq!(ids(&used), vec!["a - getLink"]);
    }

    #[test]
    fn test_implicit_context_is_never_searched() {
        let registry = Registry::new()
            .with_plugin("a", PluginContract::new().method("getLink", ["request", "$selector"]))
            .with_plugin("b", PluginContract::new().method("getData", ["url"]));
        let trace = Trace {
            levels: vec![
                level(0, &["url"], vec![record("b", "getData", vec![item(&[("request", json!(1))])])]),
                level(1, &[], vec![record("a", "getLink", vec![item(&[("sourceId", json!("x"))])])]),
            ],
            links: vec![Link::new("x")],
            ..Default::default()
        };

        let used = all_used_methods(&trace, &registry).unwrap();
        assert_eq!(ids(&used), vec!["a - getLink"]);
    }

    #[test]
    fn test_missing_producer_is_not_an_error() {
        let registry = Registry::new().with_plugin("a", PluginContract::new().method("getLink", ["nobodyMakesThis"]));
        let trace = Trace {
            levels: vec![level(0, &[], vec![record("a", "getLink", vec![item(&[("sourceId", json!("x"))])])])],
            links: vec![Link::new("x")],
            ..Default::default()
        };
        let used = all_used_methods(&trace, &registry).unwrap();
        assert_eq!(ids(&used), vec!["a - getLink"]);
    }

    #[test]
    fn test_all_matching_records_are_accepted() {
        let registry = Registry::new()
            .with_plugin("a", PluginContract::new().method("getLink", ["url"]))
            .with_plugin("b", PluginContract::new().method("getLink", ["url"]));
        let trace = Trace {
            levels: vec![level(
                0,
                &["url"],
                vec![
                    record("a", "getLink", vec![item(&[("sourceId", json!("same"))])]),
                    record("b", "getLink", vec![item(&[("sourceId", json!("same"))])]),
                ],
            )],
            links: vec![Link::new("same")],
            ..Default::default()
        };
        let used = all_used_methods(&trace, &registry).unwrap();
        assert_eq!(ids(&used), vec!["a - getLink", "b - getLink"]);
    }

    #[test]
    fn test_repeated_invocations_are_deduplicated() {
        let (mut trace, registry) = chained();
        trace.levels[1]
            .records
            .push(record("oembed", "getLink", vec![item(&[("sourceId", json!("l2"))])]));
        trace.links.push(Link::new("l2"));

        let first = all_used_methods(&trace, &registry).unwrap();
        let second = all_used_methods(&trace, &registry).unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
    }

    #[test]
    fn test_unknown_method_is_a_configuration_error() {
        let registry = Registry::new().with_plugin("a", PluginContract::new().method("getMeta", ["url"]));
        let trace = Trace {
            levels: vec![level(0, &[], vec![record("a", "getLink", vec![item(&[("sourceId", json!("x"))])])])],
            links: vec![Link::new("x")],
            ..Default::default()
        };
        assert_eq!(
            all_used_methods(&trace, &registry).unwrap_err(),
            AuditError::UnknownMethod {
                plugin: "a".to_string(),
                method: "getLink".to_string(),
            }
        );
    }

    #[test]
    fn test_methods_for_single_link() {
        let (trace, registry) = chained();
        let settings = AnalyzerSettings::default();
        let resolver = UsageResolver::new(&registry, &settings);

        let used = resolver.methods_for_link(&trace, &Link::new("l1")).unwrap();
        assert_eq!(used.len(), 2);
        assert!(resolver.methods_for_link(&trace, &Link::new("none")).unwrap().is_empty());
        assert!(resolver.methods_for_meta(&trace, "title").unwrap().is_empty());
    }
}

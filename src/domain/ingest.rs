//! Debug Document Ingestion
//!
//! Parses the debug document emitted by the extraction engine and normalizes
//! it into a typed [`Trace`] and [`Registry`]. All shape variations (single
//! item vs. list outputs, object vs. list contexts) are resolved here so the
//! resolvers never branch on shape.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::domain::error::{AuditError, AuditResult};
use crate::domain::registry::{PluginContract, Registry};
use crate::domain::test_entry::TestEntry;
use crate::domain::trace::{scalar_key, Level, Link, MethodDescriptor, MethodRecord, OutputItem, Trace};

/// The full debug document: trace levels, meta provenance, links and plugins.
#[derive(Debug, Default, Deserialize)]
pub struct DebugDocument {
    #[serde(default)]
    pub debug: Vec<RawLevel>,
    #[serde(default)]
    pub meta: RawMeta,
    #[serde(default)]
    pub links: Vec<RawLink>,
    #[serde(default)]
    pub plugins: IndexMap<String, RawPlugin>,
}

/// A registry-only document (`{"plugins": {...}}`).
#[derive(Debug, Default, Deserialize)]
pub struct RegistryDocument {
    #[serde(default)]
    pub plugins: IndexMap<String, RawPlugin>,
}

#[derive(Debug, Deserialize)]
pub struct RawLevel {
    #[serde(default)]
    pub index: Option<u32>,
    #[serde(default)]
    pub context: Value,
    #[serde(default)]
    pub data: Vec<RawRecord>,
}

#[derive(Debug, Deserialize)]
pub struct RawRecord {
    pub method: RawMethod,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub error: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMethod {
    pub plugin_id: String,
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawMeta {
    #[serde(rename = "_sources", default)]
    pub sources: IndexMap<String, RawMetaSource>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMetaSource {
    pub plugin_id: String,
    pub method: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLink {
    #[serde(default)]
    pub source_id: Value,
    #[serde(default)]
    pub duplicate_id: Value,
}

#[derive(Debug, Deserialize)]
pub struct RawPlugin {
    #[serde(default)]
    pub methods: Value,
    #[serde(default)]
    pub module: RawModule,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawModule {
    #[serde(default)]
    pub mixins: Value,
    #[serde(default)]
    pub tests: Value,
}

impl DebugDocument {
    pub fn from_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }

    pub fn into_parts(self) -> AuditResult<(Trace, Registry)> {
        let trace = self.trace()?;
        let registry = build_registry(&self.plugins)?;
        Ok((trace, registry))
    }

    pub fn registry(&self) -> AuditResult<Registry> {
        build_registry(&self.plugins)
    }

    pub fn trace(&self) -> AuditResult<Trace> {
        let mut levels = Vec::with_capacity(self.debug.len());
        let mut previous: Option<u32> = None;

        for (position, raw) in self.debug.iter().enumerate() {
            let index = match raw.index {
                Some(index) => index,
                None => u32::try_from(position)
                    .map_err(|_| AuditError::MalformedTrace("too many levels".to_string()))?,
            };
            if previous.is_some_and(|p| p >= index) {
                return Err(AuditError::MalformedTrace(format!(
                    "level index {} does not increase after {}",
                    index,
                    previous.unwrap_or_default()
                )));
            }
            previous = Some(index);

            levels.push(Level {
                index,
                context: context_fields(&raw.context, index)?,
                records: raw.data.iter().map(normalize_record).collect(),
            });
        }

        let meta_sources = self
            .meta
            .sources
            .iter()
            .map(|(key, s)| (key.clone(), MethodDescriptor::new(&s.plugin_id, &s.method)))
            .collect();

        let mut links = Vec::with_capacity(self.links.len());
        for (position, raw) in self.links.iter().enumerate() {
            match scalar_key(&raw.source_id) {
                Some(source_id) => links.push(Link {
                    source_id: source_id.into_owned(),
                    duplicate_id: scalar_key(&raw.duplicate_id).map(|d| d.into_owned()),
                }),
                None => warn!(position, "link without a sourceId skipped"),
            }
        }

        debug!(levels = levels.len(), links = links.len(), "trace ingested");
        Ok(Trace {
            levels,
            meta_sources,
            links,
        })
    }
}

impl RegistryDocument {
    pub fn from_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }

    pub fn registry(&self) -> AuditResult<Registry> {
        build_registry(&self.plugins)
    }
}

fn context_fields(context: &Value, level: u32) -> AuditResult<BTreeSet<String>> {
    match context {
        Value::Null => Ok(BTreeSet::new()),
        Value::Object(map) => Ok(map.keys().cloned().collect()),
        Value::Array(items) => items
            .iter()
            .map(|v| {
                v.as_str().map(str::to_string).ok_or_else(|| {
                    AuditError::MalformedTrace(format!("level {} context lists a non-string field", level))
                })
            })
            .collect(),
        other => Err(AuditError::MalformedTrace(format!(
            "level {} context must be an object or a list, found {}",
            level, other
        ))),
    }
}

fn normalize_record(raw: &RawRecord) -> MethodRecord {
    MethodRecord {
        method: MethodDescriptor::new(&raw.method.plugin_id, &raw.method.name),
        data: normalize_output(&raw.data),
        error: normalize_error(&raw.error),
    }
}

/// Single object -> one item, list -> items, nothing or a falsy scalar -> empty.
fn normalize_output(data: &Value) -> Vec<OutputItem> {
    match data {
        falsy if is_falsy(falsy) => Vec::new(),
        Value::Array(items) => items.iter().map(as_item).collect(),
        other => vec![as_item(other)],
    }
}

/// `null`, `false`, zero and the empty string carry no value.
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Non-object elements still count as produced items, just without fields.
fn as_item(value: &Value) -> OutputItem {
    match value {
        Value::Object(fields) => OutputItem::new(fields.clone()),
        _ => OutputItem::new(Map::new()),
    }
}

fn normalize_error(error: &Value) -> Option<String> {
    match error {
        falsy if is_falsy(falsy) => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn build_registry(plugins: &IndexMap<String, RawPlugin>) -> AuditResult<Registry> {
    let mut registry = Registry::new();
    for (plugin_id, raw) in plugins {
        registry.insert(plugin_id.clone(), build_contract(plugin_id, raw)?);
    }
    Ok(registry)
}

fn build_contract(plugin_id: &str, raw: &RawPlugin) -> AuditResult<PluginContract> {
    let malformed = |reason: String| AuditError::MalformedContract {
        plugin: plugin_id.to_string(),
        reason,
    };

    let mut contract = PluginContract::new();

    match &raw.methods {
        Value::Null => {}
        Value::Object(methods) => {
            for (name, requires) in methods {
                let fields = match requires {
                    Value::Null => Vec::new(),
                    Value::Array(items) => items
                        .iter()
                        .map(|f| {
                            f.as_str()
                                .map(str::to_string)
                                .ok_or_else(|| malformed(format!("method '{}' lists a non-string field", name)))
                        })
                        .collect::<AuditResult<Vec<_>>>()?,
                    _ => return Err(malformed(format!("method '{}' requirements must be a list", name))),
                };
                contract.methods.insert(name.clone(), fields);
            }
        }
        _ => return Err(malformed("'methods' must be an object".to_string())),
    }

    match &raw.module.mixins {
        Value::Null => {}
        Value::Array(items) => {
            for item in items {
                let mixin = item
                    .as_str()
                    .ok_or_else(|| malformed("'mixins' must list plugin ids".to_string()))?;
                contract.mixins.push(mixin.to_string());
            }
        }
        _ => return Err(malformed("'mixins' must be a list".to_string())),
    }

    match &raw.module.tests {
        Value::Null => {}
        Value::Array(items) => {
            for item in items {
                contract.tests.push(TestEntry::from_value(item).map_err(&malformed)?);
            }
        }
        _ => return Err(malformed("'tests' must be a list".to_string())),
    }

    Ok(contract)
}

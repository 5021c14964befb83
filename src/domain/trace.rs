//! Execution Trace Model
//!
//! Typed, already-normalized view of one extraction run: dependency-ordered
//! levels of method records, the meta-field provenance map and the final links.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identity key of a plugin method, rendered as `"pluginId - methodName"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MethodId(String);

impl MethodId {
    pub fn new(plugin_id: &str, method_name: &str) -> Self {
        Self(format!("{} - {}", plugin_id, method_name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for MethodId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for MethodId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// A plugin method reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    pub plugin_id: String,
    pub method_name: String,
}

impl MethodDescriptor {
    pub fn new(plugin_id: impl Into<String>, method_name: impl Into<String>) -> Self {
        Self {
            plugin_id: plugin_id.into(),
            method_name: method_name.into(),
        }
    }

    pub fn id(&self) -> MethodId {
        MethodId::new(&self.plugin_id, &self.method_name)
    }
}

/// One item produced by a method invocation: an open set of named fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputItem {
    fields: Map<String, Value>,
}

impl OutputItem {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// `sourceId` as a comparable key, if present and scalar.
    pub fn source_id(&self) -> Option<Cow<'_, str>> {
        self.field("sourceId").and_then(scalar_key)
    }

    /// `duplicateId` as a comparable key, if present and scalar.
    pub fn duplicate_id(&self) -> Option<Cow<'_, str>> {
        self.field("duplicateId").and_then(scalar_key)
    }
}

impl<K, V> FromIterator<(K, V)> for OutputItem
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Identifiers are compared as text; numeric ids are rendered the way JSON prints them.
pub(crate) fn scalar_key(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::String(s) => Some(Cow::Borrowed(s)),
        Value::Number(n) => Some(Cow::Owned(n.to_string())),
        Value::Bool(b) => Some(Cow::Owned(b.to_string())),
        _ => None,
    }
}

/// One logged invocation within a level.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodRecord {
    pub method: MethodDescriptor,
    pub data: Vec<OutputItem>,
    pub error: Option<String>,
}

impl MethodRecord {
    pub fn new(method: MethodDescriptor, data: Vec<OutputItem>) -> Self {
        Self {
            method,
            data,
            error: None,
        }
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }
}

/// One dependency layer of a trace.
#[derive(Debug, Clone, PartialEq)]
pub struct Level {
    pub index: u32,
    /// Field names ambiently available at this layer
    pub context: BTreeSet<String>,
    pub records: Vec<MethodRecord>,
}

/// A final output link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub source_id: String,
    /// Set when extraction collapsed this link into another link's `source_id`
    pub duplicate_id: Option<String>,
}

impl Link {
    pub fn new(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            duplicate_id: None,
        }
    }
}

/// An immutable execution trace.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trace {
    pub levels: Vec<Level>,
    /// meta field name -> method that produced it, in document order
    pub meta_sources: IndexMap<String, MethodDescriptor>,
    pub links: Vec<Link>,
}

impl Trace {
    /// Context declared on the first level, empty for a trace without levels.
    pub fn root_context(&self) -> BTreeSet<String> {
        self.levels
            .first()
            .map(|l| l.context.clone())
            .unwrap_or_default()
    }

    /// Iterate every record together with the index of its level.
    pub fn records(&self) -> impl Iterator<Item = (u32, &MethodRecord)> {
        self.levels
            .iter()
            .flat_map(|level| level.records.iter().map(move |r| (level.index, r)))
    }
}

//! Plugin Contract Registry
//!
//! Declared method requirements, mixin composition and test declarations for
//! every loaded plugin.

use indexmap::{IndexMap, IndexSet};

use crate::domain::error::{AuditError, AuditResult};
use crate::domain::test_entry::{TestEntry, TestInput};

/// A plugin's declared contract.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PluginContract {
    /// method name -> field names the method requires as input
    pub methods: IndexMap<String, Vec<String>>,
    /// Mixin plugin ids, in declaration order
    pub mixins: Vec<String>,
    pub tests: Vec<TestEntry>,
}

impl PluginContract {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a method and the fields it requires.
    pub fn method<I, S>(mut self, name: impl Into<String>, requires: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.methods
            .insert(name.into(), requires.into_iter().map(Into::into).collect());
        self
    }

    pub fn mixin(mut self, plugin_id: impl Into<String>) -> Self {
        self.mixins.push(plugin_id.into());
        self
    }

    pub fn test(mut self, entry: TestEntry) -> Self {
        self.tests.push(entry);
        self
    }

    /// Union of `skipMixins` across all test declarations.
    pub fn skip_mixins(&self) -> IndexSet<&str> {
        self.tests
            .iter()
            .flat_map(|t| t.skip_mixins.iter().map(String::as_str))
            .collect()
    }

    /// Union of `skipMethods` across all test declarations.
    pub fn skip_methods(&self) -> IndexSet<&str> {
        self.tests
            .iter()
            .flat_map(|t| t.skip_methods.iter().map(String::as_str))
            .collect()
    }

    /// Declared test inputs, in declaration order.
    pub fn test_sources(&self) -> Vec<&TestInput> {
        self.tests.iter().filter_map(|t| t.input.as_ref()).collect()
    }

    pub fn requirements(&self, method_name: &str) -> Option<&[String]> {
        self.methods.get(method_name).map(Vec::as_slice)
    }
}

/// pluginId -> contract.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Registry {
    plugins: IndexMap<String, PluginContract>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, plugin_id: impl Into<String>, contract: PluginContract) {
        self.plugins.insert(plugin_id.into(), contract);
    }

    pub fn with_plugin(mut self, plugin_id: impl Into<String>, contract: PluginContract) -> Self {
        self.insert(plugin_id, contract);
        self
    }

    /// Look up a plugin, failing with [`AuditError::UnknownPlugin`].
    pub fn get(&self, plugin_id: &str) -> AuditResult<&PluginContract> {
        self.plugins
            .get(plugin_id)
            .ok_or_else(|| AuditError::UnknownPlugin(plugin_id.to_string()))
    }

    /// Required fields of `plugin_id`'s `method_name`.
    pub fn requirements(&self, plugin_id: &str, method_name: &str) -> AuditResult<&[String]> {
        self.get(plugin_id)?
            .requirements(method_name)
            .ok_or_else(|| AuditError::UnknownMethod {
                plugin: plugin_id.to_string(),
                method: method_name.to_string(),
            })
    }

    pub fn contains(&self, plugin_id: &str) -> bool {
        self.plugins.contains_key(plugin_id)
    }

    pub fn plugin_ids(&self) -> impl Iterator<Item = &str> {
        self.plugins.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

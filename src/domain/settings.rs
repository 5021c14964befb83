//! Analyzer Settings
//!
//! The recognized plugin capability set and the ambient context fields that
//! no method ever produces.

use serde::{Deserialize, Serialize};

/// Method names a plugin contract is audited for, in enumeration order.
pub const DEFAULT_CAPABILITIES: &[&str] = &[
    "getMeta",
    "getLink",
    "getLinks",
    "getData",
    "prepareLink",
    "getVars",
];

/// Inputs handed to every plugin by the engine itself.
pub const DEFAULT_IMPLICIT_CONTEXT: &[&str] = &["request", "$selector"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerSettings {
    pub capabilities: Vec<String>,
    pub implicit_context: Vec<String>,
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self {
            capabilities: DEFAULT_CAPABILITIES.iter().map(|s| s.to_string()).collect(),
            implicit_context: DEFAULT_IMPLICIT_CONTEXT.iter().map(|s| s.to_string()).collect(),
        }
    }
}

//! TOML configuration for the audit CLI.
//!
//! ```toml
//! capabilities = ["getMeta", "getLink", "getData"]
//! implicit_context = ["request", "$selector"]
//! jobs = 4
//! ```

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::AnalyzerSettings;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    #[serde(flatten)]
    pub analyzer: AnalyzerSettings,
    /// Worker threads for batch audits
    pub jobs: Option<usize>,
}

impl AuditConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Cannot read config {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

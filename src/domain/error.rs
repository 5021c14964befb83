//! Audit Error Types
//!
//! Configuration failures raised by the analyzer. Missing producers during
//! backward resolution are not errors and never surface here.

use thiserror::Error;

/// Errors that can occur while resolving contracts or walking a trace.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuditError {
    #[error("plugin '{0}' is not present in the registry")]
    UnknownPlugin(String),

    #[error("plugin '{plugin}' declares mixin '{mixin}' which is not present in the registry")]
    UnknownMixin { plugin: String, mixin: String },

    #[error("trace record references '{plugin} - {method}' which plugin '{plugin}' does not declare")]
    UnknownMethod { plugin: String, method: String },

    #[error("plugin '{plugin}' has a malformed contract: {reason}")]
    MalformedContract { plugin: String, reason: String },

    #[error("malformed trace: {0}")]
    MalformedTrace(String),
}

/// Result type for analyzer operations.
pub type AuditResult<T> = Result<T, AuditError>;

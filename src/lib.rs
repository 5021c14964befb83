// Main library entry point for trace-audit.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod ports;

pub use domain::{
    all_used_methods, collect_errors, resolve_contract, unused_methods, AuditError, AuditResult,
    Registry, Trace,
};

// Analyzer core: trace and contract model, resolvers and the coverage audit.

pub mod contract;
pub mod coverage;
pub mod error;
pub mod ingest;
pub mod registry;
pub mod settings;
pub mod test_entry;
pub mod trace;
pub mod trace_errors;
pub mod usage;

pub use contract::{resolve_contract, ContractResolver, ResolveMode, ResolvedContract};
pub use coverage::{unused_methods, CoverageAudit, CoverageAuditor, UnusedMethods};
pub use error::{AuditError, AuditResult};
pub use registry::{PluginContract, Registry};
pub use settings::AnalyzerSettings;
pub use trace::{Level, Link, MethodDescriptor, MethodId, MethodRecord, OutputItem, Trace};
pub use trace_errors::collect_errors;
pub use usage::{all_used_methods, UsageResolver, UsedMethods};

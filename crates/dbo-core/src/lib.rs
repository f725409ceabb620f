//! Core types for database observability collectors
//!
//! This crate provides the engine-agnostic pieces shared by collectors: errors,
//! configuration, the log entry sink, the metrics interface and the canonical
//! explain plan output.

pub mod config;
pub mod entry;
pub mod error;
pub mod explain;
pub mod metrics;
pub mod redact;

// Re-exports
pub use config::{DboConfig, LogSinkConfig, QueryHashConfig, SchemaDetailsConfig};
pub use entry::{EntryHandler, LogEntry, LogLevel, build_log_entry};
pub use error::{Error, Result};
pub use explain::{
    ExplainPlanAccessType, ExplainPlanJoinAlgorithm, ExplainPlanMetadataInfo, ExplainPlanNode,
    ExplainPlanNodeDetails, ExplainPlanOutput, ExplainProcessingResult,
    extract_explain_plan_output,
};
pub use metrics::{Collector, GaugeSample};
pub use redact::redact_sql;

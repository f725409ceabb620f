//! # DBO Telemetry
//!
//! Process-level tracing setup and span helpers for the collectors. Spans
//! carry the collector and database being crawled so a slow pass can be
//! attributed to one database.

mod spans;
mod tracer;

pub use spans::{crawl_pass_span, record_pass_outcome};
pub use tracer::{DEFAULT_LOG_FILTER, init_telemetry, log_filter, register_span_processor, tracer_provider};

/// Span attribute names
pub mod attributes {
    pub const DBO_COLLECTOR: &str = "dbo.collector";
    pub const DBO_DATABASE: &str = "dbo.database";
    pub const DBO_TABLES_DISCOVERED: &str = "dbo.tables_discovered";
    pub const DBO_TABLES_FAILED: &str = "dbo.tables_failed";

    // Tracer name registered with the provider
    pub const SYSTEM_NAME: &str = "dbo.postgres";
}

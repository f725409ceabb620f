//! PostgreSQL introspection for database observability
//!
//! Schema crawling, table existence tracking, explain plan normalization and
//! the query hash registry, over a pluggable catalog connection.

pub mod connection;
pub mod dsn;
pub mod explain_plan;
pub mod query_hash;
pub mod schema_details;
pub mod table_registry;
pub mod types;

// Re-exports
pub use connection::{
    CatalogConnection, ColumnRow, ConnectionFactory, ForeignKeyRow, IndexRow,
    PgCatalogConnection, PgConnectionFactory,
};
pub use dsn::{instance_key, parse_connection_string, replace_database_name};
pub use explain_plan::{
    PgExplainPlan, PlanNode, explain_plan_log_entry, new_explain_plan_output,
    parse_engine_version,
};
pub use query_hash::{
    QUERY_HASH_INFO_METRIC, QueryHashInfo, QueryHashMetricsCollector, QueryHashRegistry,
};
pub use schema_details::{SCHEMA_DETAILS_COLLECTOR, SchemaDetails, SchemaDetailsArguments};
pub use table_registry::TableRegistry;
pub use types::{ColumnSpec, ForeignKey, IndexSpec, TableInfo, TableSpec};

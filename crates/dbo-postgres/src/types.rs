//! Table data model produced by the schema crawler

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use dbo_core::Result;
use serde::{Deserialize, Serialize};

/// One discovered table instance
#[derive(Debug, Clone, PartialEq)]
pub struct TableInfo {
    pub database: String,
    pub schema: String,
    pub table_name: String,
    pub update_time: DateTime<Utc>,
    /// base64 of the JSON-encoded [`TableSpec`]; empty until the definition is fetched
    pub b64_table_spec: String,
}

impl TableInfo {
    pub fn new(
        database: impl Into<String>,
        schema: impl Into<String>,
        table_name: impl Into<String>,
    ) -> Self {
        Self {
            database: database.into(),
            schema: schema.into(),
            table_name: table_name.into(),
            update_time: Utc::now(),
            b64_table_spec: String::new(),
        }
    }

    /// Key of the table definition cache: `database.schema.table`
    pub fn cache_key(&self) -> String {
        format!("{}.{}.{}", self.database, self.schema, self.table_name)
    }
}

/// Structural definition of a table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableSpec {
    pub columns: Vec<ColumnSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<IndexSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub foreign_keys: Vec<ForeignKey>,
}

impl TableSpec {
    /// JSON then base64, safe to embed in a quoted logfmt value
    pub fn encode(&self) -> Result<String> {
        let json = serde_json::to_vec(self)?;
        Ok(STANDARD.encode(json))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub not_null: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub auto_increment: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub primary_key: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub default_value: String,
}

/// An index whose key slots are either plain columns or expressions.
///
/// `columns` and `expressions` each keep key-position order; a slot appears in
/// exactly one of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub index_type: String,
    pub columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub expressions: Vec<String>,
    pub unique: bool,
    pub nullable: bool,
}

/// One (constraint, position) pair of a foreign key
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub name: String,
    pub column_name: String,
    pub referenced_table_name: String,
    pub referenced_column_name: String,
}

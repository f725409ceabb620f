//! Source of truth for which tables exist
//!
//! Table names parsed out of query text are checked against this registry
//! before they are reported, so that aliases and CTE names do not show up as
//! tables.

use crate::types::TableInfo;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

/// database -> schema -> tables
type TableTree = HashMap<String, HashMap<String, HashSet<String>>>;

#[derive(Debug, Default)]
pub struct TableRegistry {
    tables: RwLock<TableTree>,
}

impl TableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace everything known about `database` with `tables`.
    ///
    /// An empty slice leaves the database absent.
    pub fn set_tables_for_database(&self, database: &str, tables: &[TableInfo]) {
        let mut schemas: HashMap<String, HashSet<String>> = HashMap::new();
        for table in tables {
            schemas
                .entry(table.schema.clone())
                .or_default()
                .insert(table.table_name.clone());
        }

        let mut tree = self.tables.write().unwrap_or_else(|e| e.into_inner());
        tree.remove(database);
        if !schemas.is_empty() {
            tree.insert(database.to_string(), schemas);
        }
    }

    /// Whether `parsed_table_name` exists in `database`.
    ///
    /// `schema.table` must match that exact schema. A bare `table` matches if it
    /// exists in any schema of the database: an unqualified reference cannot
    /// tell which schema the query's search_path resolved it to.
    pub fn is_valid(&self, database: &str, parsed_table_name: &str) -> bool {
        let tree = self.tables.read().unwrap_or_else(|e| e.into_inner());

        let Some(schemas) = tree.get(database) else {
            return false;
        };

        match parse_schema_qualified(parsed_table_name) {
            (Some(schema), table) => schemas
                .get(schema)
                .is_some_and(|tables| tables.contains(table)),
            (None, table) => schemas.values().any(|tables| tables.contains(table)),
        }
    }

    /// Databases that currently have at least one table registered
    pub fn databases(&self) -> Vec<String> {
        let tree = self.tables.read().unwrap_or_else(|e| e.into_inner());
        let mut databases: Vec<String> = tree.keys().cloned().collect();
        databases.sort();
        databases
    }
}

/// Split `schema.table` on the first dot
fn parse_schema_qualified(parsed_table_name: &str) -> (Option<&str>, &str) {
    match parsed_table_name.split_once('.') {
        Some((schema, table)) => (Some(schema), table),
        None => (None, parsed_table_name),
    }
}

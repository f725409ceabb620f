//! Catalog access for the schema crawler
//!
//! The crawler talks to Postgres only through [`CatalogConnection`], and opens
//! per-database connections through a [`ConnectionFactory`], so tests and
//! alternate deployments can substitute either.

use async_trait::async_trait;
use dbo_core::{Error, Result};
use sqlx::{Pool, Postgres, Row, postgres::PgPoolOptions};
use std::sync::Arc;
use std::time::Duration;

const SELECT_ALL_DATABASES: &str = r#"
    SELECT datname::text
    FROM pg_database
    WHERE datistemplate = false
        AND has_database_privilege(datname, 'CONNECT')
"#;

const SELECT_SCHEMA_NAMES: &str = r#"
    SELECT nspname::text AS schema_name
    FROM pg_catalog.pg_namespace
    WHERE nspname NOT IN ('information_schema', 'pg_catalog', 'pg_toast')
        AND nspname NOT LIKE 'pg_temp_%'
        AND nspname NOT LIKE 'pg_toast_%'
"#;

// relkind: ordinary, view, materialized view, foreign, partitioned
const SELECT_TABLE_NAMES: &str = r#"
    SELECT pg_class.relname::text AS table_name
    FROM pg_catalog.pg_class pg_class
    JOIN pg_catalog.pg_namespace pg_namespace ON pg_class.relnamespace = pg_namespace.oid
    WHERE pg_namespace.nspname = $1
        AND pg_class.relkind IN ('r', 'v', 'm', 'f', 'p')
        AND pg_class.relname NOT LIKE 'pg_%'
"#;

const SELECT_COLUMNS: &str = r#"
    SELECT
        attr.attname::text AS column_name,
        attr.atttypid::regtype::text AS column_type,
        attr.attnotnull AS not_nullable,
        pg_catalog.pg_get_expr(def.adbin, def.adrelid) AS column_default,
        attr.attidentity::text AS identity_generation,
        (constraint_pk.contype IS NOT NULL) AS is_primary_key
    FROM pg_attribute attr
    LEFT JOIN pg_catalog.pg_attrdef def
        ON attr.attrelid = def.adrelid AND attr.attnum = def.adnum
    LEFT JOIN pg_catalog.pg_constraint constraint_pk
        ON attr.attrelid = constraint_pk.conrelid
        AND attr.attnum = ANY(constraint_pk.conkey)
        AND constraint_pk.contype = 'p'
    WHERE attr.attrelid = format('%I.%I', $1, $2)::regclass
        AND attr.attnum > 0
        AND NOT attr.attisdropped
    ORDER BY attr.attnum
"#;

// indkey[pos] = 0 marks an expression at that key position
const SELECT_INDEXES: &str = r#"
    SELECT
        index_relations.relname::text AS index_name,
        pg_am.amname::text AS index_type,
        pg_index.indisunique AS is_unique,
        array_agg(pg_attribute.attname::text ORDER BY pos)
            FILTER (WHERE pg_index.indkey[pos] != 0) AS column_names,
        array_agg(pg_get_indexdef(pg_index.indexrelid, pos + 1, true) ORDER BY pos)
            FILTER (WHERE pg_index.indkey[pos] = 0) AS expressions,
        COALESCE(bool_or(NOT pg_attribute.attnotnull), false) AS has_nullable_column
    FROM pg_class table_relations
    JOIN pg_index ON table_relations.oid = pg_index.indrelid
    JOIN pg_class index_relations ON index_relations.oid = pg_index.indexrelid
    JOIN pg_am ON index_relations.relam = pg_am.oid
    JOIN generate_subscripts(pg_index.indkey, 1) AS pos ON true
    LEFT JOIN pg_attribute ON table_relations.oid = pg_attribute.attrelid
        AND pg_attribute.attnum = pg_index.indkey[pos]
        AND NOT pg_attribute.attisdropped
    WHERE table_relations.relname = $2
        AND table_relations.relnamespace = (SELECT oid FROM pg_namespace WHERE nspname = $1)
    GROUP BY index_relations.relname, pg_am.amname, pg_index.indisunique
    ORDER BY index_name
"#;

const SELECT_FOREIGN_KEYS: &str = r#"
    SELECT
        constraints.conname::text AS constraint_name,
        source_column.attname::text AS column_name,
        referenced_table.relname::text AS referenced_table_name,
        referenced_column.attname::text AS referenced_column_name
    FROM pg_constraint constraints
    JOIN pg_class source_table ON constraints.conrelid = source_table.oid
    JOIN pg_namespace schema ON source_table.relnamespace = schema.oid
    JOIN pg_class referenced_table ON constraints.confrelid = referenced_table.oid
    JOIN generate_subscripts(constraints.conkey, 1) AS position ON true
    JOIN pg_attribute source_column ON constraints.conrelid = source_column.attrelid
        AND source_column.attnum = constraints.conkey[position]
        AND NOT source_column.attisdropped
    JOIN pg_attribute referenced_column ON constraints.confrelid = referenced_column.attrelid
        AND referenced_column.attnum = constraints.confkey[position]
        AND NOT referenced_column.attisdropped
    WHERE constraints.contype = 'f'
        AND schema.nspname = $1
        AND source_table.relname = $2
    ORDER BY constraints.conname, position
"#;

/// One row of the column catalog query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnRow {
    pub name: String,
    pub column_type: String,
    pub not_null: bool,
    pub column_default: Option<String>,
    /// `attidentity`: `a` (always), `d` (by default) or empty
    pub identity_generation: String,
    pub is_primary_key: bool,
}

/// One row of the index catalog query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexRow {
    pub name: String,
    pub index_type: String,
    pub unique: bool,
    pub columns: Vec<String>,
    pub expressions: Vec<String>,
    pub has_nullable_column: bool,
}

/// One (constraint, position) row of the foreign key catalog query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForeignKeyRow {
    pub constraint_name: String,
    pub column_name: String,
    pub referenced_table_name: String,
    pub referenced_column_name: String,
}

/// Catalog queries the crawler needs from one database
#[async_trait]
pub trait CatalogConnection: Send + Sync {
    /// Non-template databases the credential can connect to
    async fn databases(&self) -> Result<Vec<String>>;

    /// Non-system schemas
    async fn schemas(&self) -> Result<Vec<String>>;

    /// Application-facing relations of a schema
    async fn tables(&self, schema: &str) -> Result<Vec<String>>;

    async fn columns(&self, schema: &str, table: &str) -> Result<Vec<ColumnRow>>;

    async fn indexes(&self, schema: &str, table: &str) -> Result<Vec<IndexRow>>;

    async fn foreign_keys(&self, schema: &str, table: &str) -> Result<Vec<ForeignKeyRow>>;

    async fn close(&self) -> Result<()>;
}

/// Opens a connection for a per-database DSN
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    async fn connect(&self, dsn: &str) -> Result<Arc<dyn CatalogConnection>>;
}

/// [`CatalogConnection`] backed by a sqlx Postgres pool
#[derive(Clone, Debug)]
pub struct PgCatalogConnection {
    pool: Pool<Postgres>,
}

impl PgCatalogConnection {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }

    async fn fetch_names(
        &self,
        name: &str,
        query: &str,
        schema: Option<&str>,
    ) -> Result<Vec<String>> {
        let mut q = sqlx::query_scalar::<Postgres, String>(query);
        if let Some(schema) = schema {
            q = q.bind(schema.to_string());
        }
        q.fetch_all(&self.pool)
            .await
            .map_err(|e| Error::query_failed(name, e))
    }
}

#[async_trait]
impl CatalogConnection for PgCatalogConnection {
    async fn databases(&self) -> Result<Vec<String>> {
        self.fetch_names("select_all_databases", SELECT_ALL_DATABASES, None)
            .await
    }

    async fn schemas(&self) -> Result<Vec<String>> {
        self.fetch_names("select_schema_names", SELECT_SCHEMA_NAMES, None)
            .await
    }

    async fn tables(&self, schema: &str) -> Result<Vec<String>> {
        self.fetch_names("select_table_names", SELECT_TABLE_NAMES, Some(schema))
            .await
    }

    async fn columns(&self, schema: &str, table: &str) -> Result<Vec<ColumnRow>> {
        let rows = sqlx::query(SELECT_COLUMNS)
            .bind(schema)
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::query_failed("select_columns", e))?;

        rows.iter()
            .map(|row| -> std::result::Result<ColumnRow, sqlx::Error> {
                Ok(ColumnRow {
                    name: row.try_get("column_name")?,
                    column_type: row.try_get("column_type")?,
                    not_null: row.try_get("not_nullable")?,
                    column_default: row.try_get("column_default")?,
                    identity_generation: row.try_get("identity_generation")?,
                    is_primary_key: row.try_get("is_primary_key")?,
                })
            })
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::query_failed("select_columns", e))
    }

    async fn indexes(&self, schema: &str, table: &str) -> Result<Vec<IndexRow>> {
        let rows = sqlx::query(SELECT_INDEXES)
            .bind(schema)
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::query_failed("select_indexes", e))?;

        rows.iter()
            .map(|row| -> std::result::Result<IndexRow, sqlx::Error> {
                // array_agg with a FILTER matching nothing yields NULL
                let columns: Option<Vec<String>> = row.try_get("column_names")?;
                let expressions: Option<Vec<String>> = row.try_get("expressions")?;
                Ok(IndexRow {
                    name: row.try_get("index_name")?,
                    index_type: row.try_get("index_type")?,
                    unique: row.try_get("is_unique")?,
                    columns: columns.unwrap_or_default(),
                    expressions: expressions.unwrap_or_default(),
                    has_nullable_column: row.try_get("has_nullable_column")?,
                })
            })
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::query_failed("select_indexes", e))
    }

    async fn foreign_keys(&self, schema: &str, table: &str) -> Result<Vec<ForeignKeyRow>> {
        let rows = sqlx::query(SELECT_FOREIGN_KEYS)
            .bind(schema)
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::query_failed("select_foreign_keys", e))?;

        rows.iter()
            .map(|row| -> std::result::Result<ForeignKeyRow, sqlx::Error> {
                Ok(ForeignKeyRow {
                    constraint_name: row.try_get("constraint_name")?,
                    column_name: row.try_get("column_name")?,
                    referenced_table_name: row.try_get("referenced_table_name")?,
                    referenced_column_name: row.try_get("referenced_column_name")?,
                })
            })
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::query_failed("select_foreign_keys", e))
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

/// Default factory: a single-connection pool per database
#[derive(Clone, Debug)]
pub struct PgConnectionFactory {
    acquire_timeout: Duration,
}

impl PgConnectionFactory {
    pub fn new(acquire_timeout: Duration) -> Self {
        Self { acquire_timeout }
    }
}

impl Default for PgConnectionFactory {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

#[async_trait]
impl ConnectionFactory for PgConnectionFactory {
    async fn connect(&self, dsn: &str) -> Result<Arc<dyn CatalogConnection>> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(self.acquire_timeout)
            .connect(dsn)
            .await
            .map_err(|e| Error::query_failed("connect", e))?;

        Ok(Arc::new(PgCatalogConnection::new(pool)))
    }
}

/// Whether two handles point at the same connection
pub fn same_connection(a: &Arc<dyn CatalogConnection>, b: &Arc<dyn CatalogConnection>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

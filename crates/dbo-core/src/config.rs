//! Configuration management for database observability collectors
//!
//! Loads configuration from a TOML file. Values of the form `${VAR_NAME}` in
//! `data_source_name` are resolved from the environment.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Collector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DboConfig {
    /// Connection string of the seed database (can reference env var with ${VAR_NAME})
    pub data_source_name: String,

    #[serde(default)]
    pub schema_details: SchemaDetailsConfig,

    #[serde(default)]
    pub query_hash: QueryHashConfig,

    #[serde(default)]
    pub log_sink: LogSinkConfig,
}

/// Schema crawler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDetailsConfig {
    #[serde(default = "default_collect_interval_secs")]
    pub collect_interval_secs: u64,

    #[serde(default = "default_cache_enabled")]
    pub cache_enabled: bool,

    #[serde(default = "default_cache_size")]
    pub cache_size: u64,

    /// No modification timestamp is available from pg_catalog, so this is the
    /// only bound on how stale a cached table definition can get.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

/// Query hash registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryHashConfig {
    #[serde(default = "default_query_hash_capacity")]
    pub capacity: u64,

    #[serde(default = "default_query_hash_ttl_secs")]
    pub ttl_secs: u64,
}

/// Log entry channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSinkConfig {
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for SchemaDetailsConfig {
    fn default() -> Self {
        Self {
            collect_interval_secs: default_collect_interval_secs(),
            cache_enabled: default_cache_enabled(),
            cache_size: default_cache_size(),
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl SchemaDetailsConfig {
    pub fn collect_interval(&self) -> Duration {
        Duration::from_secs(self.collect_interval_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

impl Default for QueryHashConfig {
    fn default() -> Self {
        Self {
            capacity: default_query_hash_capacity(),
            ttl_secs: default_query_hash_ttl_secs(),
        }
    }
}

impl QueryHashConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for LogSinkConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl DboConfig {
    /// Create a configuration with defaults for everything but the DSN
    pub fn new(data_source_name: impl Into<String>) -> Self {
        Self {
            data_source_name: data_source_name.into(),
            schema_details: SchemaDetailsConfig::default(),
            query_hash: QueryHashConfig::default(),
            log_sink: LogSinkConfig::default(),
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        tracing::debug!("Loading configuration from: {:?}", path);

        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse configuration from TOML text, resolve env references and validate
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let mut config: DboConfig = toml::from_str(contents)
            .map_err(|e| Error::config_error(format!("Failed to parse config: {}", e)))?;

        config.resolve_env_vars();
        config.validate()?;

        Ok(config)
    }

    /// Resolve ${VAR_NAME} references to environment variables
    fn resolve_env_vars(&mut self) {
        if let Some(resolved) = Self::resolve_env_var(&self.data_source_name) {
            self.data_source_name = resolved;
        }
    }

    /// Resolve a single ${VAR_NAME} reference
    fn resolve_env_var(value: &str) -> Option<String> {
        if value.starts_with("${") && value.ends_with('}') {
            let var_name = &value[2..value.len() - 1];
            env::var(var_name).ok()
        } else {
            Some(value.to_string())
        }
    }

    /// Reject values the collectors cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.data_source_name.trim().is_empty() {
            return Err(Error::config_error("data_source_name must not be empty"));
        }
        if self.schema_details.collect_interval_secs == 0 {
            return Err(Error::config_error(
                "schema_details.collect_interval_secs must be greater than zero",
            ));
        }
        if self.schema_details.cache_enabled {
            if self.schema_details.cache_size == 0 {
                return Err(Error::config_error(
                    "schema_details.cache_size must be greater than zero when the cache is enabled",
                ));
            }
            if self.schema_details.cache_ttl_secs == 0 {
                return Err(Error::config_error(
                    "schema_details.cache_ttl_secs must be greater than zero when the cache is enabled",
                ));
            }
        }
        if self.query_hash.capacity == 0 || self.query_hash.ttl_secs == 0 {
            return Err(Error::config_error(
                "query_hash.capacity and query_hash.ttl_secs must be greater than zero",
            ));
        }
        if self.log_sink.channel_capacity == 0 {
            return Err(Error::config_error(
                "log_sink.channel_capacity must be greater than zero",
            ));
        }
        Ok(())
    }
}

fn default_collect_interval_secs() -> u64 {
    60
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_size() -> u64 {
    256
}

fn default_cache_ttl_secs() -> u64 {
    600
}

fn default_query_hash_capacity() -> u64 {
    1000
}

fn default_query_hash_ttl_secs() -> u64 {
    3600
}

fn default_channel_capacity() -> usize {
    1024
}

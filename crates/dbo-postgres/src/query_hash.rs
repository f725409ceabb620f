//! Query id → fingerprint registry
//!
//! Query sample collectors record the fingerprint of every query they see;
//! the metrics collector below exports the mapping so query ids from
//! `pg_stat_statements` can be joined with fingerprints downstream.

use chrono::{DateTime, Utc};
use dbo_core::{Collector, GaugeSample};
use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub const QUERY_HASH_INFO_METRIC: &str = "database_observability_query_hash_info";

#[derive(Debug, Clone, PartialEq)]
pub struct QueryHashInfo {
    pub query_hash: String,
    pub database_name: String,
    pub last_seen: DateTime<Utc>,
}

/// Bounded by both capacity (least recently used goes first) and TTL since
/// the last `set`. Safe to share between any number of writers and readers.
#[derive(Clone)]
pub struct QueryHashRegistry {
    cache: Cache<String, QueryHashInfo>,
}

impl QueryHashRegistry {
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .eviction_policy(EvictionPolicy::lru())
            .build();

        Self { cache }
    }

    /// Insert or overwrite the mapping for `query_id`, refreshing its TTL and recency
    pub fn set(&self, query_id: &str, query_hash: &str, database_name: &str) {
        self.cache.insert(
            query_id.to_string(),
            QueryHashInfo {
                query_hash: query_hash.to_string(),
                database_name: database_name.to_string(),
                last_seen: Utc::now(),
            },
        );
        // moka evicts lazily; settle capacity now so `get` never sees an
        // entry that is already over the bound
        self.cache.run_pending_tasks();
    }

    pub fn get(&self, query_id: &str) -> Option<QueryHashInfo> {
        self.cache.get(query_id)
    }

    /// Snapshot of every live mapping. The copy is detached from the registry.
    pub fn get_all(&self) -> HashMap<String, QueryHashInfo> {
        // apply pending evictions so the snapshot respects capacity
        self.cache.run_pending_tasks();

        self.cache
            .iter()
            .map(|(query_id, info)| (query_id.as_ref().clone(), info))
            .collect()
    }
}

/// Exports one presence gauge per known mapping
pub struct QueryHashMetricsCollector {
    registry: Arc<QueryHashRegistry>,
    server_id: String,
}

impl QueryHashMetricsCollector {
    pub fn new(registry: Arc<QueryHashRegistry>, server_id: impl Into<String>) -> Self {
        Self {
            registry,
            server_id: server_id.into(),
        }
    }
}

impl Collector for QueryHashMetricsCollector {
    fn collect(&self) -> Vec<GaugeSample> {
        self.registry
            .get_all()
            .into_iter()
            .map(|(query_id, info)| {
                GaugeSample::new(
                    QUERY_HASH_INFO_METRIC,
                    "Mapping of query id to query fingerprint, value is always 1",
                    1.0,
                )
                .label("queryid", query_id)
                .label("query_hash", info.query_hash)
                .label("server_id", self.server_id.as_str())
                .label("datname", info.database_name)
            })
            .collect()
    }
}

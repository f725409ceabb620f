//! Normalizes `EXPLAIN (FORMAT JSON)` output into the engine-agnostic plan tree

use dbo_core::entry::OP_EXPLAIN_PLAN_OUTPUT;
use dbo_core::{
    Error, ExplainPlanJoinAlgorithm, ExplainPlanMetadataInfo, ExplainPlanNode,
    ExplainPlanNodeDetails, ExplainPlanOutput, ExplainProcessingResult, LogEntry, LogLevel,
    Result, build_log_entry, redact_sql,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

pub const DATABASE_ENGINE: &str = "PostgreSQL";

// `PostgreSQL 16.2 (Debian ...) on x86_64...`, `16.2`, `17beta1`
static ENGINE_VERSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:PostgreSQL\s+)?(?P<major>\d+)(?:\.(?P<minor>\d+))?")
        .expect("valid engine version pattern")
});

/// Top-level element of the `EXPLAIN (FORMAT JSON)` array
#[derive(Debug, Clone, Deserialize)]
pub struct PgExplainPlan {
    #[serde(rename = "Plan")]
    pub plan: PlanNode,
}

/// A node as Postgres reports it. Fields the normalizer does not read are
/// kept so that a decoded plan can be inspected in full.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlanNode {
    #[serde(rename = "Node Type")]
    pub node_type: String,
    #[serde(rename = "Alias")]
    pub alias: String,
    #[serde(rename = "Relation Name")]
    pub relation_name: String,
    #[serde(rename = "Parent Relationship")]
    pub parent_relationship: String,
    #[serde(rename = "Partial Mode")]
    pub partial_mode: String,
    #[serde(rename = "Strategy")]
    pub strategy: String,
    #[serde(rename = "Parallel Aware")]
    pub parallel_aware: bool,
    #[serde(rename = "Async Capable")]
    pub async_capable: bool,
    #[serde(rename = "Join Type")]
    pub join_type: String,
    #[serde(rename = "Inner Unique")]
    pub inner_unique: bool,
    #[serde(rename = "Hash Cond")]
    pub hash_cond: String,
    #[serde(rename = "Filter")]
    pub filter: String,
    #[serde(rename = "Startup Cost")]
    pub startup_cost: f64,
    #[serde(rename = "Total Cost")]
    pub total_cost: f64,
    #[serde(rename = "Plan Rows")]
    pub plan_rows: i64,
    #[serde(rename = "Plan Width")]
    pub plan_width: i64,
    #[serde(rename = "Group Key")]
    pub group_key: Vec<String>,
    #[serde(rename = "Sort Key")]
    pub sort_key: Vec<String>,
    #[serde(rename = "Workers Planned")]
    pub workers_planned: i64,
    #[serde(rename = "Planned Partitions")]
    pub planned_partitions: i64,
    #[serde(rename = "Plans")]
    pub plans: Vec<PlanNode>,
    #[serde(rename = "Index Name")]
    pub index_name: String,
}

/// Build the canonical output from raw explain JSON. Only the first plan of
/// the array is used.
pub fn new_explain_plan_output(
    db_version: &str,
    query_id: &str,
    explain_json: &[u8],
    generated_at: &str,
) -> Result<ExplainPlanOutput> {
    let plans: Vec<PgExplainPlan> = serde_json::from_slice(explain_json).map_err(|e| {
        Error::explain_plan_error(format!("failed to decode explain plan JSON: {}", e))
    })?;

    let first = plans
        .first()
        .ok_or_else(|| Error::explain_plan_error("explain plan JSON contains no plans"))?;

    Ok(ExplainPlanOutput {
        metadata: ExplainPlanMetadataInfo {
            database_engine: DATABASE_ENGINE.to_string(),
            database_version: db_version.to_string(),
            query_identifier: query_id.to_string(),
            generated_at: generated_at.to_string(),
            processing_result: ExplainProcessingResult::Success,
            processing_result_reason: String::new(),
        },
        plan: first.plan.to_output_node()?,
    })
}

impl PlanNode {
    pub fn to_output_node(&self) -> Result<ExplainPlanNode> {
        let mut details = ExplainPlanNodeDetails {
            estimated_rows: self.plan_rows,
            estimated_cost: Some(self.exclusive_cost()),
            ..Default::default()
        };

        if !self.group_key.is_empty() {
            details.group_by_keys = Some(self.group_key.clone());
        }
        if !self.sort_key.is_empty() {
            details.sort_keys = Some(self.sort_key.clone());
        }
        details.join_type = non_empty(&self.join_type);
        details.condition = non_empty(&self.filter).map(|filter| redact_sql(&filter));
        details.alias = non_empty(&self.alias);
        details.key_used = non_empty(&self.index_name);

        // Merge and nested loop joins are left untagged
        if self.node_type.eq_ignore_ascii_case("Hash Join") {
            details.join_algorithm = Some(ExplainPlanJoinAlgorithm::Hash);
        }

        let children = self
            .plans
            .iter()
            .map(PlanNode::to_output_node)
            .collect::<Result<Vec<_>>>()?;

        Ok(ExplainPlanNode {
            operation: self.operation(),
            details,
            children,
        })
    }

    /// `[partial mode] [strategy] [Parallel] <node type>`
    pub fn operation(&self) -> String {
        let mut label = String::new();

        if !self.partial_mode.is_empty() {
            label.push_str(&self.partial_mode);
            label.push(' ');
        }

        match self.strategy.as_str() {
            "" | "Plain" => {}
            "Sorted" => label.push_str("Group "),
            other => {
                label.push_str(other);
                label.push(' ');
            }
        }

        if self.parallel_aware {
            label.push_str("Parallel ");
        }

        label.push_str(&self.node_type);
        label
    }

    /// Own total cost minus the children's, rounded to cents, never negative
    pub fn exclusive_cost(&self) -> f64 {
        let children: f64 = self.plans.iter().map(|child| child.total_cost).sum();
        let cost = ((self.total_cost - children) * 100.0).round() / 100.0;
        cost.max(0.0)
    }
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

/// `major.minor` of a `SELECT version()` or `SHOW server_version` string
pub fn parse_engine_version(text: &str) -> Result<String> {
    let captures = ENGINE_VERSION_RE
        .captures(text)
        .ok_or_else(|| Error::message(format!("unrecognized server version: {:?}", text)))?;

    let major = captures.name("major").map_or("0", |m| m.as_str());
    let minor = captures.name("minor").map_or("0", |m| m.as_str());
    Ok(format!("{}.{}", major, minor))
}

/// `explain_plan_output` entry carrying the encoded output for one query
pub fn explain_plan_log_entry(
    database: &str,
    query_id: &str,
    output: &ExplainPlanOutput,
) -> Result<LogEntry> {
    Ok(build_log_entry(
        LogLevel::Info,
        OP_EXPLAIN_PLAN_OUTPUT,
        format!(
            r#"schema="{}" digest="{}" explain_plan_output="{}""#,
            database,
            query_id,
            output.encode()?
        ),
    ))
}

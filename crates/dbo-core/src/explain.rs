//! Engine-agnostic explain plan output
//!
//! Every engine-specific normalizer produces this tree. Optional details are
//! `None` when the engine reported nothing, and are then left out of the JSON.

use crate::{Error, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplainPlanJoinAlgorithm {
    Hash,
    Merge,
    NestedLoop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplainPlanAccessType {
    All,
    Index,
    Range,
    Ref,
    EqRef,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExplainProcessingResult {
    #[default]
    Success,
    Error,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplainPlanOutput {
    pub metadata: ExplainPlanMetadataInfo,
    pub plan: ExplainPlanNode,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplainPlanMetadataInfo {
    pub database_engine: String,
    pub database_version: String,
    pub query_identifier: String,
    pub generated_at: String,
    #[serde(default)]
    pub processing_result: ExplainProcessingResult,
    #[serde(default)]
    pub processing_result_reason: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExplainPlanNode {
    pub operation: String,
    pub details: ExplainPlanNodeDetails,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ExplainPlanNode>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplainPlanNodeDetails {
    pub estimated_rows: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_type: Option<ExplainPlanAccessType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_used: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_algorithm: Option<ExplainPlanJoinAlgorithm>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by_keys: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_keys: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl ExplainPlanOutput {
    /// JSON-encode and base64 the output so it survives a logfmt line
    pub fn encode(&self) -> Result<String> {
        let json = serde_json::to_vec(self)?;
        Ok(STANDARD.encode(json))
    }
}

/// Decode the `explain_plan_output` field of a logfmt line back into an output
pub fn extract_explain_plan_output(line: &str) -> Result<ExplainPlanOutput> {
    let encoded = logfmt_value(line, "explain_plan_output").ok_or_else(|| {
        Error::explain_plan_error("explain_plan_output field not found in log line")
    })?;

    let decoded = STANDARD.decode(encoded).map_err(|e| {
        Error::explain_plan_error(format!("failed to decode base64 explain plan output: {}", e))
    })?;

    serde_json::from_slice(&decoded).map_err(|e| {
        Error::explain_plan_error(format!("failed to unmarshal explain plan output: {}", e))
    })
}

/// Value of `key` in a `key="value" key2=value2` line
fn logfmt_value<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let mut rest = line;
    while let Some(eq) = rest.find('=') {
        let name = rest[..eq].trim();
        let after = &rest[eq + 1..];
        let (value, remainder) = match after.strip_prefix('"') {
            Some(quoted) => {
                let end = quoted.find('"')?;
                (&quoted[..end], &quoted[end + 1..])
            }
            None => {
                let end = after.find(char::is_whitespace).unwrap_or(after.len());
                (&after[..end], &after[end..])
            }
        };
        if name == key {
            return Some(value);
        }
        rest = remainder;
    }
    None
}

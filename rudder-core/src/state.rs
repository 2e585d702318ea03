//! Agent state snapshot consumed by the synthesis core.
//!
//! The agent-orchestration loop owns and produces this state; everything in
//! this crate only reads it. Payloads stay as `serde_json::Value` because each
//! specialist agent emits its own deeply nested shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Execution status of a specialist agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Success,
    Failed,
    Pending,
}

/// Agent id → status. Ordered so every derived list is deterministic.
pub type AgentSuccessMap = BTreeMap<String, AgentStatus>;

/// Field names of the well-known agent payloads.
pub mod fields {
    pub const ROUTE_DATA: &str = "route_data";
    pub const BUNKER_ANALYSIS: &str = "bunker_analysis";
    pub const WEATHER_FORECAST: &str = "weather_forecast";
    pub const WEATHER_CONSUMPTION: &str = "weather_consumption";
    pub const ROB_SAFETY_STATUS: &str = "rob_safety_status";
    pub const COMPLIANCE_DATA: &str = "compliance_data";
    pub const HULL_PERFORMANCE: &str = "hull_performance";
    pub const CII_RATING: &str = "cii_rating";
    pub const VESSEL_COMPARISON: &str = "vessel_comparison";
}

/// Snapshot of the conversation's agent results for one user turn.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentState {
    #[serde(default)]
    pub agent_status: AgentSuccessMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bunker_analysis: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather_forecast: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather_consumption: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rob_safety_status: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compliance_data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hull_performance: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cii_rating: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vessel_comparison: Option<Value>,
    /// Payloads from agents without a dedicated slot.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl AgentState {
    /// Look up a payload by field name, including `extra` entries.
    pub fn field(&self, name: &str) -> Option<&Value> {
        let slot = match name {
            fields::ROUTE_DATA => self.route_data.as_ref(),
            fields::BUNKER_ANALYSIS => self.bunker_analysis.as_ref(),
            fields::WEATHER_FORECAST => self.weather_forecast.as_ref(),
            fields::WEATHER_CONSUMPTION => self.weather_consumption.as_ref(),
            fields::ROB_SAFETY_STATUS => self.rob_safety_status.as_ref(),
            fields::COMPLIANCE_DATA => self.compliance_data.as_ref(),
            fields::HULL_PERFORMANCE => self.hull_performance.as_ref(),
            fields::CII_RATING => self.cii_rating.as_ref(),
            fields::VESSEL_COMPARISON => self.vessel_comparison.as_ref(),
            other => self.extra.get(other),
        };
        slot.filter(|v| is_populated(v))
    }

    /// Whether a payload is present and non-empty.
    pub fn has(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Agents whose status is `success`, in sorted order.
    pub fn successful_agents(&self) -> Vec<String> {
        self.agent_status
            .iter()
            .filter(|(_, status)| **status == AgentStatus::Success)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Number of entries in the bunker recommendation list.
    pub fn bunker_recommendation_count(&self) -> usize {
        self.field(fields::BUNKER_ANALYSIS)
            .and_then(|b| b.get("recommendations"))
            .and_then(Value::as_array)
            .map_or(0, Vec::len)
    }

    /// Number of weather forecast points, whether stored as a bare array or
    /// under a `forecast` key.
    pub fn weather_point_count(&self) -> usize {
        match self.field(fields::WEATHER_FORECAST) {
            Some(Value::Array(points)) => points.len(),
            Some(other) => other
                .get("forecast")
                .and_then(Value::as_array)
                .map_or(0, Vec::len),
            None => 0,
        }
    }

    /// True when the ROB check explicitly reports the voyage as unsafe.
    pub fn is_rob_unsafe(&self) -> bool {
        self.field(fields::ROB_SAFETY_STATUS)
            .and_then(|rob| rob.get("overall_safe"))
            .and_then(Value::as_bool)
            == Some(false)
    }
}

/// A payload counts as populated unless it is null or an empty string/array/object.
pub fn is_populated(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

/// State fields produced by each known agent.
const AGENT_FIELDS: &[(&str, &[&str])] = &[
    ("route_agent", &[fields::ROUTE_DATA]),
    (
        "weather_agent",
        &[fields::WEATHER_FORECAST, fields::WEATHER_CONSUMPTION],
    ),
    ("bunker_agent", &[fields::BUNKER_ANALYSIS]),
    ("rob_agent", &[fields::ROB_SAFETY_STATUS]),
    ("compliance_agent", &[fields::COMPLIANCE_DATA]),
    ("hull_agent", &[fields::HULL_PERFORMANCE]),
    ("cii_agent", &[fields::CII_RATING]),
    ("vessel_selection_agent", &[fields::VESSEL_COMPARISON]),
];

/// Map an agent list onto the state fields the compressor should read.
///
/// Unknown agents map to an `extra` key named after the agent without its
/// `_agent` suffix (`eu_ets_agent` → `eu_ets`). Order follows `agents`,
/// duplicates are dropped.
pub fn fields_for_agents(agents: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for agent in agents {
        let known = AGENT_FIELDS
            .iter()
            .find(|(id, _)| *id == agent.as_str())
            .map(|(_, fields)| fields.iter().map(|f| f.to_string()).collect::<Vec<_>>());
        let produced = known.unwrap_or_else(|| {
            vec![agent.strip_suffix("_agent").unwrap_or(agent).to_string()]
        });
        for field in produced {
            if !out.contains(&field) {
                out.push(field);
            }
        }
    }
    out
}

//! Output contract of a synthesis pass.
//!
//! `SynthesizedInsights` is what the rendering layer consumes. The response
//! is a sum type, so a result always carries exactly one response variant and
//! that variant determines the `query_type` on the wire:
//!
//! ```json
//! { "query_type": "decision-required", "response": { "decision": { ... } }, ... }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Query types a synthesis response may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResponseQueryType {
    #[serde(rename = "informational")]
    Informational,
    #[serde(rename = "decision-required")]
    DecisionRequired,
    #[serde(rename = "validation")]
    Validation,
    #[serde(rename = "comparison")]
    Comparison,
}

impl ResponseQueryType {
    pub const ALL: [ResponseQueryType; 4] = [
        ResponseQueryType::Informational,
        ResponseQueryType::DecisionRequired,
        ResponseQueryType::Validation,
        ResponseQueryType::Comparison,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseQueryType::Informational => "informational",
            ResponseQueryType::DecisionRequired => "decision-required",
            ResponseQueryType::Validation => "validation",
            ResponseQueryType::Comparison => "comparison",
        }
    }

    /// Key of the response object for this query type.
    pub fn response_key(&self) -> &'static str {
        match self {
            ResponseQueryType::DecisionRequired => "decision",
            other => other.as_str(),
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == value)
    }
}

impl fmt::Display for ResponseQueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated synthesis result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesizedInsights {
    #[serde(flatten)]
    pub response: InsightResponse,
    #[serde(default)]
    pub strategic_priorities: Vec<StrategicPriority>,
    #[serde(default)]
    pub critical_risks: Vec<CriticalRisk>,
    #[serde(default)]
    pub details_to_surface: DetailsToSurface,
    #[serde(default)]
    pub cross_agent_connections: Vec<String>,
    #[serde(default)]
    pub hidden_opportunities: Vec<String>,
    pub synthesis_metadata: SynthesisMetadata,
}

impl SynthesizedInsights {
    pub fn query_type(&self) -> ResponseQueryType {
        self.response.query_type()
    }
}

/// The one response variant, keyed by query type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "query_type", content = "response")]
pub enum InsightResponse {
    #[serde(rename = "informational")]
    Informational { informational: InformationalResponse },
    #[serde(rename = "decision-required")]
    Decision { decision: DecisionResponse },
    #[serde(rename = "validation")]
    Validation { validation: ValidationResponse },
    #[serde(rename = "comparison")]
    Comparison { comparison: ComparisonResponse },
}

impl InsightResponse {
    pub fn query_type(&self) -> ResponseQueryType {
        match self {
            InsightResponse::Informational { .. } => ResponseQueryType::Informational,
            InsightResponse::Decision { .. } => ResponseQueryType::DecisionRequired,
            InsightResponse::Validation { .. } => ResponseQueryType::Validation,
            InsightResponse::Comparison { .. } => ResponseQueryType::Comparison,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InformationalResponse {
    pub answer: String,
    #[serde(default)]
    pub key_facts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_context: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionResponse {
    pub action: String,
    pub primary_metric: String,
    #[serde(default)]
    pub risk_level: RiskLevel,
    /// Model confidence in the recommended action, 0-100.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResponse {
    pub result: Feasibility,
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consequence: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternative: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResponse {
    pub winner: String,
    pub winner_reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runner_up: Option<String>,
    #[serde(default)]
    pub comparison_factors: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Safe,
    #[default]
    Caution,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feasibility {
    Feasible,
    NotFeasible,
    Risky,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Immediate,
    Today,
    #[default]
    ThisWeek,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    #[default]
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategicPriority {
    pub priority: u32,
    pub action: String,
    #[serde(default)]
    pub why: String,
    #[serde(default)]
    pub impact: String,
    #[serde(default)]
    pub urgency: Urgency,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticalRisk {
    pub risk: String,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub consequence: String,
    #[serde(default)]
    pub mitigation: String,
}

/// Which detail panels the UI should expand. The only render contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DetailsToSurface {
    #[serde(default)]
    pub show_multi_port_analysis: bool,
    #[serde(default)]
    pub show_alternatives: bool,
    #[serde(default)]
    pub show_rob_waypoints: bool,
    #[serde(default)]
    pub show_weather_details: bool,
    #[serde(default)]
    pub show_eca_details: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisMetadata {
    pub agents_analyzed: Vec<String>,
    pub synthesis_model: String,
    pub synthesis_timestamp: DateTime<Utc>,
    /// 0.0-1.0.
    pub confidence_score: f64,
    #[serde(default)]
    pub filtering_rationale: FilteringRationale,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilteringRationale {
    #[serde(default)]
    pub why_surfaced: Vec<String>,
    #[serde(default)]
    pub why_hidden: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> SynthesizedInsights {
        SynthesizedInsights {
            response: InsightResponse::Decision {
                decision: DecisionResponse {
                    action: "Bunker 1,200 MT VLSFO at Colombo".into(),
                    primary_metric: "$18,500 saved vs Singapore".into(),
                    risk_level: RiskLevel::Safe,
                    confidence: Some(86),
                },
            },
            strategic_priorities: vec![StrategicPriority {
                priority: 1,
                action: "Confirm Colombo stem by Thursday".into(),
                why: "Supplier availability is tight".into(),
                impact: "Locks in the price spread".into(),
                urgency: Urgency::Today,
            }],
            critical_risks: Vec::new(),
            details_to_surface: DetailsToSurface {
                show_multi_port_analysis: true,
                ..Default::default()
            },
            cross_agent_connections: vec!["Weather adds 6% burn before Colombo".into()],
            hidden_opportunities: Vec::new(),
            synthesis_metadata: SynthesisMetadata {
                agents_analyzed: vec!["bunker_agent".into(), "route_agent".into()],
                synthesis_model: "claude-haiku-4-5".into(),
                synthesis_timestamp: Utc::now(),
                confidence_score: 0.8,
                filtering_rationale: FilteringRationale::default(),
            },
        }
    }

    #[test]
    fn test_response_key_mapping() {
        assert_eq!(ResponseQueryType::DecisionRequired.response_key(), "decision");
        assert_eq!(ResponseQueryType::Comparison.response_key(), "comparison");
        assert_eq!(
            ResponseQueryType::parse("decision-required"),
            Some(ResponseQueryType::DecisionRequired)
        );
        assert_eq!(ResponseQueryType::parse("route-only"), None);
    }

    #[test]
    fn test_wire_shape() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["query_type"], "decision-required");
        assert_eq!(value["response"]["decision"]["risk_level"], "safe");
        assert_eq!(value["strategic_priorities"][0]["urgency"], "today");
        assert_eq!(value["details_to_surface"]["show_multi_port_analysis"], true);
        assert_eq!(value["synthesis_metadata"]["synthesis_model"], "claude-haiku-4-5");
    }

    #[test]
    fn test_deserializes_from_wire_shape() {
        let original = sample();
        let value = serde_json::to_value(&original).unwrap();
        let parsed: SynthesizedInsights = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, original);
        assert_eq!(parsed.query_type(), ResponseQueryType::DecisionRequired);
    }

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(serde_json::to_value(Feasibility::NotFeasible).unwrap(), json!("not_feasible"));
        assert_eq!(serde_json::to_value(Urgency::ThisWeek).unwrap(), json!("this_week"));
        assert_eq!(RiskLevel::default(), RiskLevel::Caution);
        assert_eq!(Severity::default(), Severity::High);
    }
}

//! Validation of untrusted synthesis replies.
//!
//! The model's text is parsed, migrated, and checked against the response
//! contract. Required fields are enforced strictly. Optional enrichments that
//! are missing or malformed are defaulted instead of failing the whole reply.

use crate::error::ValidationError;
use crate::synthesis::migration::{SchemaAdapter, apply_adapters, default_adapters};
use crate::synthesis::schema::{
    ComparisonResponse, CriticalRisk, DecisionResponse, DetailsToSurface, Feasibility,
    FilteringRationale, InformationalResponse, InsightResponse, ResponseQueryType, RiskLevel,
    Severity, StrategicPriority, SynthesisMetadata, SynthesizedInsights, Urgency,
    ValidationResponse,
};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Confidence assumed when the model does not report one.
pub const DEFAULT_CONFIDENCE: f64 = 0.7;

/// Parses and checks synthesis replies for one model.
pub struct ResponseValidator {
    model: String,
    adapters: Vec<Box<dyn SchemaAdapter>>,
}

impl ResponseValidator {
    /// `model` is stamped into every result's metadata.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            adapters: default_adapters(),
        }
    }

    /// Replace the schema adapter list.
    pub fn with_adapters(mut self, adapters: Vec<Box<dyn SchemaAdapter>>) -> Self {
        self.adapters = adapters;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Validate a raw model reply into `SynthesizedInsights`.
    pub fn validate(
        &self,
        raw: &str,
        agent_list: &[String],
    ) -> Result<SynthesizedInsights, ValidationError> {
        let text = strip_fence(raw);
        let parsed: Value = serde_json::from_str(text).map_err(|e| ValidationError::Parse {
            message: e.to_string(),
        })?;
        let Value::Object(mut root) = parsed else {
            return Err(ValidationError::NotAnObject);
        };

        apply_adapters(&self.adapters, &mut root);

        let query_type = parse_query_type(&root)?;
        let key = query_type.response_key();
        let body = root
            .get("response")
            .and_then(|r| r.get(key))
            .and_then(Value::as_object)
            .filter(|body| !body.is_empty())
            .ok_or_else(|| ValidationError::MissingResponse {
                query_type: query_type.to_string(),
                key: key.to_string(),
            })?;

        let response = build_response(query_type, body)?;

        Ok(SynthesizedInsights {
            response,
            strategic_priorities: priorities(root.get("strategic_priorities")),
            critical_risks: risks(root.get("critical_risks")),
            details_to_surface: details(root.get("details_to_surface")),
            cross_agent_connections: string_list(root.get("cross_agent_connections")),
            hidden_opportunities: string_list(root.get("hidden_opportunities")),
            synthesis_metadata: self.metadata(&root, agent_list),
        })
    }

    /// Metadata is always stamped fresh; only the model's confidence and
    /// filtering rationale are carried over.
    fn metadata(&self, root: &Map<String, Value>, agent_list: &[String]) -> SynthesisMetadata {
        let reported = root.get("synthesis_metadata");
        let confidence_score = reported
            .and_then(|m| m.get("confidence_score"))
            .or_else(|| root.get("confidence_score"))
            .and_then(Value::as_f64)
            .map_or(DEFAULT_CONFIDENCE, |score| score.clamp(0.0, 1.0));
        let rationale = reported.and_then(|m| m.get("filtering_rationale"));

        SynthesisMetadata {
            agents_analyzed: agent_list.to_vec(),
            synthesis_model: self.model.clone(),
            synthesis_timestamp: Utc::now(),
            confidence_score,
            filtering_rationale: FilteringRationale {
                why_surfaced: string_list(rationale.and_then(|r| r.get("why_surfaced"))),
                why_hidden: string_list(rationale.and_then(|r| r.get("why_hidden"))),
            },
        }
    }
}

/// Remove a surrounding markdown code fence, if any.
fn strip_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(after_open) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (```json) on the opening line, or glued to a
    // single-line fence.
    let body = match after_open.find('\n') {
        Some(newline) => &after_open[newline + 1..],
        None => {
            let rest = after_open.trim_start();
            rest.strip_prefix("json")
                .or_else(|| rest.strip_prefix("JSON"))
                .unwrap_or(rest)
        }
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

fn parse_query_type(root: &Map<String, Value>) -> Result<ResponseQueryType, ValidationError> {
    match root.get("query_type") {
        Some(Value::String(s)) => {
            ResponseQueryType::parse(s.trim()).ok_or_else(|| ValidationError::InvalidQueryType {
                found: s.clone(),
            })
        }
        Some(other) => Err(ValidationError::InvalidQueryType {
            found: other.to_string(),
        }),
        None => Err(ValidationError::InvalidQueryType {
            found: "<missing>".to_string(),
        }),
    }
}

fn build_response(
    query_type: ResponseQueryType,
    body: &Map<String, Value>,
) -> Result<InsightResponse, ValidationError> {
    let variant = query_type.response_key();
    let response = match query_type {
        ResponseQueryType::Informational => InsightResponse::Informational {
            informational: InformationalResponse {
                answer: required_text(body, variant, "answer")?,
                key_facts: required_list(body, variant, "key_facts")?,
                additional_context: optional_text(body, "additional_context"),
            },
        },
        ResponseQueryType::DecisionRequired => InsightResponse::Decision {
            decision: DecisionResponse {
                action: required_text(body, variant, "action")?,
                primary_metric: required_text(body, variant, "primary_metric")?,
                risk_level: enum_or_default::<RiskLevel>(body.get("risk_level")),
                confidence: body.get("confidence").and_then(percent),
            },
        },
        ResponseQueryType::Validation => {
            let result = required_text(body, variant, "result")?;
            let result = parse_enum::<Feasibility>(&result).ok_or_else(|| {
                ValidationError::MissingField {
                    variant: variant.to_string(),
                    field: "result".to_string(),
                }
            })?;
            InsightResponse::Validation {
                validation: ValidationResponse {
                    result,
                    explanation: required_text(body, variant, "explanation")?,
                    consequence: optional_text(body, "consequence"),
                    alternative: optional_text(body, "alternative"),
                },
            }
        }
        ResponseQueryType::Comparison => InsightResponse::Comparison {
            comparison: ComparisonResponse {
                winner: required_text(body, variant, "winner")?,
                winner_reason: required_text(body, variant, "winner_reason")?,
                runner_up: optional_text(body, "runner_up"),
                comparison_factors: string_list(body.get("comparison_factors")),
            },
        },
    };
    Ok(response)
}

fn required_text(
    body: &Map<String, Value>,
    variant: &str,
    field: &str,
) -> Result<String, ValidationError> {
    optional_text(body, field).ok_or_else(|| ValidationError::MissingField {
        variant: variant.to_string(),
        field: field.to_string(),
    })
}

/// Non-empty string or number at `field`.
fn optional_text(body: &Map<String, Value>, field: &str) -> Option<String> {
    body.get(field).and_then(text)
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Array at `field`; non-text entries are dropped, but the array itself must exist.
fn required_list(
    body: &Map<String, Value>,
    variant: &str,
    field: &str,
) -> Result<Vec<String>, ValidationError> {
    match body.get(field) {
        Some(Value::Array(items)) => Ok(items.iter().filter_map(text).collect()),
        _ => Err(ValidationError::MissingField {
            variant: variant.to_string(),
            field: field.to_string(),
        }),
    }
}

/// Integer percentage. Fractions up to 1.0 are read as a share (0.82 -> 82).
fn percent(value: &Value) -> Option<u8> {
    if let Some(whole) = value.as_u64() {
        return Some(whole.min(100) as u8);
    }
    let score = value.as_f64().filter(|s| s.is_finite())?;
    let score = if score <= 1.0 { score * 100.0 } else { score };
    Some(score.round().clamp(0.0, 100.0) as u8)
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(text).collect())
        .unwrap_or_default()
}

/// Parse a snake_case enum leniently ("Not Feasible" -> `not_feasible`).
fn parse_enum<T: DeserializeOwned>(raw: &str) -> Option<T> {
    let normalized = raw.trim().to_lowercase().replace([' ', '-'], "_");
    serde_json::from_value(Value::String(normalized)).ok()
}

fn enum_or_default<T: DeserializeOwned + Default>(value: Option<&Value>) -> T {
    value
        .and_then(Value::as_str)
        .and_then(parse_enum::<T>)
        .unwrap_or_default()
}

/// Entries without an action are dropped. Missing priority numbers follow position.
fn priorities(value: Option<&Value>) -> Vec<StrategicPriority> {
    let Some(items) = value.and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|entry| {
            let action = optional_text(entry, "action")?;
            Some((entry, action))
        })
        .enumerate()
        .map(|(index, (entry, action))| StrategicPriority {
            priority: entry
                .get("priority")
                .and_then(Value::as_u64)
                .and_then(|p| u32::try_from(p).ok())
                .unwrap_or(index as u32 + 1),
            action,
            why: optional_text(entry, "why").unwrap_or_default(),
            impact: optional_text(entry, "impact").unwrap_or_default(),
            urgency: enum_or_default::<Urgency>(entry.get("urgency")),
        })
        .collect()
}

/// Entries without a risk description are dropped.
fn risks(value: Option<&Value>) -> Vec<CriticalRisk> {
    let Some(items) = value.and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|entry| {
            Some(CriticalRisk {
                risk: optional_text(entry, "risk")?,
                severity: enum_or_default::<Severity>(entry.get("severity")),
                consequence: optional_text(entry, "consequence").unwrap_or_default(),
                mitigation: optional_text(entry, "mitigation").unwrap_or_default(),
            })
        })
        .collect()
}

/// Non-boolean flags read as false.
fn details(value: Option<&Value>) -> DetailsToSurface {
    let flag = |name: &str| {
        value
            .and_then(|v| v.get(name))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    };
    DetailsToSurface {
        show_multi_port_analysis: flag("show_multi_port_analysis"),
        show_alternatives: flag("show_alternatives"),
        show_rob_waypoints: flag("show_rob_waypoints"),
        show_weather_details: flag("show_weather_details"),
        show_eca_details: flag("show_eca_details"),
    }
}

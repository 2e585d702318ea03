//! Context compression: turn nested agent payloads into a bounded text summary.
//!
//! Each well-known field has a summarizer that pulls out the decision-relevant
//! names and numbers. Anything else is stringified and clipped. When the
//! summaries come out thin, a raw JSON block is appended so the model still
//! sees the data. Output never exceeds [`MAX_CONTEXT_CHARS`] characters.

use crate::config::SynthesisFeatures;
use crate::state::{AgentState, fields};
use serde_json::{Map, Value};

/// Hard cap on the compressed context, in characters.
pub const MAX_CONTEXT_CHARS: usize = 12_000;

/// Appended once when the context had to be cut.
pub const TRUNCATION_MARKER: &str = "[Context truncated]";

const GENERIC_SUMMARY_CHARS: usize = 500;
const THIN_SUMMARY_CHARS: usize = 500;
const RAW_JSON_CHARS: usize = 4_000;
const MAX_LISTED_VESSELS: usize = 50;
const MAX_LISTED_VIOLATIONS: usize = 5;

/// Replacement for marker text that appears inside agent data.
const NEUTRALIZED_MARKER: &str = "(context truncated)";

/// Summarizes agent state for the synthesis prompt.
#[derive(Debug, Clone, Copy)]
pub struct ContextCompressor {
    raw_json_fallback: bool,
}

impl Default for ContextCompressor {
    fn default() -> Self {
        Self {
            raw_json_fallback: true,
        }
    }
}

impl ContextCompressor {
    pub fn new(features: &SynthesisFeatures) -> Self {
        Self {
            raw_json_fallback: features.raw_json_fallback,
        }
    }

    /// Compress the named state fields into at most `MAX_CONTEXT_CHARS` characters.
    ///
    /// Fields that are absent or empty in `state` are skipped. The output is a
    /// pure function of its inputs.
    pub fn compress(&self, extracted_fields: &[String], state: &AgentState) -> String {
        let present: Vec<(&str, &Value)> = extracted_fields
            .iter()
            .filter_map(|name| state.field(name).map(|value| (name.as_str(), value)))
            .collect();

        if present.is_empty() {
            return "No agent results available.".to_string();
        }

        let sections: Vec<String> = present
            .iter()
            .map(|(name, value)| format!("[{name}]\n{}", summarize_field(name, value)))
            .collect();
        let mut body = sections.join("\n\n");

        if self.raw_json_fallback && body.chars().count() < THIN_SUMMARY_CHARS {
            let raw: Map<String, Value> = present
                .iter()
                .map(|(name, value)| (name.to_string(), (*value).clone()))
                .collect();
            let raw_json = Value::Object(raw).to_string();
            body.push_str("\n\n[raw_agent_data]\n");
            body.push_str(&clip(&raw_json, RAW_JSON_CHARS));
        }

        let body = body.replace(TRUNCATION_MARKER, NEUTRALIZED_MARKER);
        enforce_cap(body, MAX_CONTEXT_CHARS)
    }
}

/// Dispatch to the field-specific summarizer, falling back to the generic one
/// when a payload has none of the keys the summarizer looks for.
fn summarize_field(name: &str, value: &Value) -> String {
    let specific = match name {
        fields::ROUTE_DATA => summarize_route(value),
        fields::BUNKER_ANALYSIS => summarize_bunker(value),
        fields::WEATHER_CONSUMPTION => summarize_weather_consumption(value),
        fields::WEATHER_FORECAST => summarize_weather_forecast(value),
        fields::ROB_SAFETY_STATUS => summarize_rob(value),
        fields::COMPLIANCE_DATA => summarize_compliance(value),
        fields::HULL_PERFORMANCE => summarize_hull(value),
        fields::CII_RATING => summarize_cii(value),
        fields::VESSEL_COMPARISON => summarize_vessels(value),
        _ => None,
    };
    specific.unwrap_or_else(|| summarize_generic(value))
}

fn summarize_route(route: &Value) -> Option<String> {
    let mut parts = Vec::new();
    let origin = text_at(route, &["origin", "origin_port", "origin_port_name", "from"]);
    let destination = text_at(
        route,
        &["destination", "destination_port", "destination_port_name", "to"],
    );
    match (origin, destination) {
        (Some(o), Some(d)) => parts.push(format!("{o} -> {d}")),
        (Some(o), None) => parts.push(format!("from {o}")),
        (None, Some(d)) => parts.push(format!("to {d}")),
        (None, None) => {}
    }
    if let Some(distance) = number_at(route, &["distance_nm", "total_distance_nm", "distance"]) {
        parts.push(format!("{} nm", fmt_number(distance)));
    }
    if let Some(hours) = number_at(route, &["estimated_hours", "duration_hours", "duration"]) {
        parts.push(format!("{} hours", fmt_number(hours)));
    }
    if let Some(waypoints) = route.get("waypoints").and_then(Value::as_array) {
        parts.push(format!("{} waypoints", waypoints.len()));
    }
    join_parts("Route", parts)
}

fn summarize_bunker(bunker: &Value) -> Option<String> {
    let mut parts = Vec::new();
    let recommendations = bunker.get("recommendations").and_then(Value::as_array);
    let best = bunker
        .get("best_option")
        .or_else(|| recommendations.and_then(|r| r.first()));
    if let Some(best) = best {
        if let Some(port) = text_at(best, &["port_name", "port", "name"]) {
            parts.push(format!("best port {port}"));
        }
        if let Some(cost) = number_at(best, &["total_cost_usd", "total_cost", "cost"]) {
            parts.push(format!("cost ${}", fmt_number(cost)));
        }
    }
    if let Some(recommendations) = recommendations {
        let alternatives = recommendations.len().saturating_sub(1);
        parts.push(format!("{alternatives} alternatives"));
    }
    if let Some(savings) = number_at(bunker, &["max_savings_usd", "savings_usd", "savings"]) {
        parts.push(format!("savings ${}", fmt_number(savings)));
    }
    join_parts("Bunker", parts)
}

fn summarize_weather_consumption(consumption: &Value) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(delta) = number_at(
        consumption,
        &["consumption_increase_percent", "increase_percent", "delta_percent"],
    ) {
        parts.push(format!("consumption {:+}%", round2(delta)));
    }
    if let Some(extra) = number_at(
        consumption,
        &["additional_fuel_mt", "extra_fuel_mt", "additional_fuel_needed_mt"],
    ) {
        parts.push(format!("{} MT extra fuel", fmt_number(extra)));
    }
    join_parts("Weather impact", parts)
}

fn summarize_weather_forecast(forecast: &Value) -> Option<String> {
    let points = match forecast {
        Value::Array(points) => points,
        other => other.get("forecast").and_then(Value::as_array)?,
    };
    let max_wave = points
        .iter()
        .filter_map(|p| {
            number_at(p, &["wave_height_m", "wave_height"]).or_else(|| {
                p.get("weather")
                    .and_then(|w| number_at(w, &["wave_height_m", "wave_height"]))
            })
        })
        .fold(None, |acc: Option<f64>, h| Some(acc.map_or(h, |a| a.max(h))));

    let mut parts = vec![format!("{} forecast points", points.len())];
    if let Some(wave) = max_wave {
        parts.push(format!("max wave height {} m", fmt_number(wave)));
    }
    join_parts("Weather forecast", parts)
}

fn summarize_rob(rob: &Value) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(safe) = rob.get("overall_safe").and_then(Value::as_bool) {
        parts.push(if safe { "SAFE" } else { "UNSAFE" }.to_string());
    }
    if let Some(days) = number_at(rob, &["days_until_empty", "minimum_rob_days", "days_remaining"]) {
        parts.push(format!("{} days until empty", fmt_number(days)));
    }
    if let Some(violations) = rob.get("violations").and_then(Value::as_array) {
        parts.push(format!("{} violations", violations.len()));
        let listed: Vec<String> = violations
            .iter()
            .take(MAX_LISTED_VIOLATIONS)
            .filter_map(|v| text_of(v).or_else(|| text_at(v, &["message", "description"])))
            .collect();
        if !listed.is_empty() {
            parts.push(listed.join("; "));
        }
    }
    join_parts("ROB safety", parts)
}

fn summarize_compliance(compliance: &Value) -> Option<String> {
    let mut parts = Vec::new();
    let eca_distance = number_at(compliance, &["eca_distance_nm", "total_eca_distance_nm"]).or_else(|| {
        compliance
            .get("eca_zones")
            .and_then(|z| number_at(z, &["total_eca_distance_nm", "eca_distance_nm"]))
    });
    if let Some(distance) = eca_distance {
        parts.push(format!("{} nm in ECA", fmt_number(distance)));
    }
    if let Some(fuel) = text_at(compliance, &["fuel_requirement", "required_fuel", "fuel_type"]) {
        parts.push(format!("requires {fuel}"));
    }
    join_parts("Compliance", parts)
}

fn summarize_hull(hull: &Value) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(condition) = text_at(hull, &["condition", "hull_condition"]) {
        parts.push(format!("condition {condition}"));
    }
    if let Some(excess) = number_at(
        hull,
        &["excess_consumption_percent", "excess_fuel_consumption_pct", "excess_consumption"],
    ) {
        parts.push(format!("{}% excess consumption", round2(excess)));
    }
    join_parts("Hull", parts)
}

fn summarize_cii(cii: &Value) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(rating) = text_at(cii, &["rating", "cii_rating"]) {
        parts.push(format!("rating {rating}"));
    }
    if let Some(attained) = number_at(cii, &["attained_cii", "attained", "attained_value"]) {
        parts.push(format!("attained {}", fmt_number(attained)));
    }
    join_parts("CII", parts)
}

fn summarize_vessels(comparison: &Value) -> Option<String> {
    let vessels = match comparison {
        Value::Array(vessels) => vessels,
        other => other.get("vessels").and_then(Value::as_array)?,
    };
    let names: Vec<String> = vessels
        .iter()
        .filter_map(|v| text_of(v).or_else(|| text_at(v, &["name", "vessel_name"])))
        .collect();

    let mut line = format!("{} vessels", vessels.len());
    if !names.is_empty() {
        let shown: Vec<&str> = names
            .iter()
            .take(MAX_LISTED_VESSELS)
            .map(String::as_str)
            .collect();
        line.push_str(": ");
        line.push_str(&shown.join(", "));
        if names.len() > MAX_LISTED_VESSELS {
            line.push_str(&format!(", ...and {} more", names.len() - MAX_LISTED_VESSELS));
        }
    }
    if let Some(winner) = text_at(comparison, &["recommended_vessel", "winner", "best_vessel"]) {
        line.push_str(&format!("; recommended {winner}"));
    }
    Some(format!("Vessel comparison: {line}"))
}

fn summarize_generic(value: &Value) -> String {
    clip(&value.to_string(), GENERIC_SUMMARY_CHARS)
}

fn join_parts(label: &str, parts: Vec<String>) -> Option<String> {
    if parts.is_empty() {
        None
    } else {
        Some(format!("{label}: {}", parts.join(", ")))
    }
}

/// First of `keys` holding a scalar or a named object.
fn text_at(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| value.get(*key).and_then(text_of))
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(_) => text_at(value, &["name", "port_name", "code"]),
        _ => None,
    }
}

fn number_at(value: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .find_map(|key| value.get(*key).and_then(Value::as_f64))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn fmt_number(value: f64) -> String {
    let rounded = round2(value);
    if rounded.fract() == 0.0 {
        format!("{}", rounded as i64)
    } else {
        format!("{rounded}")
    }
}

const ELLIPSIS: &str = "...";

/// Clip to at most `max` characters, ending in an ellipsis when anything was cut.
fn clip(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let keep = max.saturating_sub(ELLIPSIS.len());
    let mut clipped: String = text.chars().take(keep).collect();
    clipped.push_str(ELLIPSIS);
    clipped
}

/// Cut `body` to fit `cap` characters including the marker, on a word boundary.
fn enforce_cap(body: String, cap: usize) -> String {
    if body.chars().count() <= cap {
        return body;
    }
    // Room for "\n" + marker.
    let budget = cap.saturating_sub(TRUNCATION_MARKER.chars().count() + 1);
    let head: String = body.chars().take(budget).collect();
    let cut = match head.rfind(char::is_whitespace) {
        Some(index) if index > 0 => &head[..index],
        _ => head.as_str(),
    };
    format!("{}\n{TRUNCATION_MARKER}", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_route_summary() {
        let state = AgentState {
            route_data: Some(json!({
                "origin_port_name": "Singapore",
                "destination_port_name": "Rotterdam",
                "distance_nm": 8288.4,
                "estimated_hours": 575.5,
                "waypoints": [[1.29, 103.85], [12.0, 45.0], [51.9, 4.5]]
            })),
            ..Default::default()
        };
        let out = ContextCompressor::default().compress(&names(&["route_data"]), &state);
        assert!(out.contains("Singapore -> Rotterdam"));
        assert!(out.contains("8288.4 nm"));
        assert!(out.contains("3 waypoints"));
    }

    #[test]
    fn test_bunker_summary() {
        let state = AgentState {
            bunker_analysis: Some(json!({
                "best_option": {"port_name": "Colombo", "total_cost_usd": 412000},
                "recommendations": [{"port_name": "Colombo"}, {"port_name": "Fujairah"}, {"port_name": "Port Louis"}],
                "max_savings_usd": 18500
            })),
            ..Default::default()
        };
        let out = ContextCompressor::default().compress(&names(&["bunker_analysis"]), &state);
        assert!(out.contains("best port Colombo"));
        assert!(out.contains("cost $412000"));
        assert!(out.contains("2 alternatives"));
        assert!(out.contains("savings $18500"));
    }

    #[test]
    fn test_rob_summary() {
        let state = AgentState {
            rob_safety_status: Some(json!({
                "overall_safe": false,
                "days_until_empty": 2.5,
                "violations": ["VLSFO below 3 day margin at waypoint 14"]
            })),
            ..Default::default()
        };
        let out = ContextCompressor::default().compress(&names(&["rob_safety_status"]), &state);
        assert!(out.contains("UNSAFE"));
        assert!(out.contains("2.5 days until empty"));
        assert!(out.contains("waypoint 14"));
    }

    #[test]
    fn test_vessel_names_capped() {
        let vessels: Vec<Value> = (0..60).map(|i| json!({"name": format!("MV Vessel {i}")})).collect();
        let state = AgentState {
            vessel_comparison: Some(json!({"vessels": vessels})),
            ..Default::default()
        };
        let compressor = ContextCompressor {
            raw_json_fallback: false,
        };
        let out = compressor.compress(&names(&["vessel_comparison"]), &state);
        assert!(out.contains("MV Vessel 49"));
        assert!(!out.contains("MV Vessel 50"));
        assert!(out.contains("...and 10 more"));
    }

    #[test]
    fn test_unknown_field_generic_summary_clipped() {
        let mut state = AgentState::default();
        state
            .extra
            .insert("eu_ets".into(), json!({"blob": "x".repeat(2000)}));
        let compressor = ContextCompressor {
            raw_json_fallback: false,
        };
        let out = compressor.compress(&names(&["eu_ets"]), &state);
        assert!(out.chars().count() < 600);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn test_clip_stays_within_limit() {
        let long = "y".repeat(5_000);
        let clipped = clip(&long, GENERIC_SUMMARY_CHARS);
        assert_eq!(clipped.chars().count(), GENERIC_SUMMARY_CHARS);
        assert!(clipped.ends_with("..."));
        assert_eq!(clip(&long, RAW_JSON_CHARS).chars().count(), RAW_JSON_CHARS);
        assert_eq!(clip("short", GENERIC_SUMMARY_CHARS), "short");
        assert_eq!(clip(&"z".repeat(500), GENERIC_SUMMARY_CHARS).len(), 500);

        let mut state = AgentState::default();
        state.extra.insert("eu_ets".into(), json!("w".repeat(2000)));
        let compressor = ContextCompressor {
            raw_json_fallback: false,
        };
        let out = compressor.compress(&names(&["eu_ets"]), &state);
        let summary = out.strip_prefix("[eu_ets]\n").unwrap();
        assert_eq!(summary.chars().count(), GENERIC_SUMMARY_CHARS);
    }

    #[test]
    fn test_thin_summary_gets_raw_json() {
        let state = AgentState {
            cii_rating: Some(json!({"rating": "D", "attained_cii": 7.1, "required_cii": 6.2})),
            ..Default::default()
        };
        let out = ContextCompressor::default().compress(&names(&["cii_rating"]), &state);
        assert!(out.contains("CII: rating D, attained 7.1"));
        assert!(out.contains("[raw_agent_data]"));
        assert!(out.contains("required_cii"));

        let mut features = SynthesisFeatures::default();
        features.raw_json_fallback = false;
        let out = ContextCompressor::new(&features).compress(&names(&["cii_rating"]), &state);
        assert!(!out.contains("[raw_agent_data]"));
    }

    #[test]
    fn test_missing_fields_skipped() {
        let out = ContextCompressor::default().compress(&names(&["route_data"]), &AgentState::default());
        assert_eq!(out, "No agent results available.");
    }

    #[test]
    fn test_output_capped_with_single_marker() {
        let mut state = AgentState::default();
        for i in 0..40 {
            state.extra.insert(
                format!("agent_{i:02}"),
                json!({"notes": format!("{} {}", TRUNCATION_MARKER, "word ".repeat(200))}),
            );
        }
        let fields: Vec<String> = state.extra.keys().cloned().collect();
        let out = ContextCompressor::default().compress(&fields, &state);
        assert!(out.chars().count() <= MAX_CONTEXT_CHARS);
        assert!(out.ends_with(TRUNCATION_MARKER));
        assert_eq!(out.matches(TRUNCATION_MARKER).count(), 1);
    }

    #[test]
    fn test_deterministic() {
        let state = AgentState {
            route_data: Some(json!({"origin": "SGSIN", "destination": "NLRTM"})),
            weather_forecast: Some(json!([{"wave_height_m": 2.0}, {"weather": {"wave_height_m": 4.5}}])),
            ..Default::default()
        };
        let fields = names(&["route_data", "weather_forecast"]);
        let compressor = ContextCompressor::default();
        assert_eq!(compressor.compress(&fields, &state), compressor.compress(&fields, &state));
        assert!(compressor.compress(&fields, &state).contains("max wave height 4.5 m"));
    }

    #[test]
    fn test_enforce_cap_without_whitespace() {
        let out = enforce_cap("x".repeat(100), 50);
        assert_eq!(out.chars().count(), 50);
        assert!(out.ends_with(TRUNCATION_MARKER));
    }
}

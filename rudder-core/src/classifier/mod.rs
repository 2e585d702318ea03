//! Query classification: what kind of answer does the user want?
//!
//! A strict cascade: Tier 1 pattern matching on the message, then Tier 2
//! inference from populated agent state, then a fixed fallback. Exactly one
//! classification comes out of every call.

pub mod inference;
pub mod patterns;

use crate::config::ClassifierConfig;
use crate::state::AgentState;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// The kind of answer a user query is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryType {
    #[serde(rename = "route-only")]
    RouteOnly,
    #[serde(rename = "bunker_planning")]
    BunkerPlanning,
    #[serde(rename = "weather-analysis")]
    WeatherAnalysis,
    #[serde(rename = "cost-comparison")]
    CostComparison,
    #[serde(rename = "informational")]
    Informational,
    #[serde(rename = "validation")]
    Validation,
    #[serde(rename = "decision-required")]
    DecisionRequired,
    #[serde(rename = "comparison")]
    Comparison,
}

impl QueryType {
    pub const ALL: [QueryType; 8] = [
        QueryType::RouteOnly,
        QueryType::BunkerPlanning,
        QueryType::WeatherAnalysis,
        QueryType::CostComparison,
        QueryType::Informational,
        QueryType::Validation,
        QueryType::DecisionRequired,
        QueryType::Comparison,
    ];

    /// Wire name of this query type.
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::RouteOnly => "route-only",
            QueryType::BunkerPlanning => "bunker_planning",
            QueryType::WeatherAnalysis => "weather-analysis",
            QueryType::CostComparison => "cost-comparison",
            QueryType::Informational => "informational",
            QueryType::Validation => "validation",
            QueryType::DecisionRequired => "decision-required",
            QueryType::Comparison => "comparison",
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of classifying one user message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryClassification {
    pub query_type: QueryType,
    /// 0-100.
    pub confidence: u8,
    /// Which tier decided, e.g. `tier1-exact`, `tier2-state`, `fallback`.
    pub method: String,
    pub reasoning: String,
}

impl QueryClassification {
    pub fn new(
        query_type: QueryType,
        confidence: u8,
        method: impl Into<String>,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            query_type,
            confidence: confidence.min(100),
            method: method.into(),
            reasoning: reasoning.into(),
        }
    }

    /// The classification used when neither tier is confident enough.
    pub fn fallback() -> Self {
        Self::new(
            QueryType::Informational,
            50,
            "fallback",
            "No tier reached its confidence threshold",
        )
    }
}

/// Three-tier query classifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryClassifier {
    thresholds: ClassifierConfig,
}

impl QueryClassifier {
    pub fn new(thresholds: ClassifierConfig) -> Self {
        Self { thresholds }
    }

    /// Classify a message against the current agent state. Never fails.
    pub fn classify(&self, message: &str, state: &AgentState) -> QueryClassification {
        if message.trim().is_empty() {
            debug!("Empty message, using fallback classification");
            return QueryClassification::fallback();
        }

        let tier1 = patterns::match_message(message);
        debug!(
            query_type = %tier1.query_type,
            confidence = tier1.confidence,
            method = tier1.method.as_str(),
            "Tier 1 result"
        );
        if tier1.confidence > 0 && tier1.confidence >= self.thresholds.tier1_threshold {
            return tier1;
        }

        let tier2 = inference::infer_from_state(state);
        debug!(
            query_type = %tier2.query_type,
            confidence = tier2.confidence,
            "Tier 2 result"
        );
        if tier2.confidence > 0 && tier2.confidence >= self.thresholds.tier2_threshold {
            return tier2;
        }

        QueryClassification::fallback()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn classifier() -> QueryClassifier {
        QueryClassifier::default()
    }

    #[test]
    fn test_wire_names_round_trip_through_serde() {
        for query_type in QueryType::ALL {
            let encoded = serde_json::to_value(query_type).unwrap();
            assert_eq!(encoded, Value::String(query_type.as_str().to_string()));
        }
    }

    #[test]
    fn test_exact_phrase_wins() {
        let result = classifier().classify(
            "calculate route from Singapore to Rotterdam",
            &AgentState::default(),
        );
        assert_eq!(result.query_type, QueryType::RouteOnly);
        assert!(result.confidence >= 90);
        assert_eq!(result.method, "tier1-exact");
    }

    #[test]
    fn test_falls_through_to_state() {
        let state = AgentState {
            route_data: Some(json!({"distance_nm": 8288})),
            bunker_analysis: Some(Value::Null),
            ..Default::default()
        };
        let result = classifier().classify("hmm, ok", &state);
        assert_eq!(result.query_type, QueryType::RouteOnly);
        assert_eq!(result.confidence, 80);
        assert_eq!(result.method, "tier2-state");
    }

    #[test]
    fn test_regex_tier_below_default_threshold() {
        let result = classifier().classify("Swell expected off the Cape", &AgentState::default());
        assert_eq!(result, QueryClassification::fallback());

        let lowered = QueryClassifier::new(ClassifierConfig {
            tier1_threshold: 75,
            tier2_threshold: 75,
        });
        let result = lowered.classify("Swell expected off the Cape", &AgentState::default());
        assert_eq!(result.query_type, QueryType::WeatherAnalysis);
        assert_eq!(result.method, "tier1-regex");
    }

    #[test]
    fn test_whitespace_message_is_fallback_even_with_state() {
        let state = AgentState {
            route_data: Some(json!({"distance_nm": 8288})),
            ..Default::default()
        };
        let result = classifier().classify("  \n\t ", &state);
        assert_eq!(result.query_type, QueryType::Informational);
        assert_eq!(result.confidence, 50);
        assert_eq!(result.method, "fallback");
    }

    #[test]
    fn test_zero_threshold_does_not_accept_no_match() {
        let permissive = QueryClassifier::new(ClassifierConfig {
            tier1_threshold: 0,
            tier2_threshold: 0,
        });
        let result = permissive.classify("hello there", &AgentState::default());
        assert_eq!(result.method, "fallback");
    }

    #[test]
    fn test_route_with_cost_terms_lands_in_acceptable_set() {
        let acceptable = [
            QueryType::CostComparison,
            QueryType::BunkerPlanning,
            QueryType::RouteOnly,
            QueryType::Informational,
        ];
        let route_and_bunker = AgentState {
            route_data: Some(json!({"origin": "SGSIN", "destination": "NLRTM"})),
            bunker_analysis: Some(json!({"recommendations": [{"port": "Colombo"}, {"port": "Fujairah"}]})),
            ..Default::default()
        };
        let messages = [
            "route from Singapore to Rotterdam with cheapest bunker",
            "compare route costs",
            "what does the fuel cost on this route look like",
            "which route is cheaper to bunker on",
        ];
        for state in [AgentState::default(), route_and_bunker] {
            for message in messages {
                let result = classifier().classify(message, &state);
                assert!(
                    acceptable.contains(&result.query_type),
                    "{message:?} classified as {}",
                    result.query_type
                );
                assert!(result.confidence >= 50, "{message:?} at {}", result.confidence);
                assert_ne!(result.method, "tier1-keyword", "{message:?}");
            }
        }
    }
}

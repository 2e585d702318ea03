//! Tier 2: infer the query type from which agent payloads are populated.

use super::{QueryClassification, QueryType};
use crate::state::{AgentState, fields};

/// Classify from agent state alone. A confidence of 0 means nothing applied.
pub fn infer_from_state(state: &AgentState) -> QueryClassification {
    let has_route = state.has(fields::ROUTE_DATA);
    let has_bunker = state.has(fields::BUNKER_ANALYSIS);

    if has_route && has_bunker {
        let recommendations = state.bunker_recommendation_count();
        if recommendations >= 2 {
            return QueryClassification::new(
                QueryType::CostComparison,
                78,
                "tier2-state",
                format!("Route and bunker data with {recommendations} port recommendations"),
            );
        }
        return QueryClassification::new(
            QueryType::BunkerPlanning,
            85,
            "tier2-state",
            "Route and bunker data present",
        );
    }

    if has_route {
        return QueryClassification::new(
            QueryType::RouteOnly,
            80,
            "tier2-state",
            "Route data present without bunker analysis",
        );
    }

    let points = state.weather_point_count();
    if points >= 5 && !has_bunker {
        return QueryClassification::new(
            QueryType::WeatherAnalysis,
            75,
            "tier2-state",
            format!("Weather forecast with {points} points and no bunker analysis"),
        );
    }

    QueryClassification::new(
        QueryType::Informational,
        0,
        "tier2-state",
        "No populated agent data to infer from",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[test]
    fn test_route_without_bunker() {
        let state = AgentState {
            route_data: Some(json!({"origin": "SGSIN", "destination": "NLRTM"})),
            bunker_analysis: Some(Value::Null),
            ..Default::default()
        };
        let result = infer_from_state(&state);
        assert_eq!(result.query_type, QueryType::RouteOnly);
        assert_eq!(result.confidence, 80);
        assert_eq!(result.method, "tier2-state");
    }

    #[test]
    fn test_route_and_bunker() {
        let state = AgentState {
            route_data: Some(json!({"origin": "SGSIN"})),
            bunker_analysis: Some(json!({"best_option": {"port_name": "Colombo"}})),
            ..Default::default()
        };
        let result = infer_from_state(&state);
        assert_eq!(result.query_type, QueryType::BunkerPlanning);
        assert_eq!(result.confidence, 85);
    }

    #[test]
    fn test_multiple_recommendations_become_cost_comparison() {
        let state = AgentState {
            route_data: Some(json!({"origin": "SGSIN"})),
            bunker_analysis: Some(json!({"recommendations": [{"port": "A"}, {"port": "B"}]})),
            ..Default::default()
        };
        let result = infer_from_state(&state);
        assert_eq!(result.query_type, QueryType::CostComparison);
        assert_eq!(result.confidence, 78);
    }

    #[test]
    fn test_weather_needs_five_points() {
        let four = AgentState {
            weather_forecast: Some(json!([{}, {}, {}, {}])),
            ..Default::default()
        };
        assert_eq!(infer_from_state(&four).confidence, 0);

        let five = AgentState {
            weather_forecast: Some(json!([{}, {}, {}, {}, {}])),
            ..Default::default()
        };
        let result = infer_from_state(&five);
        assert_eq!(result.query_type, QueryType::WeatherAnalysis);
        assert_eq!(result.confidence, 75);
    }

    #[test]
    fn test_weather_with_bunker_is_not_weather_analysis() {
        let state = AgentState {
            weather_forecast: Some(json!([{}, {}, {}, {}, {}, {}])),
            bunker_analysis: Some(json!({"recommendations": []})),
            ..Default::default()
        };
        assert_eq!(infer_from_state(&state).confidence, 0);
    }

    #[test]
    fn test_empty_state() {
        assert_eq!(infer_from_state(&AgentState::default()).confidence, 0);
    }
}

//! Integration tests for the synthesis engine.
//!
//! These run whole turns through `SynthesisEngine` with `MockLlmProvider` and
//! a recording metrics sink, checking the outcome and the exact metric events.

use rudder_core::brain::MockLlmProvider;
use rudder_core::classifier::QueryType;
use rudder_core::config::SynthesisConfig;
use rudder_core::error::LlmError;
use rudder_core::metrics::{MetricsSink, SynthesisMetrics};
use rudder_core::state::{AgentState, AgentStatus};
use rudder_core::synthesis::schema::{Feasibility, RiskLevel, Severity};
use rudder_core::synthesis::{
    FailureKind, InsightResponse, ResponseQueryType, SynthesisEngine, SynthesisOutcome,
};
use rudder_core::types::{CompletionResponse, Message, TokenUsage};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Attempt,
    Success,
    Failure(FailureKind),
    Skipped,
}

/// Metrics sink that records every event in order.
#[derive(Default)]
struct RecordingMetrics {
    events: Mutex<Vec<Event>>,
}

impl RecordingMetrics {
    fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }
}

impl MetricsSink for RecordingMetrics {
    fn record_attempt(&self) {
        self.events.lock().unwrap().push(Event::Attempt);
    }

    fn record_success(&self, _cost_usd: f64, _latency_ms: u64) {
        self.events.lock().unwrap().push(Event::Success);
    }

    fn record_failure(&self, kind: FailureKind) {
        self.events.lock().unwrap().push(Event::Failure(kind));
    }

    fn record_skipped(&self) {
        self.events.lock().unwrap().push(Event::Skipped);
    }
}

fn voyage_state() -> AgentState {
    serde_json::from_value(json!({
        "agent_status": {
            "route_agent": "success",
            "bunker_agent": "success",
            "weather_agent": "success",
            "rob_agent": "failed"
        },
        "route_data": {
            "origin_port_name": "Singapore",
            "destination_port_name": "Rotterdam",
            "distance_nm": 8288,
            "estimated_hours": 575,
            "waypoints": [[1.29, 103.85], [6.0, 80.0], [12.6, 43.3], [51.9, 4.1]]
        },
        "bunker_analysis": {
            "best_option": {"port_name": "Colombo", "total_cost_usd": 412000},
            "recommendations": [{"port_name": "Colombo"}, {"port_name": "Fujairah"}],
            "max_savings_usd": 18500
        },
        "weather_consumption": {"consumption_increase_percent": 6.2, "additional_fuel_mt": 41}
    }))
    .unwrap()
}

fn decision_reply() -> String {
    json!({
        "query_type": "decision-required",
        "response": {
            "decision": {
                "action": "Bunker 1,200 MT VLSFO at Colombo",
                "primary_metric": "$18,500 saved vs Fujairah",
                "risk_level": "caution",
                "confidence": 0.82
            }
        },
        "strategic_priorities": [
            {"priority": 1, "action": "Confirm Colombo stem", "why": "Availability is tight", "impact": "$18.5k", "urgency": "today"}
        ],
        "critical_risks": [
            {"risk": "Monsoon delays in the Arabian Sea", "severity": "high", "consequence": "+41 MT burn", "mitigation": "Carry 5% margin"}
        ],
        "details_to_surface": {"show_multi_port_analysis": true, "show_weather_details": false},
        "cross_agent_connections": ["Weather adds 6.2% burn before the Colombo stop"],
        "synthesis_metadata": {"confidence_score": 0.85}
    })
    .to_string()
}

fn engine_with(
    provider: Arc<MockLlmProvider>,
    config: SynthesisConfig,
) -> (SynthesisEngine, Arc<RecordingMetrics>) {
    let metrics = Arc::new(RecordingMetrics::default());
    let engine = SynthesisEngine::new(provider, config, metrics.clone());
    (engine, metrics)
}

#[tokio::test]
async fn test_completed_turn() {
    let provider = Arc::new(MockLlmProvider::with_response(&decision_reply()));
    let (engine, metrics) = engine_with(provider.clone(), SynthesisConfig::default());

    let outcome = engine
        .synthesize("Where should I bunker between Singapore and Rotterdam?", &voyage_state())
        .await;

    assert!(outcome.is_success());
    assert_eq!(metrics.events(), vec![Event::Attempt, Event::Success]);
    assert_eq!(provider.call_count(), 1);

    let SynthesisOutcome::Completed(report) = outcome else {
        panic!("expected a completed outcome");
    };
    assert_eq!(report.classification.query_type, QueryType::BunkerPlanning);
    assert_eq!(report.insights.query_type(), ResponseQueryType::DecisionRequired);
    match &report.insights.response {
        InsightResponse::Decision { decision } => {
            assert_eq!(decision.risk_level, RiskLevel::Caution);
            assert_eq!(decision.confidence, Some(82));
        }
        other => panic!("unexpected response: {other:?}"),
    }
    assert_eq!(report.insights.critical_risks[0].severity, Severity::High);
    assert!(report.insights.details_to_surface.show_multi_port_analysis);
    assert_eq!(
        report.insights.synthesis_metadata.agents_analyzed,
        vec!["bunker_agent", "route_agent", "weather_agent"]
    );
    assert_eq!(report.usage.input_tokens, 100);
    assert_eq!(report.cost_usd, 0.0);
}

#[tokio::test]
async fn test_gate_skip_records_one_skip_and_no_attempt() {
    let provider = Arc::new(MockLlmProvider::with_response(&decision_reply()));
    let config = SynthesisConfig {
        min_agents_for_synthesis: 6,
        ..Default::default()
    };
    let (engine, metrics) = engine_with(provider.clone(), config);

    let outcome = engine.synthesize("bunker options please", &voyage_state()).await;

    match outcome {
        SynthesisOutcome::Skipped { reason, .. } => assert_eq!(reason, "Only 3 agents (need 6)"),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(metrics.events(), vec![Event::Skipped]);
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_malformed_reply_is_validation_failure() {
    let provider = Arc::new(MockLlmProvider::with_response("Sure! Colombo looks best."));
    let (engine, metrics) = engine_with(provider, SynthesisConfig::default());

    let outcome = engine.synthesize("Where should I bunker?", &voyage_state()).await;

    match &outcome {
        SynthesisOutcome::Failed(failure) => {
            assert_eq!(failure.kind, FailureKind::Validation);
            assert!(failure.message.contains("not valid JSON"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(!outcome.is_success());
    assert_eq!(
        metrics.events(),
        vec![Event::Attempt, Event::Failure(FailureKind::Validation)]
    );
}

#[tokio::test]
async fn test_provider_error_is_llm_failure() {
    let provider = Arc::new(MockLlmProvider::new());
    provider.queue_error(LlmError::AuthFailed {
        provider: "Anthropic".into(),
    });
    let (engine, metrics) = engine_with(provider.clone(), SynthesisConfig::default());

    let outcome = engine.synthesize("Where should I bunker?", &voyage_state()).await;

    match &outcome {
        SynthesisOutcome::Failed(failure) => {
            assert_eq!(failure.kind, FailureKind::Llm);
            assert!(failure.message.contains("Authentication failed"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    // Auth failures are not retried.
    assert_eq!(provider.call_count(), 1);
    assert_eq!(
        metrics.events(),
        vec![Event::Attempt, Event::Failure(FailureKind::Llm)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_slow_provider_times_out() {
    let provider = Arc::new(
        MockLlmProvider::with_response(&decision_reply()).with_delay(Duration::from_secs(120)),
    );
    let config = SynthesisConfig {
        timeout_seconds: 5,
        ..Default::default()
    };
    let (engine, metrics) = engine_with(provider, config);

    let outcome = engine.synthesize("Where should I bunker?", &voyage_state()).await;

    match &outcome {
        SynthesisOutcome::Failed(failure) => {
            assert_eq!(failure.kind, FailureKind::Timeout);
            assert!(failure.message.contains("5s"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(
        metrics.events(),
        vec![Event::Attempt, Event::Failure(FailureKind::Timeout)]
    );
}

#[tokio::test]
async fn test_unsafe_rob_forces_synthesis_for_single_agent() {
    let reply = json!({
        "query_type": "validation",
        "response": {"validation": {
            "result": "not_feasible",
            "explanation": "VLSFO runs out two days before Rotterdam",
            "alternative": "Add a Gibraltar stop"
        }},
        "strategic_priorities": [{"action": "Bunker at Gibraltar", "rationale": "Only reachable port", "urgency": "immediate"}]
    })
    .to_string();
    let provider = Arc::new(MockLlmProvider::with_response(&reply));
    let (engine, metrics) = engine_with(provider, SynthesisConfig::default());

    let mut state = AgentState::default();
    state
        .agent_status
        .insert("rob_agent".into(), AgentStatus::Success);
    state.rob_safety_status = Some(json!({"overall_safe": false, "days_until_empty": 9}));

    let outcome = engine.synthesize("Can we make it to Rotterdam?", &state).await;

    let insights = outcome.insights().expect("synthesis should complete");
    match &insights.response {
        InsightResponse::Validation { validation } => {
            assert_eq!(validation.result, Feasibility::NotFeasible);
            assert_eq!(validation.alternative.as_deref(), Some("Add a Gibraltar stop"));
        }
        other => panic!("unexpected response: {other:?}"),
    }
    assert_eq!(insights.strategic_priorities[0].why, "Only reachable port");
    assert_eq!(metrics.events(), vec![Event::Attempt, Event::Success]);
}

#[tokio::test]
async fn test_shared_metrics_across_turns() {
    let provider = Arc::new(MockLlmProvider::new());
    provider.queue_response(CompletionResponse {
        message: Message::assistant(decision_reply()),
        usage: TokenUsage {
            input_tokens: 1_000_000,
            output_tokens: 0,
        },
        model: "claude-haiku-4-5".into(),
        finish_reason: Some("end_turn".into()),
    });
    provider.queue_response(MockLlmProvider::text_response("not json"));

    let metrics = Arc::new(SynthesisMetrics::new());
    let engine = SynthesisEngine::new(provider, SynthesisConfig::default(), metrics.clone());
    let state = voyage_state();

    let first = engine.synthesize("Where should I bunker?", &state).await;
    let second = engine.synthesize("Where should I bunker?", &state).await;
    let third = engine.synthesize("Where should I bunker?", &AgentState::default()).await;

    assert!(first.is_success());
    assert!(!second.is_success());
    assert!(matches!(third, SynthesisOutcome::Skipped { .. }));

    let snap = metrics.snapshot();
    assert_eq!(snap.attempts, 2);
    assert_eq!(snap.successes, 1);
    assert_eq!(snap.failures, 1);
    assert_eq!(snap.validation_failures, 1);
    assert_eq!(snap.skipped, 1);
    // 1M input tokens on claude-haiku-4-5 at $1 per million
    assert!((snap.total_cost_usd - 1.0).abs() < 1e-6);
}

#[test]
fn test_synthesize_from_sync_context() {
    let provider = Arc::new(MockLlmProvider::with_response(&decision_reply()));
    let (engine, metrics) = engine_with(provider, SynthesisConfig::default());

    let outcome = tokio_test::block_on(engine.synthesize("bunker options", &voyage_state()));

    assert!(outcome.is_success());
    assert_eq!(metrics.events(), vec![Event::Attempt, Event::Success]);
}

#[tokio::test]
async fn test_concurrent_turns_share_one_sink() {
    let provider = Arc::new(MockLlmProvider::new());
    for _ in 0..16 {
        provider.queue_response(MockLlmProvider::text_response(&decision_reply()));
    }
    let metrics = Arc::new(SynthesisMetrics::new());
    let engine = Arc::new(SynthesisEngine::new(
        provider,
        SynthesisConfig::default(),
        metrics.clone(),
    ));
    let state = Arc::new(voyage_state());

    let turns = (0..16).map(|_| {
        let engine = Arc::clone(&engine);
        let state = Arc::clone(&state);
        async move { engine.synthesize("Where should I bunker?", &state).await }
    });
    let outcomes = futures::future::join_all(turns).await;

    assert!(outcomes.iter().all(|o| o.is_success()));
    let snap = metrics.snapshot();
    assert_eq!(snap.attempts, 16);
    assert_eq!(snap.successes, 16);
}

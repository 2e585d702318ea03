//! Synthesis gate: decide whether a cross-agent synthesis pass is worth running.

use crate::config::SynthesisConfig;
use crate::state::AgentState;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::info;

/// Outcome of the gate for one turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GateDecision {
    pub run: bool,
    pub reason: Option<String>,
    /// Successful agents, sorted. Empty when the gate skips before looking.
    pub agent_list: Vec<String>,
}

impl GateDecision {
    fn run(agent_list: Vec<String>, reason: impl Into<String>) -> Self {
        Self {
            run: true,
            reason: Some(reason.into()),
            agent_list,
        }
    }

    fn skip(agent_list: Vec<String>, reason: impl Into<String>) -> Self {
        Self {
            run: false,
            reason: Some(reason.into()),
            agent_list,
        }
    }
}

/// Apply the gate rules in order; the first one that applies decides.
pub fn should_run(state: &AgentState, config: &SynthesisConfig) -> GateDecision {
    let decision = evaluate(state, config);
    info!(
        run = decision.run,
        agents = decision.agent_list.len(),
        reason = decision.reason.as_deref().unwrap_or(""),
        "Synthesis gate decision"
    );
    decision
}

fn evaluate(state: &AgentState, config: &SynthesisConfig) -> GateDecision {
    if !config.enabled || !config.features.cross_agent_synthesis {
        return GateDecision::skip(Vec::new(), "Cross-agent synthesis is disabled");
    }

    let agents = state.successful_agents();
    if agents.is_empty() {
        return GateDecision::skip(agents, "No successful agents");
    }

    if config.features.safety_override && state.is_rob_unsafe() {
        return GateDecision::run(agents, "ROB safety check failed; synthesis forced");
    }

    let successful: BTreeSet<&str> = agents.iter().map(String::as_str).collect();

    let skip_match = config.skip_synthesis_combinations.iter().find(|combo| {
        let combo: BTreeSet<&str> = combo.iter().map(String::as_str).collect();
        combo == successful
    });
    if let Some(combo) = skip_match {
        let reason = format!("Agent combination [{}] is on the skip list", combo.join(", "));
        return GateDecision::skip(agents, reason);
    }

    let always_match = config
        .always_synthesize_combinations
        .iter()
        .find(|combo| combo.iter().all(|agent| successful.contains(agent.as_str())));
    if let Some(combo) = always_match {
        let reason = format!("Agent combination [{}] always synthesizes", combo.join(", "));
        return GateDecision::run(agents, reason);
    }

    if agents.len() < config.min_agents_for_synthesis {
        let reason = format!(
            "Only {} agents (need {})",
            agents.len(),
            config.min_agents_for_synthesis
        );
        return GateDecision::skip(agents, reason);
    }

    let reason = format!("{} successful agents", agents.len());
    GateDecision::run(agents, reason)
}

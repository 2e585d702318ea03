//! Synthesis prompt assembly.
//!
//! One fixed instruction template, filled with the user query, the agent list
//! and the compressed context, followed by zero or more domain focus blocks.

use crate::config::SynthesisFeatures;
use crate::state::{AgentState, fields, fields_for_agents};
use crate::synthesis::compressor::ContextCompressor;
use std::collections::BTreeSet;
use tracing::debug;

/// Agents whose output feeds regulatory cost analysis.
pub const COMPLIANCE_AGENTS: &[&str] = &[
    "compliance_agent",
    "cii_agent",
    "eu_ets_agent",
    "fueleu_agent",
    "eca_agent",
];

const BASE_TEMPLATE: &str = r#"You are a senior maritime operations analyst. Several specialist agents have
analyzed the user's request. Synthesize their results into one decision-ready
answer. Look for connections between the agents' findings that no single agent
could see on its own.

## User query
{user_query}

## Agents analyzed
{agent_list}

## Agent results
{agent_context}

## Instructions
1. Classify what the user needs as exactly one query_type:
   - "informational": they want facts or an explanation
   - "decision-required": they must choose an action
   - "validation": they ask whether a plan is feasible or safe
   - "comparison": they are choosing between named options
2. Fill in exactly one response object, under the key for that query_type:
   - informational: {"answer", "key_facts": [..], "additional_context"?}
   - decision: {"action", "primary_metric", "risk_level": "safe"|"caution"|"critical", "confidence": 0-100}
   - validation: {"result": "feasible"|"not_feasible"|"risky", "explanation", "consequence"?, "alternative"?}
   - comparison: {"winner", "winner_reason", "runner_up"?, "comparison_factors": [..]}
   The key for "decision-required" is "decision".
3. Set details_to_surface with these rules:
   - show_multi_port_analysis: true only when two or more bunker ports were compared
     and the choice between them changes cost materially
   - show_alternatives: true when the top option carries risk or the user asked to compare
   - show_rob_waypoints: true when any ROB check is unsafe or margins fall below 3 days
   - show_weather_details: true when weather raises consumption by more than 10% or
     forecasts severe conditions
   - show_eca_details: true when the route crosses an Emission Control Area that
     requires a fuel switch
4. List strategic_priorities ordered by importance, each with
   {"priority", "action", "why", "impact", "urgency": "immediate"|"today"|"this_week"}.
5. List critical_risks, each with
   {"risk", "severity": "critical"|"high", "consequence", "mitigation"}.
   Leave the list empty when nothing is critical.
6. Add cross_agent_connections and hidden_opportunities as short strings.
7. In synthesis_metadata give a confidence_score between 0 and 1 and a
   filtering_rationale {"why_surfaced": [..], "why_hidden": [..]}.

Respond with a single JSON object only. No prose before or after it."#;

const HULL_CII_FOCUS: &str = r#"## Focus: hull condition and CII
Hull performance and CII results are both present. Quantify how much of the
attained CII comes from hull fouling, state whether cleaning would change the
rating band, and weigh the cleaning cost against the fuel and rating benefit."#;

const COMPLIANCE_COST_FOCUS: &str = r#"## Focus: compliance cost
Several regulatory agents ran. Combine their findings into one compliance cost
picture (ECA fuel switching, EU ETS allowances, FuelEU penalties, CII exposure)
and call out trade-offs where cutting one cost raises another."#;

const SAFETY_FOCUS: &str = r#"## Focus: SAFETY
The ROB safety check FAILED for this voyage. Strategic priority 1 MUST address
the fuel shortfall with a concrete bunkering or routing action, urgency
"immediate", and the shortfall MUST appear in critical_risks with severity
"critical". Do not present cost savings ahead of this."#;

const WEATHER_BUNKER_FOCUS: &str = r#"## Focus: weather-adjusted bunkering
Bunker and weather results are both present. Check that recommended bunker
quantities include the weather-driven consumption increase and flag any
port whose margin disappears once weather is accounted for."#;

/// Build the full synthesis prompt.
pub fn build_prompt(
    state: &AgentState,
    agent_list: &[String],
    user_message: &str,
    features: &SynthesisFeatures,
) -> String {
    let extracted = fields_for_agents(agent_list);
    let context = ContextCompressor::new(features).compress(&extracted, state);
    let agents = if agent_list.is_empty() {
        "(none)".to_string()
    } else {
        agent_list.join(", ")
    };

    let mut prompt = render(
        BASE_TEMPLATE,
        &[
            ("user_query", user_message.trim()),
            ("agent_list", &agents),
            ("agent_context", &context),
        ],
    );

    for block in domain_blocks(state, agent_list, features) {
        prompt.push_str("\n\n");
        prompt.push_str(block);
    }

    debug!(
        agents = agent_list.len(),
        context_chars = context.chars().count(),
        prompt_chars = prompt.chars().count(),
        "Built synthesis prompt"
    );
    prompt
}

/// Domain focus blocks that apply to this agent set and state, in a fixed order.
pub fn domain_blocks(
    state: &AgentState,
    agent_list: &[String],
    features: &SynthesisFeatures,
) -> Vec<&'static str> {
    let agents: BTreeSet<&str> = agent_list.iter().map(String::as_str).collect();
    let mut blocks = Vec::new();

    if state.is_rob_unsafe() {
        blocks.push(SAFETY_FOCUS);
    }
    if !features.domain_focus {
        return blocks;
    }

    if agents.contains("hull_agent") && agents.contains("cii_agent") {
        blocks.push(HULL_CII_FOCUS);
    }
    let compliance_count = COMPLIANCE_AGENTS
        .iter()
        .filter(|agent| agents.contains(*agent))
        .count();
    if compliance_count >= 2 {
        blocks.push(COMPLIANCE_COST_FOCUS);
    }
    let has_weather = agents.contains("weather_agent") || state.has(fields::WEATHER_CONSUMPTION);
    if agents.contains("bunker_agent") && has_weather {
        blocks.push(WEATHER_BUNKER_FOCUS);
    }
    blocks
}

/// Substitute `{name}` placeholders found in `template`. Values are inserted
/// verbatim and never scanned for placeholders themselves.
fn render(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let replacement = after.find('}').and_then(|close| {
            let name = &after[..close];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });
        match replacement {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

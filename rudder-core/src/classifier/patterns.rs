//! Tier 1: deterministic classification of the raw user message.
//!
//! Three strategies run in order and the first match wins:
//! exact phrases (90), the route keyword heuristic (85), then an ordered
//! regex table whose entries carry their own confidence (75-82).

use super::{QueryClassification, QueryType};
use regex::Regex;
use std::sync::LazyLock;

pub const EXACT_PHRASE_CONFIDENCE: u8 = 90;
pub const ROUTE_KEYWORD_CONFIDENCE: u8 = 85;

/// Phrase tables, most specific query type first.
const EXACT_PHRASES: &[(QueryType, &[&str])] = &[
    (
        QueryType::CostComparison,
        &[
            "compare bunker prices",
            "compare fuel prices",
            "cheapest bunker",
            "cheapest port",
            "cheapest fuel",
            "cost comparison",
            "compare costs",
            "price comparison",
        ],
    ),
    (
        QueryType::BunkerPlanning,
        &[
            "bunker planning",
            "plan bunkering",
            "bunkering plan",
            "where should i bunker",
            "where to bunker",
            "bunker options",
            "bunkering options",
            "best port to bunker",
            "find bunker",
            "refuel",
            "fuel stop",
        ],
    ),
    (
        QueryType::WeatherAnalysis,
        &[
            "weather forecast",
            "weather along",
            "weather conditions",
            "weather impact",
            "sea state",
            "wave height",
            "storm",
        ],
    ),
    (
        QueryType::Validation,
        &[
            "can i make it",
            "can we make it",
            "is it safe",
            "is it feasible",
            "enough fuel",
            "can the vessel reach",
            "will we run out",
        ],
    ),
    (
        QueryType::DecisionRequired,
        &[
            "should i",
            "should we",
            "what do you recommend",
            "what would you recommend",
            "recommend a",
            "which option",
        ],
    ),
    (
        QueryType::Comparison,
        &[
            "compare vessels",
            "compare ships",
            "which vessel",
            "which ship",
            " versus ",
            " vs ",
        ],
    ),
    (
        QueryType::RouteOnly,
        &[
            "calculate route",
            "show route",
            "show me the route",
            "plan route",
            "plan a route",
            "plot route",
            "route only",
            "just the route",
            "distance between",
        ],
    ),
    (
        QueryType::Informational,
        &[
            "what is",
            "what are",
            "what does",
            "explain",
            "tell me about",
            "how does",
            "define",
        ],
    ),
];

/// Words that disqualify the bare "route" keyword heuristic.
const ROUTE_EXCLUSIONS: &[&str] = &[
    "bunker", "fuel", "cost", "price", "cheap", "compare", "weather",
];

static ROUTE_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\broutes?\b").expect("route word pattern is valid"));

/// Ordered regex table: (pattern, query type, confidence).
static REGEX_TABLE: LazyLock<Vec<(Regex, QueryType, u8)>> = LazyLock::new(|| {
    [
        (
            r"\b(cheapest|lowest|compare|comparing)\b.*\b(ports?|bunkers?|fuel|prices?)\b",
            QueryType::CostComparison,
            82,
        ),
        (
            r"\b(can|could|will|would)\s+(i|we|the\s+(vessel|ship))\b.*\b(reach|make|arrive|complete)\b",
            QueryType::Validation,
            80,
        ),
        (
            r"\b(bunker\w*|refuel\w*)\b.*\b(at|in|near|along|before|port)\b",
            QueryType::BunkerPlanning,
            80,
        ),
        (
            r"\b(winds?|waves?|swell|typhoon|hurricane|cyclone|monsoon|weather)\b",
            QueryType::WeatherAnalysis,
            78,
        ),
        (
            r"\bfrom\s+[a-z][a-z .'-]*\s+to\s+[a-z]",
            QueryType::RouteOnly,
            76,
        ),
        (
            r"\b(best|optimal|recommended)\b.*\b(option|choice|plan|strategy)\b",
            QueryType::DecisionRequired,
            76,
        ),
        (
            r"^(what|who|when|why|how)\b",
            QueryType::Informational,
            75,
        ),
    ]
    .into_iter()
    .map(|(pattern, query_type, confidence)| {
        (
            Regex::new(pattern).expect("tier 1 patterns are valid"),
            query_type,
            confidence,
        )
    })
    .collect()
});

/// Run Tier 1 against a message. A confidence of 0 means no match.
pub fn match_message(message: &str) -> QueryClassification {
    let lower = message.trim().to_lowercase();
    if lower.is_empty() {
        return no_match();
    }

    if let Some(result) = match_exact_phrase(&lower) {
        return result;
    }
    if let Some(result) = match_route_keyword(&lower) {
        return result;
    }
    if let Some(result) = match_regex_table(&lower) {
        return result;
    }
    no_match()
}

fn match_exact_phrase(lower: &str) -> Option<QueryClassification> {
    // Pad so phrases with boundary spaces (" vs ") also match at the edges.
    let padded = format!(" {lower} ");
    for (query_type, phrases) in EXACT_PHRASES {
        if let Some(phrase) = phrases.iter().find(|p| padded.contains(*p)) {
            return Some(QueryClassification::new(
                *query_type,
                EXACT_PHRASE_CONFIDENCE,
                "tier1-exact",
                format!("Matched phrase '{}'", phrase.trim()),
            ));
        }
    }
    None
}

fn match_route_keyword(lower: &str) -> Option<QueryClassification> {
    if !ROUTE_WORD.is_match(lower) {
        return None;
    }
    if ROUTE_EXCLUSIONS.iter().any(|word| lower.contains(word)) {
        return None;
    }
    Some(QueryClassification::new(
        QueryType::RouteOnly,
        ROUTE_KEYWORD_CONFIDENCE,
        "tier1-keyword",
        "Mentions a route with no fuel, cost, or weather terms",
    ))
}

fn match_regex_table(lower: &str) -> Option<QueryClassification> {
    REGEX_TABLE
        .iter()
        .find(|(pattern, _, _)| pattern.is_match(lower))
        .map(|(pattern, query_type, confidence)| {
            QueryClassification::new(
                *query_type,
                *confidence,
                "tier1-regex",
                format!("Matched pattern /{}/", pattern.as_str()),
            )
        })
}

fn no_match() -> QueryClassification {
    QueryClassification::new(
        QueryType::Informational,
        0,
        "tier1-none",
        "No tier 1 pattern matched",
    )
}

//! Cross-agent synthesis.
//!
//! `SynthesisEngine::synthesize` runs one turn through the pipeline:
//! classify, gate, compress and prompt, call the model, validate. Every
//! outcome (completed, skipped, failed) comes back as a value; nothing in
//! here returns an error or panics past its own boundary.

pub mod compressor;
pub mod gate;
pub mod migration;
pub mod prompt;
pub mod schema;
pub mod validator;

pub use compressor::{ContextCompressor, MAX_CONTEXT_CHARS, TRUNCATION_MARKER};
pub use gate::{GateDecision, should_run};
pub use migration::{RationaleToWhy, SchemaAdapter};
pub use prompt::build_prompt;
pub use schema::{InsightResponse, ResponseQueryType, SynthesizedInsights};
pub use validator::ResponseValidator;

use crate::brain::LlmProvider;
use crate::classifier::{QueryClassification, QueryClassifier};
use crate::config::SynthesisConfig;
use crate::error::{LlmError, ValidationError};
use crate::metrics::MetricsSink;
use crate::providers::{model_pricing, with_retry};
use crate::state::AgentState;
use crate::types::{CompletionRequest, CompletionResponse, CostEstimate, Message, TokenUsage};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const SYSTEM_PROMPT: &str = "You are a maritime operations analyst. You answer with a single JSON object that follows the requested schema exactly.";

/// Why a synthesis attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// The provider returned an error.
    Llm,
    /// The call exceeded `timeout_seconds`.
    Timeout,
    /// The model answered in the wrong shape.
    Validation,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Llm => write!(f, "llm"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Validation => write!(f, "validation"),
        }
    }
}

/// A completed synthesis pass.
#[derive(Debug, Clone)]
pub struct SynthesisReport {
    pub insights: SynthesizedInsights,
    pub classification: QueryClassification,
    pub usage: TokenUsage,
    pub cost_usd: f64,
    pub latency_ms: u64,
}

/// A failed synthesis pass. The caller still delivers the base agent answer.
#[derive(Debug, Clone)]
pub struct SynthesisFailure {
    pub kind: FailureKind,
    pub message: String,
    pub classification: QueryClassification,
}

/// Result of one `synthesize` call.
#[derive(Debug, Clone)]
pub enum SynthesisOutcome {
    Completed(Box<SynthesisReport>),
    Skipped {
        reason: String,
        classification: QueryClassification,
    },
    Failed(SynthesisFailure),
}

impl SynthesisOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SynthesisOutcome::Completed(_))
    }

    pub fn classification(&self) -> &QueryClassification {
        match self {
            SynthesisOutcome::Completed(report) => &report.classification,
            SynthesisOutcome::Skipped { classification, .. } => classification,
            SynthesisOutcome::Failed(failure) => &failure.classification,
        }
    }

    pub fn insights(&self) -> Option<&SynthesizedInsights> {
        match self {
            SynthesisOutcome::Completed(report) => Some(&report.insights),
            _ => None,
        }
    }
}

/// Orchestrates one synthesis turn over a provider and a metrics sink.
pub struct SynthesisEngine {
    provider: Arc<dyn LlmProvider>,
    config: SynthesisConfig,
    metrics: Arc<dyn MetricsSink>,
    classifier: QueryClassifier,
    validator: ResponseValidator,
}

impl SynthesisEngine {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        config: SynthesisConfig,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        let classifier = QueryClassifier::new(config.classifier);
        let validator = ResponseValidator::new(config.llm.model.clone());
        Self {
            provider,
            config,
            metrics,
            classifier,
            validator,
        }
    }

    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    /// Classify only, without gating or calling the model.
    pub fn classify(&self, message: &str, state: &AgentState) -> QueryClassification {
        self.classifier.classify(message, state)
    }

    /// Run the full pipeline for one user turn.
    pub async fn synthesize(&self, message: &str, state: &AgentState) -> SynthesisOutcome {
        let classification = self.classifier.classify(message, state);

        let decision = should_run(state, &self.config);
        if !decision.run {
            self.metrics.record_skipped();
            return SynthesisOutcome::Skipped {
                reason: decision
                    .reason
                    .unwrap_or_else(|| "Synthesis not required".to_string()),
                classification,
            };
        }

        self.metrics.record_attempt();
        let started = Instant::now();

        let prompt = build_prompt(state, &decision.agent_list, message, &self.config.features);
        let request = CompletionRequest {
            messages: vec![Message::system(SYSTEM_PROMPT), Message::user(prompt)],
            temperature: self.config.llm.temperature,
            max_tokens: Some(self.config.llm.max_tokens),
            model: Some(self.config.llm.model.clone()),
        };

        let response = match self.call_model(request).await {
            Ok(response) => response,
            Err(error) => {
                let kind = match error {
                    LlmError::Timeout { .. } => FailureKind::Timeout,
                    _ => FailureKind::Llm,
                };
                return self.fail(kind, error.to_string(), classification);
            }
        };
        debug!(
            model = response.model.as_str(),
            total_tokens = response.usage.total(),
            "Synthesis reply received"
        );

        let insights = match self
            .validator
            .validate(response.message.text(), &decision.agent_list)
        {
            Ok(insights) => insights,
            Err(error) => return self.fail(FailureKind::Validation, error.to_string(), classification),
        };

        let score = insights.synthesis_metadata.confidence_score;
        if score < self.config.min_confidence_score {
            let error = ValidationError::LowConfidence {
                score,
                minimum: self.config.min_confidence_score,
            };
            return self.fail(FailureKind::Validation, error.to_string(), classification);
        }

        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let cost_usd = self.cost_of(&response);
        self.metrics.record_success(cost_usd, latency_ms);

        info!(
            query_type = %insights.query_type(),
            agents = decision.agent_list.len(),
            priorities = insights.strategic_priorities.len(),
            risks = insights.critical_risks.len(),
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            cost_usd,
            latency_ms,
            "Synthesis completed"
        );

        SynthesisOutcome::Completed(Box::new(SynthesisReport {
            insights,
            classification,
            usage: response.usage,
            cost_usd,
            latency_ms,
        }))
    }

    /// One bounded call: transient errors are retried inside the timeout budget.
    async fn call_model(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let budget = Duration::from_secs(self.config.timeout_seconds);
        let call = with_retry(&self.config.llm, || {
            let provider = Arc::clone(&self.provider);
            let request = request.clone();
            async move { provider.complete(request).await }
        });
        match tokio::time::timeout(budget, call).await {
            Ok(result) => result,
            Err(_) => Err(LlmError::Timeout {
                timeout_secs: self.config.timeout_seconds,
            }),
        }
    }

    /// Priced from the model that answered, falling back to the configured one.
    fn cost_of(&self, response: &CompletionResponse) -> f64 {
        let pricing =
            model_pricing(&response.model).or_else(|| model_pricing(&self.config.llm.model));
        match pricing {
            Some((input, output)) => CostEstimate::from_usage(&response.usage, input, output).total(),
            None => {
                warn!(model = response.model.as_str(), "No pricing for model, cost recorded as 0");
                0.0
            }
        }
    }

    fn fail(
        &self,
        kind: FailureKind,
        message: String,
        classification: QueryClassification,
    ) -> SynthesisOutcome {
        warn!(kind = %kind, error = message.as_str(), "Synthesis failed");
        self.metrics.record_failure(kind);
        SynthesisOutcome::Failed(SynthesisFailure {
            kind,
            message,
            classification,
        })
    }
}

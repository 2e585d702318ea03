//! # Rudder Core
//!
//! Query classification and cross-agent synthesis for the Rudder maritime
//! operations assistant. Decides what kind of answer a user wants, whether a
//! synthesis pass over the specialist agents' results is worth its cost, and
//! turns the model's reply into validated `SynthesizedInsights`.

pub mod brain;
pub mod classifier;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod providers;
pub mod state;
pub mod synthesis;
pub mod types;

// Re-export commonly used types at the crate root.
pub use brain::{LlmProvider, MockLlmProvider};
pub use classifier::{QueryClassification, QueryClassifier, QueryType};
pub use config::{
    ClassifierConfig, LlmSettings, SynthesisConfig, SynthesisFeatures, load_config,
};
pub use error::{ConfigError, LlmError, ValidationError};
pub use logging::{LogFormat, init_tracing};
pub use metrics::{MetricsSink, MetricsSnapshot, SynthesisMetrics};
pub use providers::{AnthropicProvider, model_pricing};
pub use state::{AgentState, AgentStatus, AgentSuccessMap};
pub use synthesis::{
    FailureKind, GateDecision, ResponseValidator, SynthesisEngine, SynthesisFailure,
    SynthesisOutcome, SynthesisReport, SynthesizedInsights, build_prompt, should_run,
};
pub use types::{CompletionRequest, CompletionResponse, CostEstimate, Message, Role, TokenUsage};

//! Error types for the Rudder synthesis core.
//!
//! Uses `thiserror` for public API error types. LLM invocation failures
//! (`LlmError`), reply-shape failures (`ValidationError`) and configuration
//! failures (`ConfigError`) are separate enums, one per layer.

/// Errors from LLM provider interactions.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("API request failed: {message}")]
    ApiRequest { message: String },

    #[error("API response parse error: {message}")]
    ResponseParse { message: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Provider connection failed: {message}")]
    Connection { message: String },
}

impl LlmError {
    /// Whether a retry of the same request could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LlmError::Connection { .. } | LlmError::RateLimited { .. }
        )
    }
}

/// Errors from validating the structured synthesis reply.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Response is not valid JSON: {message}")]
    Parse { message: String },

    #[error("Response JSON is not an object")]
    NotAnObject,

    #[error("Invalid query_type: {found}")]
    InvalidQueryType { found: String },

    #[error("Missing or empty response.{key} for query_type '{query_type}'")]
    MissingResponse { query_type: String, key: String },

    #[error("Response variant '{variant}' is missing required field '{field}'")]
    MissingField { variant: String, field: String },

    #[error("Confidence score {score:.2} is below the minimum {minimum:.2}")]
    LowConfidence { score: f64, minimum: f64 },
}

/// Errors from the configuration layer.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Configuration parse error: {message}")]
    ParseError { message: String },
}

//! Anthropic Messages API provider implementation.
//!
//! Implements the `LlmProvider` trait for the native Anthropic Messages API.
//! Synthesis only needs plain text completions, so tool use and streaming are
//! not wired up here.
//!
//! Key differences from OpenAI-compatible APIs:
//! - Auth via `x-api-key` header (not `Authorization: Bearer`)
//! - Required `anthropic-version` header
//! - System message is a top-level `system` field, not in the messages array

use crate::brain::LlmProvider;
use crate::config::LlmSettings;
use crate::error::LlmError;
use crate::types::{CompletionRequest, CompletionResponse, Message, Role, TokenUsage};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

/// The default Anthropic API base URL.
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";

/// The required Anthropic API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Messages API provider.
pub struct AnthropicProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: usize,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider with an explicitly provided API key.
    ///
    /// Credentials are resolved by the host application; an empty key is
    /// reported as `LlmError::AuthFailed` rather than sent upstream.
    pub fn new_with_key(settings: &LlmSettings, api_key: impl Into<String>) -> Result<Self, LlmError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LlmError::AuthFailed {
                provider: "Anthropic (no API key configured)".to_string(),
            });
        }

        let base_url = settings
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(Self {
            client: Client::new(),
            base_url,
            api_key,
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
        })
    }

    /// Build the JSON request body for the Anthropic Messages API.
    ///
    /// System messages are concatenated into the top-level `system` field.
    fn build_request_body(&self, request: &CompletionRequest) -> Value {
        let model = request.model.as_deref().unwrap_or(&self.model);
        let max_tokens = request.max_tokens.unwrap_or(self.max_tokens);

        let system_text: Vec<&str> = request
            .messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.text())
            .collect();

        let messages_json: Vec<Value> = request
            .messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| {
                serde_json::json!({
                    "role": m.role.to_string(),
                    "content": m.text(),
                })
            })
            .collect();

        let mut body = serde_json::json!({
            "model": model,
            "max_tokens": max_tokens,
            "temperature": request.temperature,
            "messages": messages_json,
        });

        if !system_text.is_empty() {
            body["system"] = Value::String(system_text.join("\n\n"));
        }

        body
    }

    /// Parse a non-streaming Anthropic response body.
    ///
    /// All `text` content blocks are concatenated in order.
    fn parse_response(body: &Value) -> Result<CompletionResponse, LlmError> {
        let model = body["model"].as_str().unwrap_or("unknown").to_string();
        let finish_reason = body["stop_reason"].as_str().map(|s| s.to_string());

        let usage = TokenUsage {
            input_tokens: body["usage"]["input_tokens"].as_u64().unwrap_or(0) as usize,
            output_tokens: body["usage"]["output_tokens"].as_u64().unwrap_or(0) as usize,
        };

        let content_blocks = body["content"]
            .as_array()
            .ok_or_else(|| LlmError::ResponseParse {
                message: "Missing 'content' array in response".to_string(),
            })?;

        let text: String = content_blocks
            .iter()
            .filter(|block| block["type"].as_str().unwrap_or("text") == "text")
            .filter_map(|block| block["text"].as_str())
            .collect();

        Ok(CompletionResponse {
            message: Message::assistant(text),
            usage,
            model,
            finish_reason,
        })
    }

    /// Map an HTTP error status to the appropriate `LlmError` variant.
    fn map_http_error(status: reqwest::StatusCode, body_text: &str) -> LlmError {
        match status.as_u16() {
            401 | 403 => LlmError::AuthFailed {
                provider: "Anthropic".to_string(),
            },
            429 => {
                let retry_after = serde_json::from_str::<Value>(body_text)
                    .ok()
                    .and_then(|v| v["error"]["retry_after_secs"].as_u64())
                    .unwrap_or(30);
                LlmError::RateLimited {
                    retry_after_secs: retry_after,
                }
            }
            500..=599 => LlmError::Connection {
                message: format!("HTTP {} from Anthropic API: {}", status, body_text),
            },
            _ => LlmError::ApiRequest {
                message: format!("HTTP {} from Anthropic API: {}", status, body_text),
            },
        }
    }

    /// Map a transport-level `reqwest` failure.
    fn map_transport_error(err: reqwest::Error) -> LlmError {
        if err.is_timeout() {
            LlmError::Timeout { timeout_secs: 0 }
        } else if err.is_connect() {
            LlmError::Connection {
                message: format!("Could not reach Anthropic API: {}", err),
            }
        } else {
            LlmError::ApiRequest {
                message: format!("Request to Anthropic API failed: {}", err),
            }
        }
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let body = self.build_request_body(&request);
        let url = format!("{}/messages", self.base_url);

        debug!(
            model = self.model.as_str(),
            url = url.as_str(),
            "Sending Anthropic completion request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(Self::map_transport_error)?;

        let status = response.status();
        let body_text = response.text().await.map_err(|e| LlmError::ResponseParse {
            message: format!("Failed to read response body: {}", e),
        })?;

        if !status.is_success() {
            return Err(Self::map_http_error(status, &body_text));
        }

        let response_json: Value =
            serde_json::from_str(&body_text).map_err(|e| LlmError::ResponseParse {
                message: format!("Invalid JSON in response: {}", e),
            })?;

        Self::parse_response(&response_json)
    }
}

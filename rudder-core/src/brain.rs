//! Brain module: LLM provider abstraction.
//!
//! Defines the `LlmProvider` trait the synthesis engine calls through, and a
//! `MockLlmProvider` used by tests and offline development.

use crate::error::LlmError;
use crate::types::{CompletionRequest, CompletionResponse, Message, TokenUsage};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Trait for LLM providers.
///
/// The synthesis core treats the model as an opaque text-completion service:
/// one request in, one text completion plus token usage out.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Perform a full completion and return the response.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}

/// A queued mock outcome.
enum MockReply {
    Response(CompletionResponse),
    Error(LlmError),
}

/// A mock LLM provider for testing and development.
pub struct MockLlmProvider {
    replies: Mutex<Vec<MockReply>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockLlmProvider {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(Vec::new()),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Create a MockLlmProvider that always returns the given text.
    ///
    /// Queues multiple copies of the response so it can handle multiple calls.
    pub fn with_response(text: &str) -> Self {
        let provider = Self::new();
        for _ in 0..20 {
            provider.queue_response(Self::text_response(text));
        }
        provider
    }

    /// Sleep for `delay` before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a response to be returned by the next `complete` call.
    pub fn queue_response(&self, response: CompletionResponse) {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(MockReply::Response(response));
    }

    /// Queue an error to be returned by the next `complete` call.
    pub fn queue_error(&self, error: LlmError) {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(MockReply::Error(error));
    }

    /// Number of `complete` calls received so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Create a simple text response for testing.
    pub fn text_response(text: &str) -> CompletionResponse {
        CompletionResponse {
            message: Message::assistant(text),
            usage: TokenUsage {
                input_tokens: 100,
                output_tokens: 50,
            },
            model: "mock-model".to_string(),
            finish_reason: Some("stop".to_string()),
        }
    }
}

impl Default for MockLlmProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = {
            let mut replies = self.replies.lock().unwrap_or_else(PoisonError::into_inner);
            if replies.is_empty() {
                None
            } else {
                Some(replies.remove(0))
            }
        };
        match next {
            Some(MockReply::Response(response)) => Ok(response),
            Some(MockReply::Error(error)) => Err(error),
            None => Ok(MockLlmProvider::text_response(
                "I'm a mock LLM. No queued responses available.",
            )),
        }
    }
}

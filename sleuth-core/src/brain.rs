//! Brain module: text-generation collaborator abstraction.
//!
//! Defines the `LlmProvider` trait the research stages talk to, the request and
//! response types that cross that boundary, and a queue-driven mock for tests.

use crate::error::LlmError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;

/// A single text-generation request: one system instruction, one user prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<usize>,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
            temperature: None,
            max_tokens: None,
        }
    }
}

/// Token usage reported by a provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// The text produced for a `CompletionRequest`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub text: String,
    pub model: String,
    pub usage: TokenUsage,
    pub finish_reason: Option<String>,
}

/// Trait for text-generation providers.
///
/// Implementations are stateless service handles and may be shared across
/// concurrent research runs.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Perform a full completion and return the response.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;

    /// Return the model name.
    fn model_name(&self) -> &str;

    /// Convenience wrapper: system instruction plus prompt in, text out.
    async fn generate(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        let response = self.complete(CompletionRequest::new(system, prompt)).await?;
        Ok(response.text)
    }
}

/// A mock LLM provider for testing and development.
///
/// Returns queued results in FIFO order and records every request it receives.
pub struct MockLlmProvider {
    model: String,
    responses: Mutex<VecDeque<Result<String, LlmError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
    fallback: String,
}

impl MockLlmProvider {
    pub fn new() -> Self {
        Self {
            model: "mock-model".to_string(),
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            fallback: "I'm a mock LLM. No queued responses available.".to_string(),
        }
    }

    /// Create a MockLlmProvider that always answers with the given text.
    pub fn with_response(text: &str) -> Self {
        Self {
            fallback: text.to_string(),
            ..Self::new()
        }
    }

    /// Queue a text response for the next `complete` call.
    pub fn queue_response(&self, text: impl Into<String>) {
        self.responses.lock().unwrap().push_back(Ok(text.into()));
    }

    /// Queue a failure for the next `complete` call.
    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// All requests received so far.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of `complete` calls received so far.
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Default for MockLlmProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let input_tokens = (request.system.len() + request.prompt.len()) / 4;
        self.requests.lock().unwrap().push(request);
        let next = self.responses.lock().unwrap().pop_front();
        let text = match next {
            Some(result) => result?,
            None => self.fallback.clone(),
        };
        Ok(CompletionResponse {
            usage: TokenUsage {
                input_tokens,
                output_tokens: text.len() / 4,
            },
            text,
            model: self.model.clone(),
            finish_reason: Some("stop".to_string()),
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_provider_default_response() {
        let provider = MockLlmProvider::new();
        let text = provider.generate("system", "hello").await.unwrap();
        assert!(text.contains("mock LLM"));
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_provider_queue_order() {
        let provider = MockLlmProvider::new();
        provider.queue_response("first");
        provider.queue_error(LlmError::Timeout { timeout_secs: 5 });
        provider.queue_response("third");

        assert_eq!(provider.generate("s", "p").await.unwrap(), "first");
        assert_eq!(
            provider.generate("s", "p").await.unwrap_err(),
            LlmError::Timeout { timeout_secs: 5 }
        );
        assert_eq!(provider.generate("s", "p").await.unwrap(), "third");
    }

    #[tokio::test]
    async fn test_mock_provider_records_requests() {
        let provider = MockLlmProvider::with_response("ok");
        provider.generate("be terse", "what is rust?").await.unwrap();
        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].system, "be terse");
        assert_eq!(requests[0].prompt, "what is rust?");
    }
}

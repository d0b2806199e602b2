//! Anthropic Messages API provider implementation.
//!
//! Implements the `LlmProvider` trait for the native Anthropic Messages API.
//!
//! Key differences from OpenAI-compatible APIs:
//! - Auth via `x-api-key` header (not `Authorization: Bearer`)
//! - Required `anthropic-version` header
//! - System instruction is a top-level `system` field, not in the messages array

use crate::brain::{CompletionRequest, CompletionResponse, LlmProvider, TokenUsage};
use crate::config::LlmConfig;
use crate::error::LlmError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
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
    temperature: f32,
    timeout_secs: u64,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider with an explicitly provided API key.
    pub fn new(config: &LlmConfig, api_key: impl Into<String>) -> Result<Self, LlmError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LlmError::AuthFailed {
                provider: "Anthropic (empty API key)".to_string(),
            });
        }

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Connection {
                message: format!("Failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url,
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            timeout_secs: config.timeout_secs,
        })
    }

    /// Build the JSON request body for the Anthropic Messages API.
    fn build_request_body(&self, request: &CompletionRequest) -> Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "max_tokens": request.max_tokens.unwrap_or(self.max_tokens),
            "temperature": request.temperature.unwrap_or(self.temperature),
            "messages": [{
                "role": "user",
                "content": [{ "type": "text", "text": request.prompt }],
            }],
        });

        if !request.system.is_empty() {
            body["system"] = Value::String(request.system.clone());
        }

        body
    }

    /// Parse an Anthropic API response JSON into a `CompletionResponse`.
    ///
    /// Text blocks are concatenated; other block types are ignored.
    fn parse_response(body: &Value) -> Result<CompletionResponse, LlmError> {
        let model = body["model"].as_str().unwrap_or("unknown").to_string();
        let finish_reason = body["stop_reason"].as_str().map(|s| s.to_string());

        let usage = TokenUsage {
            input_tokens: body["usage"]["input_tokens"].as_u64().unwrap_or(0) as usize,
            output_tokens: body["usage"]["output_tokens"].as_u64().unwrap_or(0) as usize,
        };

        let blocks = body["content"]
            .as_array()
            .ok_or_else(|| LlmError::ResponseParse {
                message: "Missing 'content' array in response".to_string(),
            })?;

        let mut text = String::new();
        for block in blocks {
            match block["type"].as_str().unwrap_or("text") {
                "text" => text.push_str(block["text"].as_str().unwrap_or("")),
                other => debug!(block_type = other, "Ignoring non-text content block"),
            }
        }

        Ok(CompletionResponse {
            text,
            model,
            usage,
            finish_reason,
        })
    }

    /// Map an HTTP status code to the appropriate `LlmError`.
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
            _ => LlmError::ApiRequest {
                message: format!("HTTP {} from Anthropic API: {}", status, body_text),
            },
        }
    }

    /// Map a transport-level reqwest failure.
    fn map_transport_error(&self, err: reqwest::Error) -> LlmError {
        if err.is_timeout() {
            LlmError::Timeout {
                timeout_secs: self.timeout_secs,
            }
        } else if err.is_connect() {
            LlmError::Connection {
                message: err.to_string(),
            }
        } else {
            LlmError::ApiRequest {
                message: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let body = self.build_request_body(&request);
        let url = format!("{}/messages", self.base_url);

        debug!(model = %self.model, prompt_len = request.prompt.len(), "Sending Anthropic request");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        let body_text = response
            .text()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        if !status.is_success() {
            return Err(Self::map_http_error(status, &body_text));
        }

        let json: Value = serde_json::from_str(&body_text).map_err(|e| LlmError::ResponseParse {
            message: format!("Invalid JSON from Anthropic API: {e}"),
        })?;

        Self::parse_response(&json)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_provider() -> AnthropicProvider {
        AnthropicProvider::new(&LlmConfig::default(), "test-key").unwrap()
    }

    #[test]
    fn test_empty_key_rejected() {
        let result = AnthropicProvider::new(&LlmConfig::default(), "  ");
        assert!(matches!(result, Err(LlmError::AuthFailed { .. })));
    }

    #[test]
    fn test_build_request_body() {
        let provider = make_provider();
        let request = CompletionRequest::new("You are terse.", "Explain CRDTs");
        let body = provider.build_request_body(&request);

        assert_eq!(body["model"], "claude-3-haiku-20240307");
        assert_eq!(body["system"], "You are terse.");
        assert_eq!(body["max_tokens"], 4096);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"][0]["text"], "Explain CRDTs");
    }

    #[test]
    fn test_build_request_body_without_system() {
        let provider = make_provider();
        let body = provider.build_request_body(&CompletionRequest::new("", "hi"));
        assert!(body.get("system").is_none());
    }

    #[test]
    fn test_parse_response_concatenates_text_blocks() {
        let body = serde_json::json!({
            "model": "claude-3-haiku-20240307",
            "stop_reason": "end_turn",
            "usage": { "input_tokens": 12, "output_tokens": 7 },
            "content": [
                { "type": "text", "text": "Hello, " },
                { "type": "tool_use", "id": "t1", "name": "x", "input": {} },
                { "type": "text", "text": "world" }
            ]
        });
        let response = AnthropicProvider::parse_response(&body).unwrap();
        assert_eq!(response.text, "Hello, world");
        assert_eq!(response.usage.input_tokens, 12);
        assert_eq!(response.finish_reason.as_deref(), Some("end_turn"));
    }

    #[test]
    fn test_parse_response_missing_content() {
        let body = serde_json::json!({ "model": "m" });
        assert!(matches!(
            AnthropicProvider::parse_response(&body),
            Err(LlmError::ResponseParse { .. })
        ));
    }

    #[test]
    fn test_map_http_error() {
        let err = AnthropicProvider::map_http_error(reqwest::StatusCode::UNAUTHORIZED, "");
        assert!(matches!(err, LlmError::AuthFailed { .. }));

        let err = AnthropicProvider::map_http_error(
            reqwest::StatusCode::TOO_MANY_REQUESTS,
            r#"{"error":{"retry_after_secs":12}}"#,
        );
        assert_eq!(
            err,
            LlmError::RateLimited {
                retry_after_secs: 12
            }
        );

        // 429 without retry_after_secs defaults to 30.
        let err = AnthropicProvider::map_http_error(reqwest::StatusCode::TOO_MANY_REQUESTS, "{}");
        assert_eq!(
            err,
            LlmError::RateLimited {
                retry_after_secs: 30
            }
        );

        let err =
            AnthropicProvider::map_http_error(reqwest::StatusCode::INTERNAL_SERVER_ERROR, "boom");
        assert!(matches!(err, LlmError::ApiRequest { .. }));
    }
}

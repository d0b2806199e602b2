//! Tavily search API client.
//!
//! Implements `SearchProvider` over Tavily's JSON `/search` endpoint.

use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::search::{SearchHit, SearchProvider};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api.tavily.com";

/// Tavily search client.
pub struct TavilySearch {
    client: Client,
    base_url: String,
    api_key: String,
    search_depth: String,
    timeout_secs: u64,
}

impl TavilySearch {
    /// Create a client with an explicitly provided API key.
    pub fn new(config: &SearchConfig, api_key: impl Into<String>) -> Result<Self, SearchError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(SearchError::AuthFailed {
                provider: "Tavily (empty API key)".to_string(),
            });
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("Sleuth/0.1")
            .build()
            .map_err(|e| SearchError::Connection {
                message: format!("Failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key,
            search_depth: config.search_depth.clone(),
            timeout_secs: config.timeout_secs,
        })
    }

    fn build_request_body(&self, query: &str, max_results: usize) -> Value {
        serde_json::json!({
            "api_key": self.api_key,
            "query": query,
            "search_depth": self.search_depth,
            "max_results": max_results,
        })
    }

    /// Parse Tavily's `results` array. Entries without a URL are skipped.
    fn parse_response(body: &Value) -> Result<Vec<SearchHit>, SearchError> {
        let results = body["results"]
            .as_array()
            .ok_or_else(|| SearchError::ResponseParse {
                message: "Missing 'results' array in response".to_string(),
            })?;

        Ok(results
            .iter()
            .filter_map(|item| {
                let url = item["url"].as_str()?.to_string();
                Some(SearchHit {
                    url,
                    title: item["title"].as_str().map(|s| s.to_string()),
                    content: item["content"].as_str().unwrap_or("").to_string(),
                    score: item["score"].as_f64(),
                })
            })
            .collect())
    }

    fn map_http_error(status: reqwest::StatusCode, body_text: &str) -> SearchError {
        match status.as_u16() {
            401 | 403 => SearchError::AuthFailed {
                provider: "Tavily".to_string(),
            },
            429 | 432 | 433 => SearchError::QuotaExceeded {
                message: format!("HTTP {status}: {body_text}"),
            },
            _ => SearchError::Request {
                message: format!("HTTP {status} from Tavily: {body_text}"),
            },
        }
    }

    fn map_transport_error(&self, err: reqwest::Error) -> SearchError {
        if err.is_timeout() {
            SearchError::Timeout {
                timeout_secs: self.timeout_secs,
            }
        } else if err.is_connect() {
            SearchError::Connection {
                message: err.to_string(),
            }
        } else {
            SearchError::Request {
                message: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl SearchProvider for TavilySearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
        let url = format!("{}/search", self.base_url);
        debug!(query, max_results, "Sending Tavily search");

        let response = self
            .client
            .post(&url)
            .json(&self.build_request_body(query, max_results))
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

        let json: Value =
            serde_json::from_str(&body_text).map_err(|e| SearchError::ResponseParse {
                message: format!("Invalid JSON from Tavily: {e}"),
            })?;

        let mut hits = Self::parse_response(&json)?;
        hits.truncate(max_results);
        Ok(hits)
    }

    fn name(&self) -> &str {
        "tavily"
    }
}

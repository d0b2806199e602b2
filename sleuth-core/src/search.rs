//! Web-search collaborator abstraction.
//!
//! The research core only needs ranked documents for a query; how they are
//! ranked is the provider's business.

use crate::error::SearchError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

/// A single ranked document returned by a search provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub url: String,
    pub title: Option<String>,
    pub content: String,
    /// Provider relevance score, nominally 0.0-1.0.
    pub score: Option<f64>,
}

/// Trait for web-search providers.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Search for `query`, returning at most `max_results` hits.
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError>;

    /// Provider name for logs and trace messages.
    fn name(&self) -> &str;
}

/// How evidence for a sub-query was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// Real results from the search collaborator.
    Live,
    /// Text fabricated by the text-generation collaborator.
    Simulated,
}

impl std::fmt::Display for SearchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchMode::Live => write!(f, "live"),
            SearchMode::Simulated => write!(f, "simulated"),
        }
    }
}

/// Caller preference for the search mode of a research run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchPreference {
    /// Live when a search provider is configured, simulated otherwise.
    #[default]
    Auto,
    /// Live; degrades to simulated when no provider is configured.
    Live,
    /// Always simulated.
    Simulated,
}

impl SearchPreference {
    /// Resolve the preference against provider availability.
    pub fn resolve(self, provider_available: bool) -> SearchMode {
        match self {
            SearchPreference::Simulated => SearchMode::Simulated,
            SearchPreference::Auto | SearchPreference::Live if provider_available => {
                SearchMode::Live
            }
            SearchPreference::Auto | SearchPreference::Live => SearchMode::Simulated,
        }
    }
}

impl std::str::FromStr for SearchPreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(SearchPreference::Auto),
            "live" => Ok(SearchPreference::Live),
            "simulated" | "sim" => Ok(SearchPreference::Simulated),
            other => Err(format!(
                "unknown search mode '{other}' (expected auto, live or simulated)"
            )),
        }
    }
}

/// A mock search provider for testing.
///
/// Returns canned hits per query and can be told to fail for specific queries.
#[derive(Default)]
pub struct MockSearchProvider {
    hits: HashMap<String, Vec<SearchHit>>,
    failures: HashMap<String, SearchError>,
    queries: Mutex<Vec<String>>,
}

impl MockSearchProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register hits for a query.
    pub fn with_hits(mut self, query: impl Into<String>, hits: Vec<SearchHit>) -> Self {
        self.hits.insert(query.into(), hits);
        self
    }

    /// Make searches for `query` fail with `error`.
    pub fn failing_on(mut self, query: impl Into<String>, error: SearchError) -> Self {
        self.failures.insert(query.into(), error);
        self
    }

    /// Build a hit with a score, for tests.
    pub fn hit(url: &str, title: &str, content: &str, score: f64) -> SearchHit {
        SearchHit {
            url: url.to_string(),
            title: Some(title.to_string()),
            content: content.to_string(),
            score: Some(score),
        }
    }

    /// Queries received so far, in order.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchProvider for MockSearchProvider {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
        self.queries.lock().unwrap().push(query.to_string());
        if let Some(err) = self.failures.get(query) {
            return Err(err.clone());
        }
        let hits = match self.hits.get(query) {
            Some(hits) => hits.clone(),
            None => vec![Self::hit(
                &format!("https://example.com/{}", query.len()),
                query,
                &format!("Mock result for {query}"),
                0.5,
            )],
        };
        Ok(hits.into_iter().take(max_results).collect())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preference_resolution() {
        assert_eq!(SearchPreference::Auto.resolve(true), SearchMode::Live);
        assert_eq!(SearchPreference::Auto.resolve(false), SearchMode::Simulated);
        assert_eq!(SearchPreference::Live.resolve(false), SearchMode::Simulated);
        assert_eq!(SearchPreference::Simulated.resolve(true), SearchMode::Simulated);
    }

    #[test]
    fn test_preference_from_str() {
        assert_eq!("LIVE".parse::<SearchPreference>(), Ok(SearchPreference::Live));
        assert_eq!("sim".parse::<SearchPreference>(), Ok(SearchPreference::Simulated));
        assert!("web".parse::<SearchPreference>().is_err());
    }

    #[tokio::test]
    async fn test_mock_search_limits_results() {
        let provider = MockSearchProvider::new().with_hits(
            "rust",
            vec![
                MockSearchProvider::hit("https://a", "A", "a", 0.9),
                MockSearchProvider::hit("https://b", "B", "b", 0.8),
                MockSearchProvider::hit("https://c", "C", "c", 0.7),
            ],
        );
        let hits = provider.search("rust", 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].url, "https://a");
        assert_eq!(provider.queries(), vec!["rust".to_string()]);
    }

    #[tokio::test]
    async fn test_mock_search_failure() {
        let provider = MockSearchProvider::new().failing_on(
            "bad",
            SearchError::QuotaExceeded {
                message: "limit".into(),
            },
        );
        assert!(provider.search("bad", 3).await.is_err());
        assert!(provider.search("good", 3).await.is_ok());
    }
}

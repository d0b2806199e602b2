//! Evidence retrieval: live search with a per-query simulated fallback.

use super::excerpt;
use super::state::{Evidence, StateUpdate};
use super::trace::{Stage, TraceEvent};
use crate::brain::LlmProvider;
use crate::error::LlmError;
use crate::search::{SearchMode, SearchProvider};
use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::debug;

const SIMULATION_SYSTEM: &str = "You are a search engine that returns factual information.";

/// Relevance assumed for live hits that carry no score.
const DEFAULT_LIVE_SCORE: f64 = 0.5;

/// Stable synthetic source identifier for a simulated sub-query.
///
/// Derived from a SHA-256 digest so it is identical across calls and processes.
pub fn synthetic_source_id(sub_query: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(sub_query.as_bytes()));
    format!("simulated-source-{}.local", &digest[..12])
}

/// Executes sub-queries and normalizes the results into evidence.
pub struct Retriever {
    max_results: usize,
    simulated_relevance: f64,
}

impl Retriever {
    pub fn new(max_results: usize, simulated_relevance: f64) -> Self {
        Self {
            max_results,
            simulated_relevance: simulated_relevance.clamp(0.0, 1.0),
        }
    }

    /// Retrieve evidence for each sub-query, in order.
    ///
    /// In live mode a failing search degrades that one sub-query to
    /// simulation and records a single warning; the batch always completes.
    pub async fn retrieve(
        &self,
        llm: &dyn LlmProvider,
        search: Option<&dyn SearchProvider>,
        sub_queries: &[String],
        mode: SearchMode,
    ) -> StateUpdate {
        let mut evidence = Vec::new();
        let mut trace = vec![TraceEvent::info(
            Stage::Retrieval,
            format!("Retrieving evidence for {} sub-queries", sub_queries.len()),
        )];

        let search = match (mode, search) {
            (SearchMode::Live, Some(provider)) => {
                trace.push(TraceEvent::info(
                    Stage::Retrieval,
                    format!("Using live search ({})", provider.name()),
                ));
                Some(provider)
            }
            (SearchMode::Live, None) => {
                trace.push(TraceEvent::warning(
                    Stage::Retrieval,
                    "Live search requested but no search provider configured; using simulation",
                ));
                None
            }
            (SearchMode::Simulated, _) => {
                trace.push(TraceEvent::info(
                    Stage::Retrieval,
                    "Using simulated search",
                ));
                None
            }
        };

        for sub_query in sub_queries {
            let label = excerpt(sub_query, 60);

            if let Some(provider) = search {
                match provider.search(sub_query, self.max_results).await {
                    Ok(hits) => {
                        let count = hits.len();
                        evidence.extend(hits.into_iter().map(|hit| Evidence {
                            title: hit.title.unwrap_or_else(|| sub_query.clone()),
                            source_id: hit.url,
                            content: hit.content,
                            relevance_score: hit.score.unwrap_or(DEFAULT_LIVE_SCORE).clamp(0.0, 1.0),
                            retrieved_at: Utc::now(),
                            mode: SearchMode::Live,
                        }));
                        trace.push(TraceEvent::info(
                            Stage::Retrieval,
                            format!("\"{label}\": {count} result(s) (live)"),
                        ));
                        continue;
                    }
                    Err(err) => {
                        trace.push(TraceEvent::warning(
                            Stage::Retrieval,
                            format!(
                                "Search failed for \"{label}\": {err}; falling back to simulation"
                            ),
                        ));
                    }
                }
            }

            match self.simulate(llm, sub_query).await {
                Ok(item) => {
                    evidence.push(item);
                    trace.push(TraceEvent::info(
                        Stage::Retrieval,
                        format!("\"{label}\": 1 result(s) (simulated)"),
                    ));
                }
                Err(err) => {
                    trace.push(TraceEvent::warning(
                        Stage::Retrieval,
                        format!("Simulated search failed for \"{label}\": {err}; no evidence"),
                    ));
                }
            }
        }

        trace.push(TraceEvent::info(
            Stage::Retrieval,
            format!("Collected {} result(s)", evidence.len()),
        ));

        StateUpdate {
            evidence,
            trace,
            ..StateUpdate::default()
        }
    }

    /// Ask the text-generation collaborator to stand in for a search engine.
    async fn simulate(&self, llm: &dyn LlmProvider, sub_query: &str) -> Result<Evidence, LlmError> {
        let prompt = format!(
            "Simulate a search result for: \"{sub_query}\"\n\n\
Provide factual, realistic information about this topic. \
Be specific and include verifiable details."
        );
        let content = llm.generate(SIMULATION_SYSTEM, &prompt).await?;
        debug!(sub_query, len = content.len(), "Simulated search result");

        Ok(Evidence {
            source_id: synthetic_source_id(sub_query),
            title: format!("Result for: {}", excerpt(sub_query, 50)),
            content,
            relevance_score: self.simulated_relevance,
            retrieved_at: Utc::now(),
            mode: SearchMode::Simulated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::MockLlmProvider;
    use crate::error::SearchError;
    use crate::search::{MockSearchProvider, SearchHit};

    fn queries(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_synthetic_source_id_is_stable() {
        let a = synthetic_source_id("benefits of generative AI");
        let b = synthetic_source_id("benefits of generative AI");
        let c = synthetic_source_id("risks of generative AI");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("simulated-source-"));
        assert_eq!(a.len(), "simulated-source-".len() + 12 + ".local".len());
    }

    #[tokio::test]
    async fn test_live_preserves_order() {
        let llm = MockLlmProvider::new();
        let search = MockSearchProvider::new()
            .with_hits(
                "first",
                vec![
                    MockSearchProvider::hit("https://a/1", "A1", "a1", 0.9),
                    MockSearchProvider::hit("https://a/2", "A2", "a2", 0.8),
                ],
            )
            .with_hits(
                "second",
                vec![MockSearchProvider::hit("https://b/1", "B1", "b1", 0.7)],
            );

        let update = Retriever::new(3, 0.85)
            .retrieve(&llm, Some(&search), &queries(&["first", "second"]), SearchMode::Live)
            .await;

        let ids: Vec<&str> = update.evidence.iter().map(|e| e.source_id.as_str()).collect();
        assert_eq!(ids, vec!["https://a/1", "https://a/2", "https://b/1"]);
        assert!(update.evidence.iter().all(|e| e.mode == SearchMode::Live));
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_live_hit_defaults() {
        let llm = MockLlmProvider::new();
        let search = MockSearchProvider::new().with_hits(
            "q",
            vec![SearchHit {
                url: "https://x".into(),
                title: None,
                content: "c".into(),
                score: Some(7.0),
            }],
        );
        let update = Retriever::new(3, 0.85)
            .retrieve(&llm, Some(&search), &queries(&["q"]), SearchMode::Live)
            .await;
        assert_eq!(update.evidence[0].title, "q");
        assert_eq!(update.evidence[0].relevance_score, 1.0);
    }

    #[tokio::test]
    async fn test_failed_query_falls_back_once() {
        let llm = MockLlmProvider::with_response("simulated content");
        let search = MockSearchProvider::new().failing_on(
            "two",
            SearchError::Timeout { timeout_secs: 20 },
        );

        let update = Retriever::new(3, 0.85)
            .retrieve(
                &llm,
                Some(&search),
                &queries(&["one", "two", "three"]),
                SearchMode::Live,
            )
            .await;

        assert_eq!(update.evidence.len(), 3);
        assert_eq!(update.evidence[1].mode, SearchMode::Simulated);
        assert_eq!(update.evidence[1].source_id, synthetic_source_id("two"));
        assert_eq!(update.trace.iter().filter(|e| e.is_warning()).count(), 1);
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_simulated_mode() {
        let llm = MockLlmProvider::with_response("Rust was first released in 2015.");
        let update = Retriever::new(3, 0.85)
            .retrieve(&llm, None, &queries(&["rust history"]), SearchMode::Simulated)
            .await;

        assert_eq!(update.evidence.len(), 1);
        let item = &update.evidence[0];
        assert_eq!(item.relevance_score, 0.85);
        assert_eq!(item.title, "Result for: rust history");
        assert_eq!(item.content, "Rust was first released in 2015.");
    }

    #[tokio::test]
    async fn test_live_without_provider_degrades() {
        let llm = MockLlmProvider::with_response("text");
        let update = Retriever::new(3, 0.85)
            .retrieve(&llm, None, &queries(&["q"]), SearchMode::Live)
            .await;
        assert_eq!(update.evidence[0].mode, SearchMode::Simulated);
        assert!(update.trace[1].is_warning());
    }

    #[tokio::test]
    async fn test_simulation_failure_skips_query() {
        let llm = MockLlmProvider::new();
        llm.queue_error(LlmError::Connection {
            message: "down".into(),
        });
        llm.queue_response("second ok");
        let update = Retriever::new(3, 0.85)
            .retrieve(&llm, None, &queries(&["a", "b"]), SearchMode::Simulated)
            .await;
        assert_eq!(update.evidence.len(), 1);
        assert_eq!(update.evidence[0].content, "second ok");
    }

    #[tokio::test]
    async fn test_empty_plan_is_noop() {
        let llm = MockLlmProvider::new();
        let update = Retriever::new(3, 0.85)
            .retrieve(&llm, None, &[], SearchMode::Simulated)
            .await;
        assert!(update.evidence.is_empty());
        assert_eq!(llm.call_count(), 0);
    }
}

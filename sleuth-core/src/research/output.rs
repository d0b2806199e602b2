//! The outward-facing result of a research run.

use super::state::{ClaimValidation, Reference, ResearchState};
use super::trace::TraceEvent;
use crate::error::ResearchError;
use crate::search::SearchMode;
use serde::Serialize;

/// Everything a presentation layer needs from one research run.
#[derive(Debug, Clone, Serialize)]
pub struct ResearchResult {
    pub query: String,
    pub report: String,
    pub references: Vec<Reference>,
    pub confidence_level: f64,
    pub evidence_count: usize,
    pub validation_count: usize,
    pub sub_query_count: usize,
    pub iteration_count: usize,
    pub conflicts_detected: bool,
    pub search_mode: SearchMode,
    pub sub_queries: Vec<String>,
    pub validations: Vec<ClaimValidation>,
    pub trace: Vec<TraceEvent>,
    pub error: Option<ResearchError>,
}

impl ResearchResult {
    /// Extract the result from a finished (or abandoned) state.
    ///
    /// A state that never reached synthesis reports zero confidence.
    pub fn from_state(state: ResearchState, search_mode: SearchMode) -> Self {
        Self {
            report: state.final_report.unwrap_or_default(),
            confidence_level: state.confidence_level.unwrap_or(0.0),
            evidence_count: state.evidence.len(),
            validation_count: state.validations.len(),
            sub_query_count: state.sub_queries.len(),
            iteration_count: state.current_iteration,
            conflicts_detected: state.conflicts_detected,
            search_mode,
            query: state.query,
            references: state.references,
            sub_queries: state.sub_queries,
            validations: state.validations,
            trace: state.trace,
            error: state.error,
        }
    }

    /// Whether the run finished without any recorded stage error.
    pub fn is_clean(&self) -> bool {
        self.error.is_none()
    }

    /// Render report, references and metadata as Markdown.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.report);
        out.push_str("\n\n## References\n\n");
        if self.references.is_empty() {
            out.push_str("_No references._\n");
        }
        for (i, reference) in self.references.iter().enumerate() {
            out.push_str(&format!("{}. {}\n   {}\n", i + 1, reference.title, reference.url));
        }

        out.push_str("\n## Metadata\n\n");
        out.push_str(&format!(
            "- **Confidence:** {:.0}%\n",
            self.confidence_level * 100.0
        ));
        out.push_str(&format!("- **Results:** {}\n", self.evidence_count));
        out.push_str(&format!("- **Validations:** {}\n", self.validation_count));
        out.push_str(&format!(
            "- **Conflicts detected:** {}\n",
            if self.conflicts_detected { "yes" } else { "no" }
        ));
        out.push_str(&format!("- **Iterations:** {}\n", self.iteration_count));
        out.push_str(&format!("- **Search mode:** {}\n", self.search_mode));
        if let Some(ref error) = self.error {
            out.push_str(&format!("- **Error:** {error}\n"));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::research::state::StateUpdate;

    #[test]
    fn test_from_state_before_synthesis() {
        let mut state = ResearchState::new("q", 2);
        state.apply(StateUpdate {
            sub_queries: vec!["a".into(), "b".into()],
            current_iteration: Some(1),
            ..StateUpdate::default()
        });
        let result = ResearchResult::from_state(state, SearchMode::Simulated);
        assert_eq!(result.report, "");
        assert_eq!(result.confidence_level, 0.0);
        assert_eq!(result.sub_query_count, 2);
        assert_eq!(result.iteration_count, 1);
        assert!(result.is_clean());
    }

    #[test]
    fn test_markdown_rendering() {
        let mut state = ResearchState::new("q", 1);
        state.apply(StateUpdate {
            final_report: Some("# Findings".into()),
            references: Some(vec![Reference {
                source_id: "https://docs.rs".into(),
                title: "Docs".into(),
                url: "https://docs.rs".into(),
            }]),
            confidence_level: Some(0.82),
            error: Some(ResearchError::Parse {
                message: "eof".into(),
            }),
            ..StateUpdate::default()
        });
        let md = ResearchResult::from_state(state, SearchMode::Live).to_markdown();
        assert!(md.starts_with("# Findings"));
        assert!(md.contains("1. Docs\n   https://docs.rs"));
        assert!(md.contains("**Confidence:** 82%"));
        assert!(md.contains("**Search mode:** live"));
        assert!(md.contains("**Error:** could not parse validation output: eof"));
    }

    #[test]
    fn test_result_serializes() {
        let result = ResearchResult::from_state(ResearchState::new("q", 1), SearchMode::Live);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["search_mode"], "live");
        assert!(json["error"].is_null());
    }
}

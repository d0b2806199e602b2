//! Research state and its per-field merge policy.
//!
//! Every stage returns a `StateUpdate`; the engine folds it into the single
//! `ResearchState` owned by the running call with [`ResearchState::apply`].
//! Collections are append-only, scalars are overwritten, and the iteration
//! counter never goes backwards.

use super::trace::{StateSnapshot, TraceEvent};
use crate::error::ResearchError;
use crate::search::SearchMode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single normalized search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    /// URL for live results, a synthetic identifier for simulated ones.
    pub source_id: String,
    pub title: String,
    pub content: String,
    /// Relevance score (0.0-1.0).
    pub relevance_score: f64,
    pub retrieved_at: DateTime<Utc>,
    /// How this evidence was obtained.
    pub mode: SearchMode,
}

/// The validator's judgment about one extracted claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimValidation {
    pub claim: String,
    pub is_validated: bool,
    /// Confidence (0.0-1.0), clamped at ingestion.
    pub confidence: f64,
    /// Source ids backing the claim, duplicates removed, first-seen order kept.
    pub supporting_source_ids: Vec<String>,
    pub conflicting_info: Option<String>,
    pub reasoning: String,
}

/// A citation derived from one piece of evidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub source_id: String,
    pub title: String,
    pub url: String,
}

impl From<&Evidence> for Reference {
    fn from(evidence: &Evidence) -> Self {
        Self {
            source_id: evidence.source_id.clone(),
            title: evidence.title.clone(),
            url: evidence.source_id.clone(),
        }
    }
}

/// The accumulating aggregate threaded through one research run.
#[derive(Debug, Clone, Serialize)]
pub struct ResearchState {
    pub query: String,
    pub max_iterations: usize,
    pub current_iteration: usize,
    pub evidence: Vec<Evidence>,
    pub sub_queries: Vec<String>,
    pub validations: Vec<ClaimValidation>,
    /// Reflects the latest validation pass only.
    pub conflicts_detected: bool,
    pub final_report: Option<String>,
    pub references: Vec<Reference>,
    /// `None` until synthesis has run.
    pub confidence_level: Option<f64>,
    pub trace: Vec<TraceEvent>,
    pub error: Option<ResearchError>,
}

/// A partial update returned by a stage.
///
/// Fields left at their default leave the state untouched.
#[derive(Debug, Clone, Default)]
pub struct StateUpdate {
    /// Appended.
    pub evidence: Vec<Evidence>,
    /// Appended.
    pub sub_queries: Vec<String>,
    /// Appended.
    pub validations: Vec<ClaimValidation>,
    /// Appended.
    pub trace: Vec<TraceEvent>,
    /// Raised to this value; never lowered.
    pub current_iteration: Option<usize>,
    /// Overwritten.
    pub conflicts_detected: Option<bool>,
    /// Overwritten.
    pub final_report: Option<String>,
    /// Overwritten.
    pub references: Option<Vec<Reference>>,
    /// Overwritten.
    pub confidence_level: Option<f64>,
    /// Set when present; an earlier error is replaced by a later one.
    pub error: Option<ResearchError>,
}

impl StateUpdate {
    /// An update carrying only trace events.
    pub fn trace(events: Vec<TraceEvent>) -> Self {
        Self {
            trace: events,
            ..Self::default()
        }
    }
}

impl ResearchState {
    /// Create a fresh state for one research call.
    pub fn new(query: impl Into<String>, max_iterations: usize) -> Self {
        Self {
            query: query.into(),
            max_iterations,
            current_iteration: 0,
            evidence: Vec::new(),
            sub_queries: Vec::new(),
            validations: Vec::new(),
            conflicts_detected: false,
            final_report: None,
            references: Vec::new(),
            confidence_level: None,
            trace: Vec::new(),
            error: None,
        }
    }

    /// Merge a stage's partial update into the state.
    pub fn apply(&mut self, update: StateUpdate) {
        let StateUpdate {
            evidence,
            sub_queries,
            validations,
            trace,
            current_iteration,
            conflicts_detected,
            final_report,
            references,
            confidence_level,
            error,
        } = update;

        self.evidence.extend(evidence);
        self.sub_queries.extend(sub_queries);
        self.validations.extend(validations);
        self.trace.extend(trace);

        if let Some(iteration) = current_iteration {
            self.current_iteration = self.current_iteration.max(iteration);
        }
        if let Some(conflicts) = conflicts_detected {
            self.conflicts_detected = conflicts;
        }
        if let Some(report) = final_report {
            self.final_report = Some(report);
        }
        if let Some(references) = references {
            self.references = references;
        }
        if let Some(confidence) = confidence_level {
            self.confidence_level = Some(confidence);
        }
        if let Some(error) = error {
            self.error = Some(error);
        }
    }

    /// Sizes of the append-only collections.
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            iteration: self.current_iteration,
            sub_queries: self.sub_queries.len(),
            evidence: self.evidence.len(),
            validations: self.validations.len(),
            trace: self.trace.len(),
        }
    }

    /// Whether the iteration budget still allows another retrieval pass.
    pub fn has_iterations_left(&self) -> bool {
        self.current_iteration < self.max_iterations
    }
}

//! Structured trace events and progress callbacks.
//!
//! Stages record what they did as typed `TraceEvent`s on the research state.
//! Presentation layers decide how to render them; every event is also
//! forwarded to `tracing` at the matching level.

use super::controller::Decision;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Pipeline stage that produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Planning,
    Retrieval,
    Validation,
    Decision,
    Synthesis,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Planning => "planning",
            Stage::Retrieval => "retrieval",
            Stage::Validation => "validation",
            Stage::Decision => "decision",
            Stage::Synthesis => "synthesis",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of a trace event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceLevel {
    Info,
    Warning,
}

/// A single entry in the research trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    pub stage: Stage,
    pub level: TraceLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl TraceEvent {
    pub fn info(stage: Stage, message: impl Into<String>) -> Self {
        Self::new(stage, TraceLevel::Info, message)
    }

    pub fn warning(stage: Stage, message: impl Into<String>) -> Self {
        Self::new(stage, TraceLevel::Warning, message)
    }

    fn new(stage: Stage, level: TraceLevel, message: impl Into<String>) -> Self {
        let event = Self {
            stage,
            level,
            message: message.into(),
            timestamp: Utc::now(),
        };
        event.emit();
        event
    }

    /// Forward this event to the `tracing` subscriber.
    fn emit(&self) {
        match self.level {
            TraceLevel::Info => tracing::info!(stage = %self.stage, "{}", self.message),
            TraceLevel::Warning => tracing::warn!(stage = %self.stage, "{}", self.message),
        }
    }

    pub fn is_warning(&self) -> bool {
        self.level == TraceLevel::Warning
    }
}

/// Sizes of the append-only collections after a stage, for progress reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub iteration: usize,
    pub sub_queries: usize,
    pub evidence: usize,
    pub validations: usize,
    pub trace: usize,
}

/// Callback trait for progressive research UI updates.
pub trait ResearchCallback: Send + Sync {
    /// Called before a stage starts.
    fn on_stage_start(&self, stage: Stage);
    /// Called for every trace event, in order.
    fn on_event(&self, event: &TraceEvent);
    /// Called after the iteration controller decides.
    fn on_decision(&self, decision: Decision, iteration: usize);
    /// Called after a stage's update has been merged into the state.
    fn on_stage_complete(&self, stage: Stage, snapshot: &StateSnapshot);
}

/// No-op callback.
pub struct NoOpResearchCallback;

impl ResearchCallback for NoOpResearchCallback {
    fn on_stage_start(&self, _stage: Stage) {}
    fn on_event(&self, _event: &TraceEvent) {}
    fn on_decision(&self, _decision: Decision, _iteration: usize) {}
    fn on_stage_complete(&self, _stage: Stage, _snapshot: &StateSnapshot) {}
}

/// Callback that records everything it sees, for tests and replay.
#[derive(Default)]
pub struct RecordingResearchCallback {
    stages: Mutex<Vec<Stage>>,
    events: Mutex<Vec<TraceEvent>>,
    decisions: Mutex<Vec<(Decision, usize)>>,
    snapshots: Mutex<Vec<(Stage, StateSnapshot)>>,
}

impl RecordingResearchCallback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stages(&self) -> Vec<Stage> {
        self.stages.lock().unwrap().clone()
    }

    pub fn events(&self) -> Vec<TraceEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn decisions(&self) -> Vec<(Decision, usize)> {
        self.decisions.lock().unwrap().clone()
    }

    pub fn snapshots(&self) -> Vec<(Stage, StateSnapshot)> {
        self.snapshots.lock().unwrap().clone()
    }
}

impl ResearchCallback for RecordingResearchCallback {
    fn on_stage_start(&self, stage: Stage) {
        self.stages.lock().unwrap().push(stage);
    }

    fn on_event(&self, event: &TraceEvent) {
        self.events.lock().unwrap().push(event.clone());
    }

    fn on_decision(&self, decision: Decision, iteration: usize) {
        self.decisions.lock().unwrap().push((decision, iteration));
    }

    fn on_stage_complete(&self, stage: Stage, snapshot: &StateSnapshot) {
        self.snapshots.lock().unwrap().push((stage, *snapshot));
    }
}

//! Iterative research pipeline.
//!
//! Runs a fixed sequence of stages over one accumulating state:
//! 1. **Plan**: Break the question into focused sub-queries
//! 2. **Retrieve**: Gather evidence, live or simulated
//! 3. **Validate**: Cross-reference claims and flag conflicts
//! 4. **Decide**: Loop back for more evidence or move on
//! 5. **Synthesize**: Write the report, references and confidence

pub mod controller;
pub mod engine;
pub mod output;
pub mod planner;
pub mod retriever;
pub mod state;
pub mod synthesis;
pub mod trace;
pub mod validator;

pub use controller::{Decision, DecisionReason, IterationController, decide, workflow_mermaid};
pub use engine::ResearchAgent;
pub use output::ResearchResult;
pub use state::{ClaimValidation, Evidence, Reference, ResearchState, StateUpdate};
pub use trace::{
    NoOpResearchCallback, RecordingResearchCallback, ResearchCallback, Stage, StateSnapshot,
    TraceEvent, TraceLevel,
};

/// Truncate to `max_chars` characters, marking the cut with `...`.
pub(crate) fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

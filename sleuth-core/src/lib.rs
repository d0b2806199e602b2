//! # Sleuth Core
//!
//! Core library for the Sleuth research agent.
//! Provides the iterative research pipeline, the text-generation and search
//! collaborator interfaces with their HTTP providers, configuration, and errors.

pub mod brain;
pub mod config;
pub mod error;
pub mod providers;
pub mod research;
pub mod search;

// Re-export commonly used types at the crate root.
pub use brain::{CompletionRequest, CompletionResponse, LlmProvider, MockLlmProvider, TokenUsage};
pub use config::{LlmConfig, ResearchConfig, SearchConfig, SleuthConfig, load_config};
pub use error::{ConfigError, LlmError, ResearchError, Result, SearchError, SleuthError};
pub use providers::{AnthropicProvider, TavilySearch};
pub use research::{
    ClaimValidation, Decision, Evidence, RecordingResearchCallback, Reference, ResearchAgent,
    ResearchCallback, ResearchResult, ResearchState, Stage, TraceEvent,
};
pub use search::{MockSearchProvider, SearchHit, SearchMode, SearchPreference, SearchProvider};

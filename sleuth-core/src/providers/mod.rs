//! Concrete collaborator clients: Anthropic for text generation, Tavily for search.

pub mod anthropic;
pub mod tavily;

pub use anthropic::AnthropicProvider;
pub use tavily::TavilySearch;

//! Error types for the Sleuth research core.
//!
//! Uses `thiserror` for public API error types with structured variants
//! covering the text-generation collaborator, the search collaborator,
//! research stages, and configuration.

use serde::{Serialize, Serializer};
use std::path::PathBuf;

/// Top-level error type for the Sleuth core library.
#[derive(Debug, thiserror::Error)]
pub enum SleuthError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Research error: {0}")]
    Research(#[from] ResearchError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from the text-generation collaborator.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LlmError {
    #[error("API request failed: {message}")]
    ApiRequest { message: String },

    #[error("API response parse error: {message}")]
    ResponseParse { message: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Provider connection failed: {message}")]
    Connection { message: String },
}

/// Errors from the web-search collaborator.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SearchError {
    #[error("Search request failed: {message}")]
    Request { message: String },

    #[error("Search response parse error: {message}")]
    ResponseParse { message: String },

    #[error("Authentication failed for search provider {provider}")]
    AuthFailed { provider: String },

    #[error("Search quota exceeded: {message}")]
    QuotaExceeded { message: String },

    #[error("Search timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Search connection failed: {message}")]
    Connection { message: String },
}

/// Stage-level failures recorded on the research state.
///
/// Stage failures never abort a research run; they are carried on the result
/// next to the best-effort output of the failing stage. `NestedRuntime` is
/// returned by the blocking entry point before any stage runs.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResearchError {
    #[error("query planning failed: {0}")]
    Planning(LlmError),

    #[error("validation failed: {0}")]
    Validation(LlmError),

    #[error("could not parse validation output: {message}")]
    Parse { message: String },

    #[error("synthesis failed: {0}")]
    Synthesis(LlmError),

    #[error("research cancelled after {stage} stage")]
    Cancelled { stage: String },

    #[error("blocking research cannot run inside an async runtime; await run_research instead")]
    NestedRuntime,
}

impl Serialize for ResearchError {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Environment variable not set: {var}")]
    EnvVarMissing { var: String },

    #[error("Configuration parse error: {message}")]
    ParseError { message: String },
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::ParseError {
            message: err.to_string(),
        }
    }
}

/// A type alias for results using the top-level `SleuthError`.
pub type Result<T> = std::result::Result<T, SleuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_llm() {
        let err = SleuthError::Llm(LlmError::ApiRequest {
            message: "connection refused".into(),
        });
        assert_eq!(
            err.to_string(),
            "LLM error: API request failed: connection refused"
        );
    }

    #[test]
    fn test_error_display_research() {
        let err: SleuthError = ResearchError::NestedRuntime.into();
        assert!(err.to_string().starts_with("Research error: blocking research"));
    }

    #[test]
    fn test_research_error_wraps_collaborator_error() {
        let err = ResearchError::Synthesis(LlmError::Timeout { timeout_secs: 30 });
        assert_eq!(
            err.to_string(),
            "synthesis failed: Request timed out after 30s"
        );
    }

    #[test]
    fn test_research_error_serializes_as_text() {
        let err = ResearchError::Parse {
            message: "expected value at line 1 column 1".into(),
        };
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(
            json,
            "\"could not parse validation output: expected value at line 1 column 1\""
        );
    }

    #[test]
    fn test_error_display_config() {
        let err = SleuthError::Config(ConfigError::EnvVarMissing {
            var: "ANTHROPIC_API_KEY".into(),
        });
        assert_eq!(
            err.to_string(),
            "Configuration error: Environment variable not set: ANTHROPIC_API_KEY"
        );
    }

    #[test]
    fn test_error_from_serde() {
        let serde_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: SleuthError = serde_err.into();
        assert!(matches!(err, SleuthError::Serialization(_)));
    }

    #[test]
    fn test_llm_error_variants() {
        let err = LlmError::RateLimited {
            retry_after_secs: 60,
        };
        assert_eq!(err.to_string(), "Rate limited by provider, retry after 60s");

        let err = LlmError::AuthFailed {
            provider: "Anthropic".into(),
        };
        assert_eq!(err.to_string(), "Authentication failed for provider Anthropic");
    }
}

//! Configuration system for Sleuth.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment -> overrides.
//! Configuration is loaded from the user config directory (`config.toml`) and/or
//! `.sleuth/config.toml` in the workspace directory.
//!
//! The core never reads credentials on its own. API keys are resolved here, on the
//! adapter side, and handed to the collaborator clients explicitly.

use crate::error::ConfigError;
use crate::search::SearchPreference;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Placeholder values shipped in sample `.env` files; treated as "not configured".
const PLACEHOLDER_KEYS: &[&str] = &["your-api-key-here", "changeme", "sk-..."];

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SleuthConfig {
    pub llm: LlmConfig,
    pub search: SearchConfig,
    pub research: ResearchConfig,
}

/// Configuration for the text-generation collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name. Only "anthropic" has a built-in client.
    pub provider: String,
    /// Model identifier.
    pub model: String,
    /// Environment variable name containing the API key.
    pub api_key_env: String,
    /// Optional base URL override for the API endpoint.
    pub base_url: Option<String>,
    /// Maximum tokens to generate in a response.
    pub max_tokens: usize,
    /// Sampling temperature.
    pub temperature: f32,
    /// Per-request timeout.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            model: "claude-3-haiku-20240307".to_string(),
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            base_url: None,
            max_tokens: 4096,
            temperature: 0.3,
            timeout_secs: 120,
        }
    }
}

/// Configuration for the web-search collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Provider name. Only "tavily" has a built-in client.
    pub provider: String,
    /// Environment variable name containing the API key.
    pub api_key_env: String,
    /// Optional base URL override.
    pub base_url: Option<String>,
    /// Provider-specific search depth ("basic" or "advanced" for Tavily).
    pub search_depth: String,
    /// Number of hits requested per sub-query.
    pub results_per_query: usize,
    /// Per-request timeout.
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            provider: "tavily".to_string(),
            api_key_env: "TAVILY_API_KEY".to_string(),
            base_url: None,
            search_depth: "basic".to_string(),
            results_per_query: 3,
            timeout_secs: 20,
        }
    }
}

/// Tuning for the research loop itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    /// Default iteration budget when the caller does not supply one.
    pub max_iterations: usize,
    /// Below this many accumulated validations the controller keeps gathering.
    pub min_validations: usize,
    /// Per-evidence excerpt length used in the synthesis prompt.
    pub excerpt_chars: usize,
    /// Relevance assigned to simulated evidence.
    pub simulated_relevance: f64,
    /// Search mode used when the caller does not state a preference.
    pub default_search: SearchPreference,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_iterations: 2,
            min_validations: 3,
            excerpt_chars: 500,
            simulated_relevance: 0.85,
            default_search: SearchPreference::Auto,
        }
    }
}

impl ResearchConfig {
    /// Validate this config and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.max_iterations > 10 {
            warnings.push(format!(
                "research.max_iterations = {} is high; each iteration re-runs every sub-query",
                self.max_iterations
            ));
        }
        if self.excerpt_chars == 0 {
            warnings.push("research.excerpt_chars = 0 sends no evidence text to synthesis".into());
        }
        if !(0.0..=1.0).contains(&self.simulated_relevance) {
            warnings.push(format!(
                "research.simulated_relevance = {} is outside [0, 1] and will be clamped",
                self.simulated_relevance
            ));
        }
        warnings
    }
}

impl SleuthConfig {
    /// Validate the whole configuration, returning warnings for suspicious values.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = self.research.validate();
        if self.llm.provider != "anthropic" {
            warnings.push(format!(
                "llm.provider = '{}' has no built-in client",
                self.llm.provider
            ));
        }
        if self.search.results_per_query == 0 {
            warnings.push("search.results_per_query = 0 makes live search return nothing".into());
        }
        if !(0.0..=1.0).contains(&self.llm.temperature) {
            warnings.push(format!(
                "llm.temperature = {} is outside the usual [0, 1] range",
                self.llm.temperature
            ));
        }
        warnings
    }
}

/// Load configuration from all layers.
///
/// Layers, later ones winning: built-in defaults, the user config file, the
/// workspace `.sleuth/config.toml`, `SLEUTH_`-prefixed environment variables
/// (`SLEUTH_LLM__MODEL`, `SLEUTH_RESEARCH__MAX_ITERATIONS`, ...) and explicit overrides.
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&SleuthConfig>,
) -> Result<SleuthConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(SleuthConfig::default()));

    if let Some(config_dir) = directories::ProjectDirs::from("dev", "sleuth", "sleuth") {
        let user_config = config_dir.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = ws.join(".sleuth").join("config.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    figment = figment.merge(Env::prefixed("SLEUTH_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    Ok(figment.extract()?)
}

/// Load configuration from a single explicit TOML file on top of the defaults.
pub fn load_config_file(path: &Path) -> Result<SleuthConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    Ok(Figment::from(Serialized::defaults(SleuthConfig::default()))
        .merge(Toml::file(path))
        .extract()?)
}

/// Interpret a raw credential value, treating blanks and known placeholders as absent.
pub fn normalize_api_key(raw: Option<String>) -> Option<String> {
    let key = raw?.trim().to_string();
    if key.is_empty() || PLACEHOLDER_KEYS.contains(&key.as_str()) {
        None
    } else {
        Some(key)
    }
}

/// Read an API key from the named environment variable.
pub fn resolve_api_key(env_var: &str) -> Option<String> {
    normalize_api_key(std::env::var(env_var).ok())
}

/// Like [`resolve_api_key`], for keys the caller cannot run without.
pub fn require_api_key(env_var: &str) -> Result<String, ConfigError> {
    resolve_api_key(env_var).ok_or_else(|| ConfigError::EnvVarMissing {
        var: env_var.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = SleuthConfig::default();
        assert_eq!(config.llm.provider, "anthropic");
        assert_eq!(config.search.results_per_query, 3);
        assert_eq!(config.research.max_iterations, 2);
        assert_eq!(config.research.min_validations, 3);
        assert_eq!(config.research.excerpt_chars, 500);
        assert!((config.research.simulated_relevance - 0.85).abs() < f64::EPSILON);
        assert_eq!(config.research.default_search, SearchPreference::Auto);
    }

    #[test]
    fn test_default_config_has_no_warnings() {
        assert!(SleuthConfig::default().validate().is_empty());
    }

    #[test]
    fn test_validate_flags_bad_values() {
        let mut config = SleuthConfig::default();
        config.research.excerpt_chars = 0;
        config.research.simulated_relevance = 1.5;
        config.search.results_per_query = 0;
        let warnings = config.validate();
        assert_eq!(warnings.len(), 3);
    }

    #[test]
    fn test_load_config_file_merges_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[research]\nmax_iterations = 4\ndefault_search = \"simulated\"\n\n[llm]\nmodel = \"claude-3-5-sonnet-latest\""
        )
        .unwrap();

        let config = load_config_file(&path).unwrap();
        assert_eq!(config.research.max_iterations, 4);
        assert_eq!(config.research.default_search, SearchPreference::Simulated);
        assert_eq!(config.llm.model, "claude-3-5-sonnet-latest");
        // Untouched fields keep their defaults.
        assert_eq!(config.search.provider, "tavily");
    }

    #[test]
    fn test_load_config_file_missing() {
        let err = load_config_file(Path::new("/nonexistent/sleuth.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn test_workspace_config_layer() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".sleuth")).unwrap();
        std::fs::write(
            dir.path().join(".sleuth").join("config.toml"),
            "[search]\nresults_per_query = 5\n",
        )
        .unwrap();

        let config = load_config(Some(dir.path()), None).unwrap();
        assert_eq!(config.search.results_per_query, 5);
    }

    #[test]
    fn test_require_api_key_missing() {
        let err = require_api_key("SLEUTH_TEST_KEY_THAT_IS_NEVER_SET").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::EnvVarMissing { ref var } if var == "SLEUTH_TEST_KEY_THAT_IS_NEVER_SET"
        ));
    }

    #[test]
    fn test_normalize_api_key() {
        assert_eq!(normalize_api_key(None), None);
        assert_eq!(normalize_api_key(Some("   ".into())), None);
        assert_eq!(normalize_api_key(Some("changeme".into())), None);
        assert_eq!(
            normalize_api_key(Some(" tvly-123 ".into())),
            Some("tvly-123".to_string())
        );
    }
}

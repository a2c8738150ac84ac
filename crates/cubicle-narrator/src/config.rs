//! Configuration for the LLM narrator.
//!
//! All configuration is loaded from environment variables. Without a
//! backend the narrator runs in heuristic-only mode, which keeps the game
//! playable offline.

use std::time::Duration;

use crate::error::NarratorRuntimeError;

/// Default HTTP deadline for a single LLM call.
pub const DEFAULT_DECISION_TIMEOUT_MS: u64 = 7000;

/// Default location of the prompt templates.
pub const DEFAULT_TEMPLATES_DIR: &str = "crates/cubicle-narrator/templates";

/// Complete narrator configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct NarratorConfig {
    /// LLM backend, or `None` for heuristic-only mode.
    pub backend: Option<LlmBackendConfig>,
    /// HTTP deadline for one LLM call.
    pub decision_timeout: Duration,
    /// Path to the templates directory.
    pub templates_dir: String,
}

/// Configuration for a single LLM backend.
#[derive(Debug, Clone)]
pub struct LlmBackendConfig {
    /// The backend type (openai, anthropic, ollama).
    pub backend_type: BackendType,
    /// Base API URL (e.g. `https://api.openai.com/v1`).
    pub api_url: String,
    /// API key for authentication.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
}

/// Supported LLM backend types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// `OpenAI`-compatible API (works with `OpenAI`, `DeepSeek`, Ollama).
    OpenAi,
    /// Anthropic Messages API (different request format).
    Anthropic,
}

impl BackendType {
    /// Parse a backend name as written in `LLM_DEFAULT_BACKEND`.
    pub fn parse(name: &str) -> Result<Self, NarratorRuntimeError> {
        match name.trim().to_lowercase().as_str() {
            "openai" | "deepseek" | "ollama" => Ok(Self::OpenAi),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            other => Err(NarratorRuntimeError::Config(format!(
                "unknown backend type: {other}"
            ))),
        }
    }
}

impl Default for NarratorConfig {
    fn default() -> Self {
        Self {
            backend: None,
            decision_timeout: Duration::from_millis(DEFAULT_DECISION_TIMEOUT_MS),
            templates_dir: DEFAULT_TEMPLATES_DIR.to_owned(),
        }
    }
}

impl NarratorConfig {
    /// Load configuration from environment variables.
    ///
    /// Backend variables (all required once `LLM_DEFAULT_BACKEND` is set):
    /// - `LLM_DEFAULT_BACKEND` -- backend type; unset means heuristic-only
    /// - `LLM_DEFAULT_API_URL` -- API base URL
    /// - `LLM_DEFAULT_API_KEY` -- API key
    /// - `LLM_DEFAULT_MODEL` -- model name
    ///
    /// Optional variables:
    /// - `DECISION_TIMEOUT_MS` -- HTTP deadline in milliseconds (default 7000)
    /// - `TEMPLATES_DIR` -- path to prompt templates
    pub fn from_env() -> Result<Self, NarratorRuntimeError> {
        let backend = if std::env::var("LLM_DEFAULT_BACKEND").is_ok() {
            Some(load_backend_config("LLM_DEFAULT")?)
        } else {
            None
        };

        let decision_timeout_ms: u64 = std::env::var("DECISION_TIMEOUT_MS")
            .unwrap_or_else(|_| DEFAULT_DECISION_TIMEOUT_MS.to_string())
            .parse()
            .map_err(|e| {
                NarratorRuntimeError::Config(format!("invalid DECISION_TIMEOUT_MS: {e}"))
            })?;

        let templates_dir =
            std::env::var("TEMPLATES_DIR").unwrap_or_else(|_| DEFAULT_TEMPLATES_DIR.to_owned());

        Ok(Self {
            backend,
            decision_timeout: Duration::from_millis(decision_timeout_ms),
            templates_dir,
        })
    }
}

/// Read a required environment variable.
fn env_var(name: &str) -> Result<String, NarratorRuntimeError> {
    std::env::var(name).map_err(|e| {
        NarratorRuntimeError::Config(format!("missing required env var {name}: {e}"))
    })
}

/// Load an LLM backend config from a set of prefixed environment variables.
fn load_backend_config(prefix: &str) -> Result<LlmBackendConfig, NarratorRuntimeError> {
    let backend_type = BackendType::parse(&env_var(&format!("{prefix}_BACKEND"))?)?;
    let api_url = env_var(&format!("{prefix}_API_URL"))?;
    let api_key = env_var(&format!("{prefix}_API_KEY"))?;
    let model = env_var(&format!("{prefix}_MODEL"))?;

    Ok(LlmBackendConfig {
        backend_type,
        api_url: api_url.trim_end_matches('/').to_owned(),
        api_key,
        model,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_names_map_to_wire_formats() {
        assert!(matches!(BackendType::parse("DeepSeek"), Ok(BackendType::OpenAi)));
        assert!(matches!(BackendType::parse("ollama"), Ok(BackendType::OpenAi)));
        assert!(matches!(BackendType::parse(" claude "), Ok(BackendType::Anthropic)));
        assert!(matches!(
            BackendType::parse("gemini"),
            Err(NarratorRuntimeError::Config(_))
        ));
    }

    #[test]
    fn default_is_heuristic_only() {
        let config = NarratorConfig::default();
        assert!(config.backend.is_none());
        assert_eq!(config.decision_timeout, Duration::from_millis(7000));
        assert_eq!(config.templates_dir, DEFAULT_TEMPLATES_DIR);
    }
}

//! Error types for the LLM narrator.
//!
//! Uses `thiserror` for typed errors that surface through the narrator
//! pipeline: configuration, prompt rendering, LLM calls, reply parsing.

use cubicle_core::narrator::NarratorError;

/// Errors that can occur while producing a narration.
#[derive(Debug, thiserror::Error)]
pub enum NarratorRuntimeError {
    /// Configuration is invalid or incomplete.
    #[error("config error: {0}")]
    Config(String),

    /// Failed to load or render a prompt template.
    #[error("template render error: {0}")]
    Template(String),

    /// An LLM backend returned an error or was unreachable.
    #[error("LLM backend error: {0}")]
    LlmBackend(String),

    /// The LLM reply could not be turned into a narration or verdict.
    #[error("response parse error: {0}")]
    Parse(String),

    /// Serialization or deserialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl From<NarratorRuntimeError> for NarratorError {
    fn from(error: NarratorRuntimeError) -> Self {
        match error {
            NarratorRuntimeError::Parse(message) => Self::Parse { message },
            NarratorRuntimeError::Serde(source) => Self::Parse {
                message: source.to_string(),
            },
            other => Self::Backend {
                message: other.to_string(),
            },
        }
    }
}

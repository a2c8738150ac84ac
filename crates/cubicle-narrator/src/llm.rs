//! LLM backend abstraction and implementations.
//!
//! Defines an enum-based dispatch for LLM backends, avoiding the
//! dyn-compatibility issues with async trait methods. Concrete
//! implementations exist for OpenAI-compatible APIs and the Anthropic
//! Messages API. All backends communicate over HTTP via `reqwest`.
//!
//! Each backend supports a one-shot completion and a streamed completion.
//! Streams arrive as server-sent events; [`SseDecoder`] turns raw bytes into
//! `data:` payloads and the per-backend extractors pull out text deltas.

use futures::StreamExt;

use crate::config::{BackendType, LlmBackendConfig};
use crate::error::NarratorRuntimeError;
use crate::prompt::RenderedPrompt;

/// Sampling settings for one call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampling {
    /// Sampling temperature.
    pub temperature: f64,
    /// Completion token cap.
    pub max_tokens: u32,
    /// Ask for a JSON object reply where the API supports it.
    pub json: bool,
}

impl Sampling {
    /// Streamed dialogue in the tagged format.
    pub const STREAM: Self = Self {
        temperature: 0.7,
        max_tokens: 500,
        json: false,
    };

    /// One-shot dialogue as JSON.
    pub const STRUCTURED: Self = Self {
        temperature: 0.7,
        max_tokens: 300,
        json: true,
    };

    /// Review scoring as JSON.
    pub const REVIEW: Self = Self {
        temperature: 0.3,
        max_tokens: 200,
        json: true,
    };
}

// ---------------------------------------------------------------------------
// Unified backend enum (dyn-compatible alternative to async trait)
// ---------------------------------------------------------------------------

/// An LLM backend that can process a prompt and return a response.
///
/// Uses enum dispatch instead of trait objects because async methods
/// are not dyn-compatible in Rust.
pub enum LlmBackend {
    /// OpenAI-compatible chat completions API.
    OpenAi(OpenAiBackend),
    /// Anthropic Messages API.
    Anthropic(AnthropicBackend),
}

impl LlmBackend {
    /// Send a prompt to the LLM and return the response text.
    ///
    /// # Errors
    ///
    /// Returns [`NarratorRuntimeError::LlmBackend`] if the HTTP call fails
    /// or the response cannot be extracted.
    pub async fn complete(
        &self,
        prompt: &RenderedPrompt,
        sampling: Sampling,
    ) -> Result<String, NarratorRuntimeError> {
        let response = self.send(prompt, sampling, false).await?;
        let json: serde_json::Value = response.json().await.map_err(|e| {
            NarratorRuntimeError::LlmBackend(format!("{} response parse failed: {e}", self.name()))
        })?;
        match self {
            Self::OpenAi(_) => extract_openai_content(&json),
            Self::Anthropic(_) => extract_anthropic_content(&json),
        }
    }

    /// Send a prompt and feed each text delta to `on_delta` as it arrives.
    ///
    /// # Errors
    ///
    /// Returns [`NarratorRuntimeError::LlmBackend`] if the request fails or
    /// the stream breaks off.
    pub async fn stream<F>(
        &self,
        prompt: &RenderedPrompt,
        sampling: Sampling,
        mut on_delta: F,
    ) -> Result<(), NarratorRuntimeError>
    where
        F: FnMut(&str) + Send,
    {
        let response = self.send(prompt, sampling, true).await?;
        let mut bytes = response.bytes_stream();
        let mut decoder = SseDecoder::default();
        while let Some(chunk) = bytes.next().await {
            let chunk = chunk.map_err(|e| {
                NarratorRuntimeError::LlmBackend(format!("{} stream broke off: {e}", self.name()))
            })?;
            for data in decoder.push(&chunk) {
                if data == "[DONE]" {
                    return Ok(());
                }
                let Ok(event) = serde_json::from_str::<serde_json::Value>(&data) else {
                    continue;
                };
                let delta = match self {
                    Self::OpenAi(_) => extract_openai_delta(&event),
                    Self::Anthropic(_) => extract_anthropic_delta(&event)?,
                };
                if let Some(text) = delta {
                    on_delta(text);
                }
            }
        }
        Ok(())
    }

    async fn send(
        &self,
        prompt: &RenderedPrompt,
        sampling: Sampling,
        stream: bool,
    ) -> Result<reqwest::Response, NarratorRuntimeError> {
        let request = match self {
            Self::OpenAi(backend) => backend.request(prompt, sampling, stream),
            Self::Anthropic(backend) => backend.request(prompt, sampling, stream),
        };
        let response = request.send().await.map_err(|e| {
            NarratorRuntimeError::LlmBackend(format!("{} request failed: {e}", self.name()))
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_owned());
            return Err(NarratorRuntimeError::LlmBackend(format!(
                "{} returned {status}: {error_body}",
                self.name()
            )));
        }
        Ok(response)
    }

    /// Human-readable name for logging.
    pub const fn name(&self) -> &str {
        match self {
            Self::OpenAi(_) => "openai-compatible",
            Self::Anthropic(_) => "anthropic",
        }
    }
}

// ---------------------------------------------------------------------------
// OpenAI-compatible backend
// ---------------------------------------------------------------------------

/// Backend for OpenAI-compatible chat completions APIs.
///
/// Works with `OpenAI`, `DeepSeek`, and Ollama endpoints.
/// Sends requests to `{api_url}/chat/completions`.
pub struct OpenAiBackend {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl OpenAiBackend {
    /// Create a new `OpenAI`-compatible backend.
    pub fn new(config: &LlmBackendConfig, client: reqwest::Client) -> Self {
        Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    fn request(
        &self,
        prompt: &RenderedPrompt,
        sampling: Sampling,
        stream: bool,
    ) -> reqwest::RequestBuilder {
        let url = format!("{}/chat/completions", self.api_url);

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": prompt.system},
                {"role": "user", "content": prompt.user}
            ],
            "temperature": sampling.temperature,
            "max_tokens": sampling.max_tokens,
            "stream": stream
        });
        if sampling.json
            && let Some(fields) = body.as_object_mut()
        {
            fields.insert(
                "response_format".to_owned(),
                serde_json::json!({"type": "json_object"}),
            );
        }

        self.client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
    }
}

/// Extract the text content from an `OpenAI` chat completions response.
fn extract_openai_content(json: &serde_json::Value) -> Result<String, NarratorRuntimeError> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| {
            NarratorRuntimeError::LlmBackend(
                "OpenAI response missing choices[0].message.content".to_owned(),
            )
        })
}

/// Extract the text delta from one `OpenAI` stream chunk.
fn extract_openai_delta(json: &serde_json::Value) -> Option<&str> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("delta"))
        .and_then(|d| d.get("content"))
        .and_then(serde_json::Value::as_str)
        .filter(|s| !s.is_empty())
}

// ---------------------------------------------------------------------------
// Anthropic Messages API backend
// ---------------------------------------------------------------------------

/// Backend for the Anthropic Messages API.
///
/// Anthropic uses a different request format from `OpenAI`:
/// - Uses `x-api-key` header instead of `Authorization: Bearer`
/// - Messages array does not include system (system is a top-level field)
/// - Response structure differs: `content[0].text`
pub struct AnthropicBackend {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl AnthropicBackend {
    /// Create a new Anthropic Messages API backend.
    pub fn new(config: &LlmBackendConfig, client: reqwest::Client) -> Self {
        Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    fn request(
        &self,
        prompt: &RenderedPrompt,
        sampling: Sampling,
        stream: bool,
    ) -> reqwest::RequestBuilder {
        let url = format!("{}/messages", self.api_url);

        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": sampling.max_tokens,
            "temperature": sampling.temperature,
            "system": prompt.system,
            "messages": [
                {"role": "user", "content": prompt.user}
            ],
            "stream": stream
        });

        self.client
            .post(url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&body)
    }
}

/// Extract the text content from an Anthropic Messages API response.
fn extract_anthropic_content(json: &serde_json::Value) -> Result<String, NarratorRuntimeError> {
    json.get("content")
        .and_then(|c| c.get(0))
        .and_then(|b| b.get("text"))
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| {
            NarratorRuntimeError::LlmBackend(
                "Anthropic response missing content[0].text".to_owned(),
            )
        })
}

/// Extract the text delta from one Anthropic stream event.
///
/// An `error` event fails the stream.
fn extract_anthropic_delta(
    json: &serde_json::Value,
) -> Result<Option<&str>, NarratorRuntimeError> {
    match json.get("type").and_then(serde_json::Value::as_str) {
        Some("content_block_delta") => Ok(json
            .get("delta")
            .and_then(|d| d.get("text"))
            .and_then(serde_json::Value::as_str)),
        Some("error") => Err(NarratorRuntimeError::LlmBackend(format!(
            "Anthropic stream error: {json}"
        ))),
        _ => Ok(None),
    }
}

// ---------------------------------------------------------------------------
// Server-sent events
// ---------------------------------------------------------------------------

/// Splits a byte stream into SSE `data:` payloads.
///
/// Lines may be split anywhere, including inside a UTF-8 sequence; only
/// complete lines are decoded.
#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
}

impl SseDecoder {
    /// Feed raw bytes and return the `data:` payloads of completed lines.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);
        let mut payloads = Vec::new();
        while let Some(newline) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line);
            if let Some(data) = line.trim_end().strip_prefix("data:") {
                payloads.push(data.trim_start().to_owned());
            }
        }
        payloads
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Create an LLM backend from configuration.
///
/// Dispatches to [`OpenAiBackend`] or [`AnthropicBackend`] based on the
/// configured [`BackendType`]. `client` carries the request timeout.
pub fn create_backend(config: &LlmBackendConfig, client: reqwest::Client) -> LlmBackend {
    match config.backend_type {
        BackendType::OpenAi => LlmBackend::OpenAi(OpenAiBackend::new(config, client)),
        BackendType::Anthropic => LlmBackend::Anthropic(AnthropicBackend::new(config, client)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config(backend_type: BackendType) -> LlmBackendConfig {
        LlmBackendConfig {
            backend_type,
            api_url: "https://llm.example.test/v1".to_owned(),
            api_key: "test".to_owned(),
            model: "test-model".to_owned(),
        }
    }

    #[test]
    fn extract_openai_content_valid() {
        let json = serde_json::json!({
            "choices": [{"message": {"content": "{\"intent\": \"WORK\"}"}}]
        });
        assert!(extract_openai_content(&json).unwrap().contains("WORK"));
    }

    #[test]
    fn extract_openai_content_missing_choices() {
        let json = serde_json::json!({"error": "rate_limit"});
        assert!(extract_openai_content(&json).is_err());
    }

    #[test]
    fn extract_anthropic_content_missing() {
        let json = serde_json::json!({"content": []});
        assert!(extract_anthropic_content(&json).is_err());
    }

    #[test]
    fn stream_deltas_per_backend() {
        let openai = serde_json::json!({"choices": [{"delta": {"content": "<narr"}}]});
        assert_eq!(extract_openai_delta(&openai), Some("<narr"));
        let role_only = serde_json::json!({"choices": [{"delta": {"role": "assistant"}}]});
        assert_eq!(extract_openai_delta(&role_only), None);

        let anthropic = serde_json::json!({
            "type": "content_block_delta",
            "delta": {"type": "text_delta", "text": "ative>"}
        });
        assert_eq!(extract_anthropic_delta(&anthropic).unwrap(), Some("ative>"));
        let ping = serde_json::json!({"type": "ping"});
        assert_eq!(extract_anthropic_delta(&ping).unwrap(), None);
        let error = serde_json::json!({"type": "error", "error": {"type": "overloaded_error"}});
        assert!(extract_anthropic_delta(&error).is_err());
    }

    #[test]
    fn sse_decoder_waits_for_complete_lines() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"event: message\ndata: {\"a\"").is_empty());
        assert_eq!(decoder.push(b":1}\n\ndata: [DONE]\n"), ["{\"a\":1}", "[DONE]"]);
    }

    #[test]
    fn sse_decoder_handles_split_utf8() {
        let line = "data: caf\u{e9}\n".as_bytes();
        let (head, tail) = line.split_at(10);
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(head).is_empty());
        assert_eq!(decoder.push(tail), ["caf\u{e9}"]);
    }

    #[test]
    fn create_backend_dispatches_correctly() {
        let client = reqwest::Client::new();
        let backend = create_backend(&config(BackendType::OpenAi), client.clone());
        assert_eq!(backend.name(), "openai-compatible");
        let backend = create_backend(&config(BackendType::Anthropic), client);
        assert_eq!(backend.name(), "anthropic");
    }
}

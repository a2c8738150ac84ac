//! LLM narrator for the Cubicle simulation.
//!
//! Implements [`cubicle_core::narrator::Narrator`] on top of OpenAI-compatible
//! and Anthropic HTTP APIs. Prompts are `minijinja` templates; replies come
//! back either as a stream of tagged sections or as one JSON object.
//!
//! # Modules
//!
//! - [`config`] -- Backend settings from the environment.
//! - [`error`] -- [`NarratorRuntimeError`](error::NarratorRuntimeError).
//! - [`llm`] -- HTTP backends and SSE decoding.
//! - [`narrator`] -- [`LlmNarrator`](narrator::LlmNarrator).
//! - [`parse`] -- JSON reply recovery.
//! - [`prompt`] -- Template loading and rendering.
//! - [`tags`] -- Incremental tagged-section parser.

pub mod config;
pub mod error;
pub mod llm;
pub mod narrator;
pub mod parse;
pub mod prompt;
pub mod tags;

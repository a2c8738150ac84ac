//! The LLM-backed [`Narrator`].
//!
//! With a streaming sink the narrator asks for the tagged format and
//! forwards every section as it completes. Without one it asks for a single
//! JSON object. Without a backend at all it answers with the heuristic
//! narrator.

use cubicle_core::narrator::{
    HeuristicNarrator, Narration, NarrationRequest, NarrationSection, Narrator, NarratorError,
    ReviewRequest, ReviewVerdict,
};
use tracing::{debug, info, warn};

use crate::config::NarratorConfig;
use crate::error::NarratorRuntimeError;
use crate::llm::{LlmBackend, Sampling, create_backend};
use crate::parse::{parse_narration, parse_verdict};
use crate::prompt::PromptEngine;
use crate::tags::TagStreamParser;

/// Speaker used when a streamed reply names nobody and no colleague was
/// addressed.
const UNNAMED_SPEAKER: &str = "Colleague";

/// Narrator that talks to an LLM, degrading to [`HeuristicNarrator`].
pub struct LlmNarrator {
    backend: Option<LlmBackend>,
    prompts: PromptEngine,
    fallback: HeuristicNarrator,
}

impl LlmNarrator {
    /// Build a narrator from configuration.
    ///
    /// Templates load from `config.templates_dir`, falling back to the
    /// embedded copies when the directory cannot be read.
    pub fn from_config(config: &NarratorConfig) -> Result<Self, NarratorRuntimeError> {
        let prompts = match PromptEngine::new(&config.templates_dir) {
            Ok(prompts) => prompts,
            Err(error) => {
                warn!(%error, dir = %config.templates_dir, "using embedded prompt templates");
                PromptEngine::embedded()?
            }
        };
        let backend = match &config.backend {
            Some(backend_config) => {
                let client = reqwest::Client::builder()
                    .timeout(config.decision_timeout)
                    .build()
                    .map_err(|e| {
                        NarratorRuntimeError::Config(format!("failed to build HTTP client: {e}"))
                    })?;
                let backend = create_backend(backend_config, client);
                info!(
                    backend = backend.name(),
                    model = %backend_config.model,
                    "LLM narrator ready"
                );
                Some(backend)
            }
            None => {
                info!("no LLM backend configured, narrating heuristically");
                None
            }
        };
        Ok(Self {
            backend,
            prompts,
            fallback: HeuristicNarrator::new(),
        })
    }

    /// A narrator with no backend.
    pub fn offline() -> Result<Self, NarratorRuntimeError> {
        Ok(Self {
            backend: None,
            prompts: PromptEngine::embedded()?,
            fallback: HeuristicNarrator::new(),
        })
    }

    /// Name of the active backend, or `"heuristic"`.
    pub fn backend_name(&self) -> &str {
        self.backend.as_ref().map_or("heuristic", LlmBackend::name)
    }

    async fn narrate_streaming(
        &self,
        backend: &LlmBackend,
        request: &NarrationRequest,
    ) -> Result<Narration, NarratorRuntimeError> {
        let prompt = self.prompts.render_narration(request, true)?;
        let speaker = request
            .npc
            .as_ref()
            .map_or(UNNAMED_SPEAKER, |npc| npc.name.as_str());
        let mut parser = TagStreamParser::new();
        let mut assembled = Assembled::default();

        let streamed = backend
            .stream(&prompt, Sampling::STREAM, |delta| {
                for section in parser.push(delta) {
                    if let Some(event) = section.to_narration(speaker) {
                        assembled.absorb(&event);
                        request.emit(event);
                    }
                }
            })
            .await;
        if let Err(error) = streamed {
            request.emit(NarrationSection::Error {
                message: error.to_string(),
            });
            return Err(error);
        }
        if !parser.pending().is_empty() {
            debug!(pending = parser.pending(), "stream ended inside a section");
        }
        assembled.finish()
    }

    async fn narrate_structured(
        &self,
        backend: &LlmBackend,
        request: &NarrationRequest,
    ) -> Result<Narration, NarratorRuntimeError> {
        let prompt = self.prompts.render_narration(request, false)?;
        let raw = backend.complete(&prompt, Sampling::STRUCTURED).await?;
        parse_narration(&raw, request.npc.as_ref().map(|npc| npc.name.as_str()))
    }
}

/// Folds streamed sections into a [`Narration`].
#[derive(Debug, Default)]
struct Assembled {
    narration: Narration,
    sections: usize,
    failure: Option<String>,
}

impl Assembled {
    fn absorb(&mut self, section: &NarrationSection) {
        self.sections = self.sections.saturating_add(1);
        let n = &mut self.narration;
        match section {
            NarrationSection::Analysis { intent, magnitude } => {
                n.intent = *intent;
                n.magnitude = *magnitude;
            }
            NarrationSection::Narrative { text } => n.system_narrative = Some(text.clone()),
            NarrationSection::Reply { npc, text } => {
                n.npc_name = Some(npc.clone());
                n.npc_reply = Some(text.clone());
            }
            NarrationSection::Effects { mood, trust } => {
                n.mood_change = *mood;
                n.trust_change = *trust;
            }
            NarrationSection::Error { message } => self.failure = Some(message.clone()),
        }
    }

    fn finish(self) -> Result<Narration, NarratorRuntimeError> {
        if let Some(message) = self.failure {
            return Err(NarratorRuntimeError::LlmBackend(message));
        }
        if self.sections == 0 {
            return Err(NarratorRuntimeError::Parse(
                "stream ended without a complete section".to_owned(),
            ));
        }
        Ok(self.narration)
    }
}

impl Narrator for LlmNarrator {
    async fn narrate(&self, request: &NarrationRequest) -> Result<Narration, NarratorError> {
        let Some(backend) = &self.backend else {
            return self.fallback.narrate(request).await;
        };

        if request.sink.is_some() {
            // Sections may already have reached the caller, so a heuristic
            // reply on top would duplicate them.
            return self
                .narrate_streaming(backend, request)
                .await
                .map_err(|error| {
                    warn!(backend = backend.name(), %error, "streamed narration failed");
                    NarratorError::from(error)
                });
        }

        match self.narrate_structured(backend, request).await {
            Ok(narration) => Ok(narration),
            Err(error) => {
                warn!(
                    backend = backend.name(),
                    %error,
                    "structured narration failed, using heuristic reply"
                );
                self.fallback.narrate(request).await
            }
        }
    }

    async fn score_review(&self, request: &ReviewRequest) -> Result<ReviewVerdict, NarratorError> {
        let Some(backend) = &self.backend else {
            return self.fallback.score_review(request).await;
        };
        let prompt = self.prompts.render_review(request)?;
        let raw = backend.complete(&prompt, Sampling::REVIEW).await?;
        let verdict = parse_verdict(&raw)?;
        debug!(
            target_level = %request.target_level,
            score = verdict.score,
            "review scored"
        );
        Ok(verdict)
    }
}

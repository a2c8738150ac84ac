//! Prompt template loading and rendering via `minijinja`.
//!
//! Templates are loaded from the filesystem so operators can tune the
//! narrator's voice without recompiling. The same templates are embedded in
//! the binary and used when the directory is missing.

use cubicle_core::narrator::{NarrationRequest, ReviewRequest};
use minijinja::Environment;

use crate::error::NarratorRuntimeError;

/// Template names and their embedded sources.
const TEMPLATES: [(&str, &str); 4] = [
    ("narrate_system", include_str!("../templates/narrate_system.j2")),
    ("narrate_user", include_str!("../templates/narrate_user.j2")),
    ("review_system", include_str!("../templates/review_system.j2")),
    ("review_user", include_str!("../templates/review_user.j2")),
];

/// Manages prompt template loading and rendering.
pub struct PromptEngine {
    env: Environment<'static>,
}

/// The complete rendered prompt ready to send to an LLM backend.
#[derive(Debug, Clone)]
pub struct RenderedPrompt {
    /// System message framing the task and output format.
    pub system: String,
    /// User message carrying the player's input and context.
    pub user: String,
}

impl PromptEngine {
    /// Create a prompt engine loading templates from the given directory.
    ///
    /// The directory must contain `narrate_system.j2`, `narrate_user.j2`,
    /// `review_system.j2` and `review_user.j2`.
    pub fn new(templates_dir: &str) -> Result<Self, NarratorRuntimeError> {
        let mut env = Environment::new();
        for (name, _) in TEMPLATES {
            let source = load_template(templates_dir, &format!("{name}.j2"))?;
            env.add_template_owned(name, source).map_err(|e| {
                NarratorRuntimeError::Template(format!("failed to add {name} template: {e}"))
            })?;
        }
        Ok(Self { env })
    }

    /// Create a prompt engine from the templates compiled into the crate.
    pub fn embedded() -> Result<Self, NarratorRuntimeError> {
        let mut env = Environment::new();
        for (name, source) in TEMPLATES {
            env.add_template(name, source).map_err(|e| {
                NarratorRuntimeError::Template(format!("failed to add {name} template: {e}"))
            })?;
        }
        Ok(Self { env })
    }

    /// Render the prompt for one dialogue turn.
    ///
    /// `streaming` selects the tagged output format over JSON.
    pub fn render_narration(
        &self,
        request: &NarrationRequest,
        streaming: bool,
    ) -> Result<RenderedPrompt, NarratorRuntimeError> {
        let context = serde_json::json!({
            "text": request.text,
            "player": request.player,
            "npc": request.npc,
            "recent": request.recent,
            "facts": request.facts,
            "streaming": streaming,
        });
        Ok(RenderedPrompt {
            system: self.render("narrate_system", &context)?,
            user: self.render("narrate_user", &context)?,
        })
    }

    /// Render the prompt for scoring a promotion answer.
    pub fn render_review(
        &self,
        request: &ReviewRequest,
    ) -> Result<RenderedPrompt, NarratorRuntimeError> {
        let context = serde_json::to_value(request)?;
        Ok(RenderedPrompt {
            system: self.render("review_system", &context)?,
            user: self.render("review_user", &context)?,
        })
    }

    fn render(
        &self,
        name: &str,
        context: &serde_json::Value,
    ) -> Result<String, NarratorRuntimeError> {
        self.env
            .get_template(name)
            .map_err(|e| NarratorRuntimeError::Template(format!("missing {name} template: {e}")))?
            .render(context)
            .map_err(|e| NarratorRuntimeError::Template(format!("{name} render failed: {e}")))
    }
}

/// Read a template file from disk.
fn load_template(dir: &str, filename: &str) -> Result<String, NarratorRuntimeError> {
    let path = format!("{dir}/{filename}");
    std::fs::read_to_string(&path)
        .map_err(|e| NarratorRuntimeError::Template(format!("failed to read {path}: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cubicle_core::narrator::PlayerSnapshot;
    use cubicle_types::{Level, Role};

    use super::*;

    fn player() -> PlayerSnapshot {
        PlayerSnapshot {
            name: "Ada".to_owned(),
            role: Role::Dev,
            level: Level::P5,
            mood: 80,
            energy: 120,
            kpi: 0,
            project: "Genshin Impact".to_owned(),
            week: 3,
        }
    }

    fn request(text: &str) -> NarrationRequest {
        NarrationRequest {
            text: text.to_owned(),
            player: player(),
            recent: Vec::new(),
            npc: None,
            facts: vec!["Shipped the 4.2 patch".to_owned()],
            sink: None,
        }
    }

    #[test]
    fn embedded_templates_render_both_formats() {
        let engine = PromptEngine::embedded().unwrap();
        let tagged = engine.render_narration(&request("fix the crash"), true).unwrap();
        assert!(tagged.system.contains("<analysis>"));
        assert!(tagged.system.contains("Genshin Impact"));
        assert!(tagged.user.contains("fix the crash"));
        assert!(tagged.user.contains("Shipped the 4.2 patch"));

        let json = engine.render_narration(&request("fix the crash"), false).unwrap();
        assert!(json.system.contains("\"npc_reply\""));
        assert!(!json.system.contains("<analysis>"));
    }

    #[test]
    fn review_prompt_carries_question_and_answer() {
        let engine = PromptEngine::embedded().unwrap();
        let review = ReviewRequest {
            target_level: Level::P6,
            question: "What did you own this quarter?".to_owned(),
            answer: "The crash pipeline.".to_owned(),
            player: player(),
            jitter: 0,
        };
        let prompt = engine.render_review(&review).unwrap();
        assert!(prompt.system.contains("Target level: P6"));
        assert!(prompt.user.contains("The crash pipeline."));
    }

    #[test]
    fn missing_template_returns_error() {
        let dir = std::env::temp_dir().join(format!(
            "cubicle_missing_templates_{}_{:?}",
            std::process::id(),
            std::thread::current().id(),
        ));
        std::fs::create_dir_all(&dir).ok();
        std::fs::write(dir.join("narrate_system.j2"), "test").ok();

        let result = PromptEngine::new(dir.to_str().unwrap_or(""));
        assert!(matches!(result, Err(NarratorRuntimeError::Template(_))));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn templates_load_from_disk() {
        let dir = concat!(env!("CARGO_MANIFEST_DIR"), "/templates");
        assert!(PromptEngine::new(dir).is_ok());
    }
}

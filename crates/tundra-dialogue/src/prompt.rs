//! Prompt rendering via `minijinja`.
//!
//! A single template turns a respondent's persona and the message it is
//! answering into the prompt text sent to the backend. Operators can change
//! the template in `tundra.yaml` without recompiling.

use minijinja::{Environment, context};

use crate::error::DialogueError;

const TEMPLATE_NAME: &str = "prompt";

/// Renders generation prompts.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    /// Compile `template`.
    pub fn new(template: &str) -> Result<Self, DialogueError> {
        let mut env = Environment::new();
        env.add_template_owned(TEMPLATE_NAME, template.to_owned())
            .map_err(|e| DialogueError::Template(format!("failed to add prompt template: {e}")))?;
        Ok(Self { env })
    }

    /// Render the prompt for `speaker`'s `message`, answered in `persona`.
    pub fn render(&self, persona: &str, speaker: &str, message: &str) -> Result<String, DialogueError> {
        self.env
            .get_template(TEMPLATE_NAME)
            .map_err(|e| DialogueError::Template(format!("missing prompt template: {e}")))?
            .render(context! { persona, speaker, message })
            .map_err(|e| DialogueError::Template(format!("prompt render failed: {e}")))
    }
}

impl std::fmt::Debug for PromptEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptEngine").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DialogueConfig;

    #[test]
    fn default_template_prefixes_persona() {
        let engine = PromptEngine::new(&DialogueConfig::default().prompt_template);
        let prompt = engine
            .and_then(|e| e.render("You are Gary.", "Rookie", "How do rockets work?"))
            .unwrap_or_default();
        assert_eq!(prompt, "You are Gary.\n\nHow do rockets work?");
    }

    #[test]
    fn custom_template_sees_speaker() {
        let engine = PromptEngine::new("{{ persona }} {{ speaker }} asks: {{ message }}");
        let prompt = engine
            .and_then(|e| e.render("You are Gary.", "Rookie", "Why?"))
            .unwrap_or_default();
        assert_eq!(prompt, "You are Gary. Rookie asks: Why?");
    }

    #[test]
    fn broken_template_is_rejected() {
        assert!(PromptEngine::new("{{ persona").is_err());
    }
}

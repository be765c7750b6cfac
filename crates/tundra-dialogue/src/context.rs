//! Long-lived state shared by every conversation.
//!
//! One [`DialogueContext`] is built at startup and handed to the
//! orchestrator as `Arc<DialogueContext>`. It owns the loaded data tables,
//! the prompt template, the backend, and the generation gate; nothing in
//! this crate keeps global state.

use std::sync::{Arc, OnceLock};
use std::time::Instant;

use tokio::time::timeout;
use tracing::{info, warn};
use tundra_world::RoomEvents;

use crate::config::DialogueConfig;
use crate::emotions::EmotionTable;
use crate::error::DialogueError;
use crate::filter::ContentFilter;
use crate::gate::GenerationGate;
use crate::llm::{GenerationRequest, LlmBackend};
use crate::personas::PersonaBook;
use crate::prompt::PromptEngine;

/// Configuration, data tables, backend, and ports for conversations.
pub struct DialogueContext {
    /// Conversation tuning.
    pub config: DialogueConfig,
    /// Persona prompts by nickname.
    pub personas: PersonaBook,
    /// Incoming chat filter.
    pub filter: ContentFilter,
    emotions: OnceLock<EmotionTable>,
    prompts: PromptEngine,
    backend: LlmBackend,
    gate: GenerationGate,
    events: Arc<dyn RoomEvents>,
}

impl DialogueContext {
    /// Assemble a context, loading personas and the term list from the
    /// configured paths (or the built-in tables).
    ///
    /// The emotion table is loaded on first use.
    pub fn new(
        config: DialogueConfig,
        backend: LlmBackend,
        events: Arc<dyn RoomEvents>,
    ) -> Result<Self, DialogueError> {
        let personas = match &config.personas_path {
            Some(path) => PersonaBook::load(path)?,
            None => PersonaBook::builtin()?,
        };
        let filter = match &config.flagged_terms_path {
            Some(path) => ContentFilter::load(path)?,
            None => ContentFilter::builtin(),
        };
        let prompts = PromptEngine::new(&config.prompt_template)?;
        let gate = GenerationGate::new(config.max_concurrent_generations);

        info!(
            backend = backend.name(),
            personas = personas.len(),
            max_concurrent_generations = gate.capacity(),
            "dialogue context ready"
        );

        Ok(Self {
            config,
            personas,
            filter,
            emotions: OnceLock::new(),
            prompts,
            backend,
            gate,
            events,
        })
    }

    /// Replace the persona table.
    #[must_use]
    pub fn with_personas(mut self, personas: PersonaBook) -> Self {
        self.personas = personas;
        self
    }

    /// Replace the content filter.
    #[must_use]
    pub fn with_filter(mut self, filter: ContentFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Use `emotions` instead of loading the table lazily.
    #[must_use]
    pub fn with_emotions(self, emotions: EmotionTable) -> Self {
        let _ = self.emotions.set(emotions);
        self
    }

    /// The emotion table, loaded on first call.
    ///
    /// A table that fails to load is logged and replaced by an empty one.
    pub fn emotions(&self) -> &EmotionTable {
        self.emotions.get_or_init(|| {
            let loaded = match &self.config.emotions_path {
                Some(path) => EmotionTable::load(path),
                None => EmotionTable::builtin(),
            };
            loaded.unwrap_or_else(|e| {
                warn!(error = %e, "emotion table unavailable, replies get no emotes");
                EmotionTable::default()
            })
        })
    }

    /// Outward event sink.
    pub const fn events(&self) -> &Arc<dyn RoomEvents> {
        &self.events
    }

    /// The shared generation gate.
    pub const fn gate(&self) -> &GenerationGate {
        &self.gate
    }

    /// The generation backend.
    pub const fn backend(&self) -> &LlmBackend {
        &self.backend
    }

    /// Build the request for `nickname` answering `speaker`'s `message`.
    ///
    /// A template failure is logged and the bare message is used instead.
    pub fn request_for(&self, nickname: &str, speaker: &str, message: &str) -> GenerationRequest {
        let persona = self.personas.get(nickname).unwrap_or_default();
        let prompt = self
            .prompts
            .render(persona, speaker, message)
            .unwrap_or_else(|e| {
                warn!(bot = nickname, error = %e, "prompt render failed, sending bare message");
                message.to_owned()
            });
        GenerationRequest {
            model: self.config.model_for(nickname),
            prompt,
            params: self.config.params,
        }
    }

    /// Run `request` through the gate and the backend under the timeout.
    pub async fn try_generate(&self, request: &GenerationRequest) -> Result<String, DialogueError> {
        let _pass = self.gate.admit(&request.model).await;
        let deadline = self.config.generation_timeout();
        match timeout(deadline, self.backend.generate(request)).await {
            Ok(result) => result,
            Err(_) => Err(DialogueError::Timeout {
                timeout_ms: self.config.generation_timeout_ms,
            }),
        }
    }

    /// Like [`Self::try_generate`], but any failure yields empty text.
    pub async fn generate(&self, request: &GenerationRequest) -> String {
        let started = Instant::now();
        match self.try_generate(request).await {
            Ok(text) => {
                info!(
                    model = %request.model,
                    chars = text.chars().count(),
                    elapsed_ms = started.elapsed().as_millis(),
                    "generation complete"
                );
                text
            }
            Err(e) => {
                warn!(
                    model = %request.model,
                    backend = self.backend.name(),
                    error = %e,
                    "generation failed, continuing with an empty reply"
                );
                String::new()
            }
        }
    }
}

impl std::fmt::Debug for DialogueContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialogueContext")
            .field("config", &self.config)
            .field("personas", &self.personas.len())
            .field("backend", &self.backend)
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}

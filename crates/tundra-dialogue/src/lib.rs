//! Conversations between players and tundra bots.
//!
//! A player's chat line is checked by the [`ContentFilter`], answered by
//! the nearest (or named) bot through a text generation backend, split into
//! chat-sized chunks, and passed on from bot to bot for a few follow-ups.
//!
//! # Modules
//!
//! - [`clock`] -- Time-of-day replies.
//! - [`config`] -- [`DialogueConfig`] with stock defaults.
//! - [`context`] -- [`DialogueContext`] shared by every exchange.
//! - [`emotions`] -- Keyword to emoticon table.
//! - [`error`] -- [`DialogueError`].
//! - [`filter`] -- Flagged-language detection with de-obfuscation.
//! - [`gate`] -- Bounded, FIFO-fair admission to the backend.
//! - [`llm`] -- Ollama, OpenAI-compatible, and scripted backends.
//! - [`orchestrator`] -- The exchange loop.
//! - [`participants`] -- Eligibility, sampling, and respondent choice.
//! - [`personas`] -- Persona prompts and Modelfile generation.
//! - [`prompt`] -- Prompt template rendering.
//! - [`splitter`] -- Sentence splitting and chunking.

pub mod clock;
pub mod config;
pub mod context;
pub mod emotions;
pub mod error;
pub mod filter;
pub mod gate;
pub mod llm;
pub mod orchestrator;
pub mod participants;
pub mod personas;
pub mod prompt;
pub mod splitter;

pub use clock::time_reply;
pub use config::{DialogueConfig, GenerationParams, model_name};
pub use context::DialogueContext;
pub use emotions::{Emotion, EmotionTable};
pub use error::DialogueError;
pub use filter::ContentFilter;
pub use gate::GenerationGate;
pub use llm::{BackendType, GenerationRequest, LlmBackend, LlmBackendConfig, ScriptedBackend, create_backend};
pub use orchestrator::{ConversationTurn, ExchangeOutcome, Orchestrator};
pub use participants::{
    ConversationRoster, Ineligible, eligibility, eligible_participants, sample_participants,
    select_respondent,
};
pub use personas::PersonaBook;
pub use prompt::PromptEngine;
pub use splitter::split_sentences;

//! Typed configuration for conversations.
//!
//! Mirrors the `dialogue` section of `tundra.yaml`. Every field has a
//! default, so an empty section yields the stock conversation behavior.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Sampling parameters sent with every generation request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Nucleus sampling mass.
    #[serde(default = "default_top_p")]
    pub top_p: f64,
    /// Candidate tokens considered per step.
    #[serde(default = "default_top_k")]
    pub top_k: u32,
    /// Upper bound on generated tokens.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Penalty for tokens already present.
    #[serde(default = "default_presence_penalty")]
    pub presence_penalty: f64,
    /// Penalty proportional to token frequency.
    #[serde(default)]
    pub frequency_penalty: f64,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            top_p: default_top_p(),
            top_k: default_top_k(),
            max_tokens: default_max_tokens(),
            presence_penalty: default_presence_penalty(),
            frequency_penalty: 0.0,
        }
    }
}

/// Conversation orchestrator configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DialogueConfig {
    /// Model used for every respondent when `per_persona_models` is off.
    #[serde(default = "default_model")]
    pub model: String,

    /// Address each respondent's own model, named after its nickname.
    #[serde(default = "default_true")]
    pub per_persona_models: bool,

    /// Deadline for a single generation request.
    #[serde(default = "default_generation_timeout_ms")]
    pub generation_timeout_ms: u64,

    /// Generations allowed to run against the backend at once.
    #[serde(default = "default_max_concurrent_generations")]
    pub max_concurrent_generations: usize,

    /// Sampling parameters.
    #[serde(default)]
    pub params: GenerationParams,

    /// Prompt template; sees `persona`, `speaker`, and `message`.
    #[serde(default = "default_prompt_template")]
    pub prompt_template: String,

    /// Chunks shorter than this are merged with their neighbours.
    #[serde(default = "default_min_chunk_chars")]
    pub min_chunk_chars: usize,

    /// Chunks never exceed this unless a single word does.
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,

    /// Pause after every delivered chunk, before the per-character part.
    #[serde(default = "default_chunk_delay_base_ms")]
    pub chunk_delay_base_ms: u64,

    /// Pause added per character of the delivered chunk.
    #[serde(default = "default_chunk_delay_per_char_ms")]
    pub chunk_delay_per_char_ms: u64,

    /// Longest pause between chunks.
    #[serde(default = "default_chunk_delay_max_ms")]
    pub chunk_delay_max_ms: u64,

    /// Smallest follow-up bound drawn per exchange.
    #[serde(default = "default_recursion_bound_min")]
    pub recursion_bound_min: u32,

    /// Largest follow-up bound drawn per exchange.
    #[serde(default = "default_recursion_bound_max")]
    pub recursion_bound_max: u32,

    /// Eligible bots at or above this count are sampled down to a random
    /// subset of at least this size.
    #[serde(default = "default_sample_min")]
    pub sample_min: usize,

    /// Phrases answered with the time of day instead of a generation.
    #[serde(default = "default_time_queries")]
    pub time_queries: Vec<String>,

    /// Offset from UTC of the in-world clock, in minutes.
    #[serde(default = "default_time_zone_offset_minutes")]
    pub time_zone_offset_minutes: i32,

    /// Words that make a speaking bot wave.
    #[serde(default = "default_greeting_words")]
    pub greeting_words: Vec<String>,

    /// Persona table override (`name -> prompt prefix` JSON).
    #[serde(default)]
    pub personas_path: Option<PathBuf>,

    /// Emotion table override (`emotion -> {keywords, emoticon_id}` JSON).
    #[serde(default)]
    pub emotions_path: Option<PathBuf>,

    /// Flagged term list override, one term per line.
    #[serde(default)]
    pub flagged_terms_path: Option<PathBuf>,
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            per_persona_models: true,
            generation_timeout_ms: default_generation_timeout_ms(),
            max_concurrent_generations: default_max_concurrent_generations(),
            params: GenerationParams::default(),
            prompt_template: default_prompt_template(),
            min_chunk_chars: default_min_chunk_chars(),
            max_chunk_chars: default_max_chunk_chars(),
            chunk_delay_base_ms: default_chunk_delay_base_ms(),
            chunk_delay_per_char_ms: default_chunk_delay_per_char_ms(),
            chunk_delay_max_ms: default_chunk_delay_max_ms(),
            recursion_bound_min: default_recursion_bound_min(),
            recursion_bound_max: default_recursion_bound_max(),
            sample_min: default_sample_min(),
            time_queries: default_time_queries(),
            time_zone_offset_minutes: default_time_zone_offset_minutes(),
            greeting_words: default_greeting_words(),
            personas_path: None,
            emotions_path: None,
            flagged_terms_path: None,
        }
    }
}

impl DialogueConfig {
    /// Deadline for one generation.
    pub const fn generation_timeout(&self) -> Duration {
        Duration::from_millis(self.generation_timeout_ms)
    }

    /// Pause after delivering a chunk of `chars` characters.
    pub fn chunk_delay(&self, chars: usize) -> Duration {
        let per_char = u64::try_from(chars)
            .unwrap_or(u64::MAX)
            .saturating_mul(self.chunk_delay_per_char_ms);
        Duration::from_millis(
            self.chunk_delay_base_ms
                .saturating_add(per_char)
                .min(self.chunk_delay_max_ms),
        )
    }

    /// Model that answers for `nickname`.
    pub fn model_for(&self, nickname: &str) -> String {
        if self.per_persona_models {
            model_name(nickname)
        } else {
            self.model.clone()
        }
    }

    /// Whether `message` asks for the time of day.
    pub fn is_time_query(&self, message: &str) -> bool {
        let message = message.to_lowercase();
        self.time_queries
            .iter()
            .any(|query| message.contains(&query.to_lowercase()))
    }
}

/// Model and Modelfile name for a persona: spaces become underscores.
pub fn model_name(nickname: &str) -> String {
    nickname.replace(' ', "_")
}

fn default_model() -> String {
    "llama3".to_owned()
}

fn default_prompt_template() -> String {
    "{{ persona }}\n\n{{ message }}".to_owned()
}

const fn default_true() -> bool {
    true
}

const fn default_generation_timeout_ms() -> u64 {
    10_000
}

const fn default_max_concurrent_generations() -> usize {
    1
}

const fn default_temperature() -> f64 {
    0.7
}

const fn default_top_p() -> f64 {
    0.9
}

const fn default_top_k() -> u32 {
    50
}

const fn default_max_tokens() -> u32 {
    100
}

const fn default_presence_penalty() -> f64 {
    0.6
}

const fn default_min_chunk_chars() -> usize {
    80
}

const fn default_max_chunk_chars() -> usize {
    95
}

const fn default_chunk_delay_base_ms() -> u64 {
    1_000
}

const fn default_chunk_delay_per_char_ms() -> u64 {
    50
}

const fn default_chunk_delay_max_ms() -> u64 {
    5_000
}

const fn default_recursion_bound_min() -> u32 {
    2
}

const fn default_recursion_bound_max() -> u32 {
    4
}

const fn default_sample_min() -> usize {
    3
}

fn default_time_queries() -> Vec<String> {
    vec!["what's the time".to_owned(), "tell me the time".to_owned()]
}

const fn default_time_zone_offset_minutes() -> i32 {
    -480
}

fn default_greeting_words() -> Vec<String> {
    ["ahoy", "hey", "hello", "greetings", "hi", "howdy", "hiya", "yo"]
        .into_iter()
        .map(ToOwned::to_owned)
        .collect()
}

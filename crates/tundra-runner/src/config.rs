//! Configuration for the runner.
//!
//! Infrastructure settings (NATS, text generation backend) come from
//! environment variables. Tuning lives in an optional YAML file
//! (`TUNDRA_CONFIG`, default `tundra.yaml`) whose sections map onto the
//! behavior and dialogue crates' own config types. A missing file means
//! stock defaults everywhere.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;
use tundra_behavior::{BehaviorConfig, Span};
use tundra_dialogue::{BackendType, DialogueConfig, LlmBackendConfig};
use tundra_types::Outfit;

use crate::error::RunnerError;

/// Settings read from the environment.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// NATS server URL (e.g. `nats://localhost:4222`).
    pub nats_url: String,
    /// Text generation backend.
    pub backend: LlmBackendConfig,
    /// Overrides `dialogue.model` when set.
    pub model: Option<String>,
    /// Overrides `dialogue.generation_timeout_ms` when set.
    pub generation_timeout_ms: Option<u64>,
    /// Overrides `dialogue.max_concurrent_generations` when set.
    pub max_concurrent_generations: Option<usize>,
    /// Write persona Modelfiles here at startup.
    pub modelfiles_dir: Option<PathBuf>,
    /// Base Modelfile for persona Modelfiles; the built-in one otherwise.
    pub modelfile_base: Option<PathBuf>,
    /// YAML tuning file.
    pub config_path: PathBuf,
}

impl RunnerConfig {
    /// Load configuration from environment variables.
    ///
    /// Required variables:
    /// - `NATS_URL` -- NATS server connection string
    ///
    /// Optional variables:
    /// - `LLM_BACKEND` -- `ollama` (default) or `openai`
    /// - `LLM_API_URL` -- backend base URL (default `http://localhost:11434`)
    /// - `LLM_API_KEY` -- bearer token for OpenAI-compatible APIs
    /// - `LLM_MODEL` -- model for every persona
    /// - `GENERATION_TIMEOUT_MS` -- per-generation deadline
    /// - `MAX_CONCURRENT_GENERATIONS` -- generations admitted at once
    /// - `MODELFILES_DIR` -- write persona Modelfiles into this directory
    /// - `MODELFILE_BASE` -- base Modelfile for persona Modelfiles
    /// - `TUNDRA_CONFIG` -- YAML tuning file (default `tundra.yaml`)
    pub fn from_env() -> Result<Self, RunnerError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup` instead of the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, RunnerError> {
        let nats_url = lookup("NATS_URL")
            .ok_or_else(|| RunnerError::Config("missing required env var NATS_URL".to_owned()))?;

        let backend_type = lookup("LLM_BACKEND")
            .map_or(Ok(BackendType::Ollama), |raw| BackendType::from_str(&raw))?;
        let api_url = lookup("LLM_API_URL").unwrap_or_else(|| "http://localhost:11434".to_owned());
        let api_key = lookup("LLM_API_KEY").filter(|key| !key.is_empty());

        Ok(Self {
            nats_url,
            backend: LlmBackendConfig {
                backend_type,
                api_url,
                api_key,
            },
            model: lookup("LLM_MODEL").filter(|m| !m.is_empty()),
            generation_timeout_ms: parse_optional(&lookup, "GENERATION_TIMEOUT_MS")?,
            max_concurrent_generations: parse_optional(&lookup, "MAX_CONCURRENT_GENERATIONS")?,
            modelfiles_dir: lookup("MODELFILES_DIR").map(PathBuf::from),
            modelfile_base: lookup("MODELFILE_BASE").map(PathBuf::from),
            config_path: lookup("TUNDRA_CONFIG")
                .map_or_else(|| PathBuf::from("tundra.yaml"), PathBuf::from),
        })
    }

    /// Fold the environment overrides into the dialogue section.
    pub fn apply_overrides(&self, dialogue: &mut DialogueConfig) {
        if let Some(model) = &self.model {
            dialogue.model.clone_from(model);
            dialogue.per_persona_models = false;
        }
        if let Some(timeout_ms) = self.generation_timeout_ms {
            dialogue.generation_timeout_ms = timeout_ms;
        }
        if let Some(limit) = self.max_concurrent_generations {
            dialogue.max_concurrent_generations = limit;
        }
    }
}

fn parse_optional<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>, RunnerError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(name)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|e| RunnerError::Config(format!("invalid {name}: {e}")))
        })
        .transpose()
}

/// The YAML tuning file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BotsConfig {
    /// Behavior engine tuning.
    #[serde(default)]
    pub behavior: BehaviorConfig,
    /// Conversation tuning.
    #[serde(default)]
    pub dialogue: DialogueConfig,
    /// Which bots exist and how many are out at once.
    #[serde(default)]
    pub population: PopulationConfig,
}

impl BotsConfig {
    /// Read `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, RunnerError> {
        match std::fs::read_to_string(path) {
            Ok(raw) => Self::parse(&raw),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(RunnerError::Io {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    /// Parse YAML text.
    pub fn parse(raw: &str) -> Result<Self, RunnerError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(raw)?)
    }
}

/// One bot account the runner may bring out.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RosterEntry {
    /// Display name; also the persona and model key.
    pub nickname: String,
    /// Worn items.
    #[serde(default)]
    pub outfit: Outfit,
}

impl RosterEntry {
    /// An entry with nothing worn.
    pub fn named(nickname: impl Into<String>) -> Self {
        Self {
            nickname: nickname.into(),
            outfit: Outfit::empty(),
        }
    }
}

/// Bot population settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PopulationConfig {
    /// Every bot account.
    #[serde(default = "default_roster")]
    pub roster: Vec<RosterEntry>,

    /// Ambient bots brought out at startup.
    #[serde(default)]
    pub initial: usize,

    /// Periodically swap an ambient bot for an idle one.
    #[serde(default = "default_true")]
    pub rotation_enabled: bool,

    /// Seconds between rotations.
    #[serde(default = "default_rotation_secs")]
    pub rotation_secs: Span<u64>,

    /// Rotation only happens with more than this many active bots.
    #[serde(default = "default_rotation_min_active")]
    pub rotation_min_active: usize,

    /// Chat lines starting with this are operator commands, not chat.
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            roster: default_roster(),
            initial: 0,
            rotation_enabled: true,
            rotation_secs: default_rotation_secs(),
            rotation_min_active: default_rotation_min_active(),
            command_prefix: default_command_prefix(),
        }
    }
}

fn default_roster() -> Vec<RosterEntry> {
    ["Cadence", "Gary", "Rockhopper", "Aunt Arctic", "Rookie", "Franky"]
        .into_iter()
        .map(RosterEntry::named)
        .collect()
}

const fn default_true() -> bool {
    true
}

const fn default_rotation_secs() -> Span<u64> {
    Span::new(60, 179)
}

const fn default_rotation_min_active() -> usize {
    2
}

fn default_command_prefix() -> String {
    "!".to_owned()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use tundra_types::ClothingSlot;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn nats_url_is_required() {
        assert!(matches!(
            RunnerConfig::from_lookup(env(&[])),
            Err(RunnerError::Config(_))
        ));
    }

    #[test]
    fn environment_defaults() {
        let config = RunnerConfig::from_lookup(env(&[("NATS_URL", "nats://localhost:4222")]));
        let Ok(config) = config else {
            panic!("config should load");
        };
        assert_eq!(config.backend.backend_type, BackendType::Ollama);
        assert_eq!(config.backend.api_url, "http://localhost:11434");
        assert_eq!(config.backend.api_key, None);
        assert_eq!(config.model, None);
        assert_eq!(config.config_path, PathBuf::from("tundra.yaml"));
    }

    #[test]
    fn environment_overrides_dialogue() {
        let config = RunnerConfig::from_lookup(env(&[
            ("NATS_URL", "nats://nats:4222"),
            ("LLM_BACKEND", "openai"),
            ("LLM_API_KEY", ""),
            ("LLM_MODEL", "mistral"),
            ("GENERATION_TIMEOUT_MS", "2500"),
            ("MAX_CONCURRENT_GENERATIONS", "3"),
        ]));
        let Ok(config) = config else {
            panic!("config should load");
        };
        assert_eq!(config.backend.backend_type, BackendType::OpenAi);
        assert_eq!(config.backend.api_key, None);

        let mut dialogue = DialogueConfig::default();
        config.apply_overrides(&mut dialogue);
        assert_eq!(dialogue.model_for("Aunt Arctic"), "mistral");
        assert_eq!(dialogue.generation_timeout_ms, 2500);
        assert_eq!(dialogue.max_concurrent_generations, 3);
    }

    #[test]
    fn bad_numbers_are_rejected() {
        let config = RunnerConfig::from_lookup(env(&[
            ("NATS_URL", "nats://nats:4222"),
            ("GENERATION_TIMEOUT_MS", "soon"),
        ]));
        assert!(matches!(config, Err(RunnerError::Config(_))));

        let config = RunnerConfig::from_lookup(env(&[
            ("NATS_URL", "nats://nats:4222"),
            ("LLM_BACKEND", "carrier-pigeon"),
        ]));
        assert!(matches!(config, Err(RunnerError::Dialogue(_))));
    }

    #[test]
    fn empty_yaml_gives_defaults() {
        let config = BotsConfig::parse("").unwrap_or_default();
        assert_eq!(config.population, PopulationConfig::default());
        assert_eq!(config.population.roster.len(), 6);
        assert_eq!(config.dialogue.max_chunk_chars, 95);
    }

    #[test]
    fn yaml_sections() {
        let raw = "
behavior:
  snowball_margin: 30
dialogue:
  recursion_bound_max: 3
population:
  initial: 4
  rotation_secs: { min: 10, max: 20 }
  roster:
    - nickname: Gary
      outfit: { head: 413, hand: 5017 }
    - nickname: Sensei
";
        let config = match BotsConfig::parse(raw) {
            Ok(config) => config,
            Err(e) => panic!("yaml should parse: {e}"),
        };
        assert_eq!(config.behavior.snowball_margin, 30);
        assert_eq!(config.dialogue.recursion_bound_max, 3);
        assert_eq!(config.population.initial, 4);
        assert_eq!(config.population.rotation_secs, Span::new(10, 20));
        assert_eq!(config.population.roster.len(), 2);
        let gary = config.population.roster.first().map(|r| r.outfit.item(ClothingSlot::Head));
        assert_eq!(gary, Some(Some(413)));
        assert_eq!(config.population.command_prefix, "!");
    }

    #[test]
    fn missing_file_gives_defaults() {
        let config = BotsConfig::load(Path::new("/nonexistent/tundra.yaml"));
        assert!(config.is_ok());
    }
}

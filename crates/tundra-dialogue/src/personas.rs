//! Persona prompts, keyed by bot nickname, and the Ollama Modelfiles built
//! from them.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::model_name;
use crate::error::DialogueError;

const BUILTIN_PERSONAS: &str = include_str!("../data/personas.json");

/// The `SYSTEM` line of the base Modelfile that each persona replaces.
pub const BASE_SYSTEM_LINE: &str = "SYSTEM You are a helpful AI assistant named Llama3 Droid";

/// Base Modelfile compiled into the crate.
pub const BUILTIN_MODELFILE: &str = include_str!("../data/Modelfile.base");

/// Nickname to persona prompt prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonaBook {
    personas: BTreeMap<String, String>,
}

impl PersonaBook {
    /// Build a book from `(nickname, prompt)` pairs.
    pub fn new(personas: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            personas: personas.into_iter().collect(),
        }
    }

    /// Parse the JSON form `{"Nickname": "prompt", ...}`.
    pub fn from_json(json: &str) -> Result<Self, DialogueError> {
        Ok(Self {
            personas: serde_json::from_str(json)?,
        })
    }

    /// The personas compiled into the crate.
    pub fn builtin() -> Result<Self, DialogueError> {
        Self::from_json(BUILTIN_PERSONAS)
    }

    /// Load personas from `path`.
    pub fn load(path: &Path) -> Result<Self, DialogueError> {
        let json = std::fs::read_to_string(path).map_err(|e| DialogueError::io(path, e))?;
        let book = Self::from_json(&json)?;
        info!(path = %path.display(), personas = book.len(), "loaded persona table");
        Ok(book)
    }

    /// Prompt prefix for `nickname`.
    pub fn get(&self, nickname: &str) -> Option<&str> {
        self.personas.get(nickname).map(String::as_str)
    }

    /// Whether `nickname` has a persona.
    pub fn contains(&self, nickname: &str) -> bool {
        self.personas.contains_key(nickname)
    }

    /// Every nickname with a persona, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.personas.keys().map(String::as_str)
    }

    /// Number of personas.
    pub fn len(&self) -> usize {
        self.personas.len()
    }

    /// Whether the book is empty.
    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }

    /// Write one Modelfile per persona into `dir`, named after the model.
    ///
    /// Each file is `base` with its [`BASE_SYSTEM_LINE`] replaced by the
    /// persona. Existing files are left untouched. Returns the files
    /// written.
    pub fn write_modelfiles(&self, dir: &Path, base: &str) -> Result<Vec<PathBuf>, DialogueError> {
        std::fs::create_dir_all(dir).map_err(|e| DialogueError::io(dir, e))?;

        let mut written = Vec::new();
        for (nickname, persona) in &self.personas {
            let path = dir.join(model_name(nickname));
            if path.exists() {
                info!(path = %path.display(), "modelfile exists, skipping");
                continue;
            }
            let contents = base.replace(BASE_SYSTEM_LINE, &format!("SYSTEM {persona}"));
            std::fs::write(&path, contents).map_err(|e| DialogueError::io(&path, e))?;
            info!(path = %path.display(), "modelfile created");
            written.push(path);
        }
        Ok(written)
    }
}

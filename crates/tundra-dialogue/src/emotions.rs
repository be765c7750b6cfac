//! Keyword to emoticon table used to punctuate a bot's reply.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::error::DialogueError;

const BUILTIN_EMOTIONS: &str = include_str!("../data/emotions.json");

/// One row of the emotion table file.
#[derive(Debug, Clone, Deserialize)]
struct EmotionEntry {
    keywords: Vec<String>,
    emoticon_id: u32,
}

/// An emotion detected in a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emotion {
    /// Emotion name from the table.
    pub name: String,
    /// Emoticon shown for it.
    pub emoticon: u32,
    /// The word that triggered it.
    pub keyword: String,
}

/// Maps lowercase keywords to the emotion they express.
#[derive(Debug, Clone, Default)]
pub struct EmotionTable {
    keywords: HashMap<String, (String, u32)>,
}

impl EmotionTable {
    /// Parse the JSON form `{"emotion": {"keywords": [...], "emoticon_id": n}}`.
    pub fn from_json(json: &str) -> Result<Self, DialogueError> {
        let entries: BTreeMap<String, EmotionEntry> = serde_json::from_str(json)?;
        let mut keywords = HashMap::new();
        for (name, entry) in entries {
            for keyword in entry.keywords {
                keywords.insert(keyword.to_lowercase(), (name.clone(), entry.emoticon_id));
            }
        }
        Ok(Self { keywords })
    }

    /// The table compiled into the crate.
    pub fn builtin() -> Result<Self, DialogueError> {
        Self::from_json(BUILTIN_EMOTIONS)
    }

    /// Load the table from `path`.
    pub fn load(path: &Path) -> Result<Self, DialogueError> {
        let json = std::fs::read_to_string(path).map_err(|e| DialogueError::io(path, e))?;
        let table = Self::from_json(&json)?;
        info!(path = %path.display(), keywords = table.len(), "loaded emotion table");
        Ok(table)
    }

    /// Number of keywords.
    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    /// Whether the table has no keywords.
    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    /// The emotion of the first keyword in `text`, reading left to right.
    pub fn detect(&self, text: &str) -> Option<Emotion> {
        text.to_lowercase()
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
            .find_map(|word| {
                self.keywords.get(word).map(|(name, emoticon)| Emotion {
                    name: name.clone(),
                    emoticon: *emoticon,
                    keyword: word.to_owned(),
                })
            })
    }
}

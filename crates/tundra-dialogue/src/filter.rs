//! Flagged-language detection for incoming chat.
//!
//! A message is checked three ways, stopping at the first hit:
//!
//! 1. each word against the flagged term list;
//! 2. each word again after undoing common character substitutions
//!    (`3` for `e`, `$` for `s`, `ph` for `f`, ...);
//! 3. every term as a substring of the de-obfuscated message.
//!
//! Terms are compared both as written and in their de-obfuscated form, so
//! a term and its disguised spelling land on the same key.

use std::collections::BTreeSet;
use std::path::Path;

use tracing::{info, warn};

use crate::error::DialogueError;

/// Character substitutions, undone in this order.
const SUBSTITUTIONS: [(&str, &[&str]); 14] = [
    ("a", &["@", "4", "/\\"]),
    ("e", &["3"]),
    ("i", &["ia", "1", "!", "|"]),
    ("o", &["0", "a"]),
    ("oo", &["ew"]),
    ("s", &["$", "5", "z"]),
    ("l", &["1", "|"]),
    ("t", &["7"]),
    ("g", &["9"]),
    ("b", &["8"]),
    ("c", &["k"]),
    ("u", &["*", "aw"]),
    ("f", &["ph"]),
    ("gg", &["wg"]),
];

/// Words whose letters happen to match a substitution and are left alone.
const ALLOWED: [&str; 1] = ["can"];

const BUILTIN_TERMS: &str = include_str!("../data/flagged_terms.txt");

/// Undo the substitution table on a single lowercase word.
pub fn deobfuscate_word(word: &str) -> String {
    if ALLOWED.contains(&word) {
        return word.to_owned();
    }
    let mut word = word.to_owned();
    for (letter, disguises) in SUBSTITUTIONS {
        for disguise in disguises {
            if word.contains(disguise) {
                word = word.replace(disguise, letter);
            }
        }
    }
    word
}

/// De-obfuscate every whitespace-separated word of `text`.
pub fn deobfuscate(text: &str) -> String {
    let words: Vec<String> = text
        .to_lowercase()
        .split_whitespace()
        .map(deobfuscate_word)
        .collect();
    words.join(" ")
}

/// Flagged term list with its de-obfuscated twin.
#[derive(Debug, Clone, Default)]
pub struct ContentFilter {
    terms: BTreeSet<String>,
}

impl ContentFilter {
    /// A filter over `terms`, compared case-insensitively.
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = BTreeSet::new();
        for term in terms {
            let term = term.as_ref().trim().to_lowercase();
            if term.is_empty() {
                continue;
            }
            set.insert(deobfuscate_word(&term));
            set.insert(term);
        }
        Self { terms: set }
    }

    /// Parse a term list: one term per line, `#` starts a comment line.
    pub fn from_list(list: &str) -> Self {
        Self::new(
            list.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#')),
        )
    }

    /// The term list compiled into the crate.
    pub fn builtin() -> Self {
        Self::from_list(BUILTIN_TERMS)
    }

    /// Load a term list from `path`.
    pub fn load(path: &Path) -> Result<Self, DialogueError> {
        let list = std::fs::read_to_string(path).map_err(|e| DialogueError::io(path, e))?;
        let filter = Self::from_list(&list);
        info!(path = %path.display(), terms = filter.len(), "loaded flagged term list");
        Ok(filter)
    }

    /// Number of distinct keys, disguised spellings included.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Whether the filter has no terms at all.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Whether `text` contains flagged language.
    pub fn contains_flagged(&self, text: &str) -> bool {
        if let Some(word) = words(&text.to_lowercase()).find(|w| self.terms.contains(*w)) {
            warn!(word, "flagged word in message");
            return true;
        }

        let plain = deobfuscate(text);
        if let Some(word) = words(&plain).find(|w| self.terms.contains(*w)) {
            warn!(word, deobfuscated = %plain, "flagged word after de-obfuscation");
            return true;
        }

        if let Some(term) = self.terms.iter().find(|term| plain.contains(term.as_str())) {
            warn!(term = %term, deobfuscated = %plain, "flagged term inside message");
            return true;
        }
        false
    }
}

/// Whitespace-separated words with surrounding punctuation stripped.
fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| !w.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deobfuscation_follows_table_order() {
        assert_eq!(deobfuscate("h3llo wor1d"), "hello worid");
        assert_eq!(deobfuscate_word("$h!7"), "shit");
        assert_eq!(deobfuscate_word("phun"), "fun");
        assert_eq!(deobfuscate_word("can"), "can");
        assert_eq!(deobfuscate_word("cat"), "cot");
    }

    #[test]
    fn leetspeak_matches_plain_term() {
        let filter = ContentFilter::new(["hello"]);
        assert!(filter.contains_flagged("h3llo wor1d"));
        assert!(!filter.contains_flagged("goodbye world"));
    }

    #[test]
    fn allow_listed_word_is_not_rewritten() {
        let filter = ContentFilter::new(["con"]);
        assert!(!filter.contains_flagged("can you help"));
        assert!(!ContentFilter::builtin().contains_flagged("can you help"));
    }

    #[test]
    fn builtin_catches_disguises() {
        let filter = ContentFilter::builtin();
        assert!(!filter.is_empty());
        assert!(filter.contains_flagged("you are a B1TCH"));
        assert!(filter.contains_flagged("oh sh!t"));
        assert!(filter.contains_flagged("f*ck this"));
        assert!(filter.contains_flagged("what the fuuuckshit"));
    }

    #[test]
    fn ordinary_chat_passes() {
        let filter = ContentFilter::builtin();
        for message in [
            "Want to go to the class party?",
            "I am passing the glasses to my assistant",
            "Hey Cadence, what is your favourite song?",
            "Let's scrap the plan and grab pizza",
        ] {
            assert!(!filter.contains_flagged(message), "{message}");
        }
    }

    #[test]
    fn list_comments_and_blanks_are_skipped() {
        let filter = ContentFilter::from_list("# comment\n\nblizzard\n");
        assert!(filter.contains_flagged("a BLIZZARD is coming"));
        assert_eq!(filter.len(), 2);
    }
}

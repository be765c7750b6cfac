//! Error types for the `tundra-dialogue` crate.
//!
//! Backend failures are ordinary values here. The orchestrator turns them
//! into empty replies and keeps the conversation going.

/// Errors raised while loading dialogue data or talking to a backend.
#[derive(Debug, thiserror::Error)]
pub enum DialogueError {
    /// A text generation backend returned an error or was unreachable.
    #[error("LLM backend error: {0}")]
    LlmBackend(String),

    /// The backend did not answer within the generation timeout.
    #[error("generation timed out after {timeout_ms} ms")]
    Timeout {
        /// The timeout that elapsed.
        timeout_ms: u64,
    },

    /// Failed to render the prompt template.
    #[error("template render error: {0}")]
    Template(String),

    /// A data table or Modelfile could not be read or written.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File involved.
        path: String,
        /// Underlying failure.
        source: std::io::Error,
    },

    /// Serialization or deserialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl DialogueError {
    pub(crate) fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}

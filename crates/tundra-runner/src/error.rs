//! Error types for the runner binary.
//!
//! Dialogue setup errors are wrapped with `#[from]` so `?` works across the
//! whole startup path. Behavior errors never reach here: a bot that cannot
//! be placed is logged and skipped.

/// Errors that can occur while starting or running the bot runtime.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// Failed to connect to or communicate with the NATS server.
    #[error("NATS error: {0}")]
    Nats(String),

    /// Configuration is invalid or missing.
    #[error("config error: {0}")]
    Config(String),

    /// A configuration or data file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// The file involved.
        path: String,
        /// Underlying I/O failure.
        source: std::io::Error,
    },

    /// A wire payload could not be encoded or decoded.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),

    /// The YAML configuration file is malformed.
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yml::Error),

    /// Dialogue setup failure.
    #[error(transparent)]
    Dialogue(#[from] tundra_dialogue::DialogueError),
}

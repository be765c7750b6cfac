//! Text generation backends.
//!
//! Enum dispatch instead of trait objects, because async methods are not
//! dyn-compatible. Ollama's native API and OpenAI-compatible chat APIs are
//! reached over HTTP via `reqwest`; [`ScriptedBackend`] answers from a
//! queue and backs rehearsals and tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;

use crate::config::GenerationParams;
use crate::error::DialogueError;

/// One prompt to complete.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    /// Model to address.
    pub model: String,
    /// Full prompt text.
    pub prompt: String,
    /// Sampling parameters.
    pub params: GenerationParams,
}

/// Which HTTP API a backend speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// Ollama `/api/generate`.
    Ollama,
    /// OpenAI-compatible `/chat/completions`.
    OpenAi,
}

impl std::str::FromStr for BackendType {
    type Err = DialogueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" | "openai-compatible" => Ok(Self::OpenAi),
            other => Err(DialogueError::LlmBackend(format!("unknown backend type: {other}"))),
        }
    }
}

/// Connection settings for an HTTP backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmBackendConfig {
    /// API flavour.
    pub backend_type: BackendType,
    /// Base URL, without the endpoint path.
    pub api_url: String,
    /// Bearer token, if the API wants one.
    pub api_key: Option<String>,
}

// ---------------------------------------------------------------------------
// Unified backend enum
// ---------------------------------------------------------------------------

/// A text generation backend.
pub enum LlmBackend {
    /// Ollama native API.
    Ollama(OllamaBackend),
    /// OpenAI-compatible chat completions API.
    OpenAi(OpenAiBackend),
    /// Queued replies, no network.
    Scripted(Arc<ScriptedBackend>),
}

impl LlmBackend {
    /// Complete `request` and return the generated text.
    ///
    /// # Errors
    ///
    /// Returns [`DialogueError::LlmBackend`] if the call fails or the reply
    /// carries no text.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<String, DialogueError> {
        match self {
            Self::Ollama(backend) => backend.generate(request).await,
            Self::OpenAi(backend) => backend.generate(request).await,
            Self::Scripted(backend) => backend.generate(request).await,
        }
    }

    /// Human-readable name for logging.
    pub const fn name(&self) -> &str {
        match self {
            Self::Ollama(_) => "ollama",
            Self::OpenAi(_) => "openai-compatible",
            Self::Scripted(_) => "scripted",
        }
    }
}

impl std::fmt::Debug for LlmBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("LlmBackend").field(&self.name()).finish()
    }
}

// ---------------------------------------------------------------------------
// Ollama backend
// ---------------------------------------------------------------------------

/// Backend for Ollama's `/api/generate` endpoint.
pub struct OllamaBackend {
    client: reqwest::Client,
    api_url: String,
}

impl OllamaBackend {
    /// Create an Ollama backend rooted at `config.api_url`.
    pub fn new(config: &LlmBackendConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_owned(),
        }
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, DialogueError> {
        let url = format!("{}/api/generate", self.api_url);
        let params = &request.params;

        let body = serde_json::json!({
            "model": request.model,
            "prompt": request.prompt,
            "stream": false,
            "options": {
                "temperature": params.temperature,
                "top_p": params.top_p,
                "top_k": params.top_k,
                "num_predict": params.max_tokens,
                "presence_penalty": params.presence_penalty,
                "frequency_penalty": params.frequency_penalty,
            }
        });

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| DialogueError::LlmBackend(format!("Ollama request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_owned());
            return Err(DialogueError::LlmBackend(format!(
                "Ollama returned {status}: {error_body}"
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| DialogueError::LlmBackend(format!("Ollama response read failed: {e}")))?;

        extract_ollama_text(&text)
    }
}

/// Collect the generated text from an Ollama reply.
///
/// Accepts both the single-object reply (`"stream": false`) and the
/// newline-delimited stream, concatenating `response` fields until an
/// object reports `done`.
fn extract_ollama_text(body: &str) -> Result<String, DialogueError> {
    let mut text = String::new();
    let mut objects = 0_usize;

    for line in body.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let json: serde_json::Value = serde_json::from_str(line)
            .map_err(|e| DialogueError::LlmBackend(format!("Ollama response parse failed: {e}")))?;
        if let Some(error) = json.get("error").and_then(serde_json::Value::as_str) {
            return Err(DialogueError::LlmBackend(format!("Ollama error: {error}")));
        }
        objects = objects.saturating_add(1);
        if let Some(piece) = json.get("response").and_then(serde_json::Value::as_str) {
            text.push_str(piece);
        }
        if json
            .get("done")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(true)
        {
            break;
        }
    }

    if objects == 0 {
        return Err(DialogueError::LlmBackend("Ollama returned an empty body".to_owned()));
    }
    Ok(text)
}

// ---------------------------------------------------------------------------
// OpenAI-compatible backend
// ---------------------------------------------------------------------------

/// Backend for OpenAI-compatible chat completions APIs.
///
/// Sends requests to `{api_url}/chat/completions`.
pub struct OpenAiBackend {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
}

impl OpenAiBackend {
    /// Create an `OpenAI`-compatible backend.
    pub fn new(config: &LlmBackendConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_owned(),
            api_key: config.api_key.clone(),
        }
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, DialogueError> {
        let url = format!("{}/chat/completions", self.api_url);
        let params = &request.params;

        let body = serde_json::json!({
            "model": request.model,
            "messages": [
                {"role": "user", "content": request.prompt}
            ],
            "temperature": params.temperature,
            "top_p": params.top_p,
            "max_tokens": params.max_tokens,
            "presence_penalty": params.presence_penalty,
            "frequency_penalty": params.frequency_penalty,
        });

        let mut builder = self
            .client
            .post(&url)
            .header("Content-Type", "application/json");
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {key}"));
        }

        let response = builder
            .json(&body)
            .send()
            .await
            .map_err(|e| DialogueError::LlmBackend(format!("OpenAI request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_owned());
            return Err(DialogueError::LlmBackend(format!(
                "OpenAI returned {status}: {error_body}"
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| DialogueError::LlmBackend(format!("OpenAI response parse failed: {e}")))?;

        extract_openai_content(&json)
    }
}

/// Extract the text content from an `OpenAI` chat completions response.
fn extract_openai_content(json: &serde_json::Value) -> Result<String, DialogueError> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| {
            DialogueError::LlmBackend(
                "OpenAI response missing choices[0].message.content".to_owned(),
            )
        })
}

// ---------------------------------------------------------------------------
// Scripted backend
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Script {
    replies: VecDeque<Result<String, String>>,
    requests: Vec<GenerationRequest>,
}

/// Answers from a queue of prepared replies.
///
/// Every request is recorded. An empty queue answers with an error, like
/// an unreachable server would.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    script: Mutex<Script>,
    latency: Duration,
}

impl ScriptedBackend {
    /// A backend that answers immediately.
    pub fn new(replies: impl IntoIterator<Item = String>) -> Self {
        Self::with_latency(replies, Duration::ZERO)
    }

    /// A backend that takes `latency` to answer.
    pub fn with_latency(replies: impl IntoIterator<Item = String>, latency: Duration) -> Self {
        Self {
            script: Mutex::new(Script {
                replies: replies.into_iter().map(Ok).collect(),
                requests: Vec::new(),
            }),
            latency,
        }
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a reply.
    pub fn push_reply(&self, reply: impl Into<String>) {
        self.script().replies.push_back(Ok(reply.into()));
    }

    /// Queue a failure.
    pub fn push_failure(&self, message: impl Into<String>) {
        self.script().replies.push_back(Err(message.into()));
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.script().requests.clone()
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, DialogueError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let reply = {
            let mut script = self.script();
            script.requests.push(request.clone());
            script.replies.pop_front()
        };
        match reply {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(DialogueError::LlmBackend(message)),
            None => Err(DialogueError::LlmBackend("no scripted reply left".to_owned())),
        }
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Create an HTTP backend from configuration.
pub fn create_backend(config: &LlmBackendConfig) -> LlmBackend {
    match config.backend_type {
        BackendType::Ollama => LlmBackend::Ollama(OllamaBackend::new(config)),
        BackendType::OpenAi => LlmBackend::OpenAi(OpenAiBackend::new(config)),
    }
}

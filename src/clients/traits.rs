use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single chat-completion request.
///
/// `label` names the role of the call (e.g. `"intent_classification"`) and is
/// used for logs and telemetry; it is never sent to the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub label: String,
    pub system: String,
    pub user: String,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Ask the provider for a JSON object reply when it supports it
    #[serde(default)]
    pub json_mode: bool,
}

impl CompletionRequest {
    pub fn new(
        label: impl Into<String>,
        system: impl Into<String>,
        user: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            system: system.into(),
            user: user.into(),
            temperature: None,
            max_tokens: None,
            json_mode: false,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn json(mut self) -> Self {
        self.json_mode = true;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
    pub model: String,
    /// True when an earlier provider in a chain failed before this one answered
    #[serde(default)]
    pub fallback_used: bool,
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("model call timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("http error: {0}")]
    Http(String),
    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("provider returned an empty completion")]
    EmptyResponse,
    #[error("parse error: {0}")]
    Parse(String),
    #[error("api key not configured for {provider}")]
    MissingApiKey { provider: String },
    #[error("no model provider available")]
    NoProvider,
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Identifier of the model behind this client, for logs and provenance
    fn model_name(&self) -> &str;

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError>;
}

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::debug;

use crate::clients::traits::{Completion, CompletionRequest, LanguageModel, LlmError};
use crate::config::LlmConfig;

const DEFAULT_MAX_TOKENS: u32 = 1500;

/// Client for any OpenAI-compatible `/chat/completions` endpoint
#[derive(Clone, Debug)]
pub struct OpenAiChatClient {
    endpoint: String,
    model: String,
    api_key: Option<String>,
    max_tokens: u32,
    timeout_ms: u64,
    client: Client,
}

impl OpenAiChatClient {
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout_ms: u64,
    ) -> Result<Self, LlmError> {
        // Accept either a bare base URL or the full completions path
        let endpoint = if base_url.ends_with("/chat/completions") {
            base_url.to_string()
        } else {
            format!("{}/chat/completions", base_url.trim_end_matches('/'))
        };

        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| LlmError::Http(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            endpoint,
            model: model.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout_ms,
            client,
        })
    }

    /// One client per configured model: the primary first, then the fallbacks
    pub fn from_config(cfg: &LlmConfig, api_key: Option<String>) -> Result<Vec<Self>, LlmError> {
        std::iter::once(&cfg.model)
            .chain(cfg.fallback_models.iter())
            .map(|model| {
                Self::new(&cfg.base_url, model.clone(), api_key.clone(), cfg.timeout_ms)
                    .map(|c| c.with_max_tokens(cfg.max_tokens))
            })
            .collect()
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn body(&self, request: &CompletionRequest) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": request.system},
                {"role": "user", "content": request.user}
            ],
            "max_tokens": request.max_tokens.unwrap_or(self.max_tokens),
        });
        if let Some(t) = request.temperature {
            body["temperature"] = json!(t);
        }
        if request.json_mode {
            body["response_format"] = json!({"type": "json_object"});
        }
        body
    }
}

#[async_trait]
impl LanguageModel for OpenAiChatClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| LlmError::MissingApiKey {
            provider: self.endpoint.clone(),
        })?;

        debug!(
            "chat completion (label={}, model={}, chars={})",
            request.label,
            self.model,
            request.user.len()
        );

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&self.body(request))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout {
                        timeout_ms: self.timeout_ms,
                    }
                } else {
                    LlmError::Http(e.to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let val: Value = resp
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;
        let text = extract_content(&val)?;

        Ok(Completion {
            text,
            model: self.model.clone(),
            fallback_used: false,
        })
    }
}

fn extract_content(val: &Value) -> Result<String, LlmError> {
    let content = val
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|choice| choice.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .ok_or_else(|| LlmError::Parse("missing choices[0].message.content".into()))?
        .trim()
        .to_string();
    if content.is_empty() {
        return Err(LlmError::EmptyResponse);
    }
    Ok(content)
}

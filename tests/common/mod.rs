//! Test doubles for the assistant's collaborators
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sdk_assistant::clients::{Completion, CompletionRequest, LanguageModel, LlmError};
use sdk_assistant::config::Config;
use sdk_assistant::error::{AssistantError, Result};
use sdk_assistant::orchestrator::Orchestrator;
use sdk_assistant::retrieval::{DocumentSearch, Passage};
use sdk_assistant::telemetry::Telemetry;
use sdk_assistant::web_search::{WebResult, WebSearch};
use serde_json::Value;

pub const CLASSIFY: &str = "intent_classification";
pub const DOCS: &str = "documentation_answer";
pub const FRAMEWORK: &str = "framework_answer";
pub const CODE: &str = "code_generation";
pub const SYNTHESIS: &str = "response_synthesis";

/// Language model whose replies are scripted per request label.
/// Unscripted labels answer `"<label> answer"`.
#[derive(Default)]
pub struct ScriptedModel {
    replies: HashMap<String, std::result::Result<String, String>>,
    delays: HashMap<String, Duration>,
    calls: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, label: &str, text: impl Into<String>) -> Self {
        self.replies.insert(label.to_string(), Ok(text.into()));
        self
    }

    pub fn fail(mut self, label: &str, message: impl Into<String>) -> Self {
        self.replies.insert(label.to_string(), Err(message.into()));
        self
    }

    pub fn delay(mut self, label: &str, delay: Duration) -> Self {
        self.delays.insert(label.to_string(), delay);
        self
    }

    pub fn classify_as(
        self,
        docs: bool,
        framework: bool,
        code: bool,
        name: Option<&str>,
    ) -> Self {
        self.reply(CLASSIFY, intent_json(docs, framework, code, name))
    }

    pub fn calls_for(&self, label: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.label == label)
            .count()
    }

    pub fn requests_for(&self, label: &str) -> Vec<CompletionRequest> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.label == label)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> std::result::Result<Completion, LlmError> {
        self.calls.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delays.get(&request.label) {
            tokio::time::sleep(*delay).await;
        }
        match self.replies.get(&request.label) {
            Some(Ok(text)) => Ok(Completion {
                text: text.clone(),
                model: "scripted".into(),
                fallback_used: false,
            }),
            Some(Err(message)) => Err(LlmError::Http(message.clone())),
            None => Ok(Completion {
                text: format!("{} answer", request.label),
                model: "scripted".into(),
                fallback_used: false,
            }),
        }
    }
}

pub fn intent_json(docs: bool, framework: bool, code: bool, name: Option<&str>) -> String {
    serde_json::json!({
        "needs_documentation": docs,
        "needs_framework": framework,
        "needs_code": code,
        "framework_name": name,
    })
    .to_string()
}

/// Document search returning a fixed passage list
pub struct StaticSearch {
    pub passages: Vec<Passage>,
    pub indexed: bool,
    pub fail: bool,
    pub delay: Option<Duration>,
}

impl StaticSearch {
    pub fn with(passages: Vec<Passage>) -> Self {
        Self {
            passages,
            indexed: true,
            fail: false,
            delay: None,
        }
    }

    pub fn empty() -> Self {
        Self::with(vec![])
    }
}

#[async_trait]
impl DocumentSearch for StaticSearch {
    async fn search(&self, _query: &str, top_k: usize) -> Result<Vec<Passage>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(AssistantError::Retrieval {
                message: "vector store unavailable".into(),
            });
        }
        Ok(self.passages.iter().take(top_k).cloned().collect())
    }

    async fn is_indexed(&self) -> bool {
        self.indexed
    }
}

pub fn passage(text: &str, page: u32) -> Passage {
    Passage {
        text: text.to_string(),
        page: Some(page),
        source: "sdk_docs.pdf".to_string(),
        score: Some(0.8),
    }
}

/// Web search returning fixed results and recording the frameworks asked for
#[derive(Default)]
pub struct StaticWeb {
    pub results: Vec<WebResult>,
    pub fail: bool,
    pub delay: Option<Duration>,
    pub frameworks: Mutex<Vec<String>>,
}

impl StaticWeb {
    pub fn with(results: Vec<WebResult>) -> Self {
        Self {
            results,
            ..Self::default()
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn frameworks_searched(&self) -> Vec<String> {
        self.frameworks.lock().unwrap().clone()
    }
}

#[async_trait]
impl WebSearch for StaticWeb {
    async fn search_framework(
        &self,
        framework: &str,
        _query: &str,
        max_results: usize,
    ) -> Result<Vec<WebResult>> {
        self.frameworks.lock().unwrap().push(framework.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(AssistantError::Http {
                message: "search backend down".into(),
            });
        }
        Ok(self.results.iter().take(max_results).cloned().collect())
    }
}

pub fn web_result(title: &str, url: &str) -> WebResult {
    WebResult {
        title: title.to_string(),
        url: url.to_string(),
        content: format!("{} content", title),
        score: 0.9,
    }
}

/// Telemetry sink that keeps everything it is given
#[derive(Default)]
pub struct RecordingTelemetry {
    pub events: Mutex<Vec<(String, Value)>>,
    pub metrics: Mutex<Vec<(String, f64, String)>>,
}

impl RecordingTelemetry {
    pub fn metric_names(&self) -> Vec<String> {
        self.metrics
            .lock()
            .unwrap()
            .iter()
            .map(|(n, _, _)| n.clone())
            .collect()
    }

    pub fn has_metric(&self, name: &str) -> bool {
        self.metric_names().iter().any(|n| n == name)
    }

    /// Attributes of the last `span.end` recorded for `span`
    pub fn span_end(&self, span: &str) -> Option<Value> {
        self.events_named("span.end")
            .into_iter()
            .filter(|a| a["span"] == span)
            .next_back()
    }

    pub fn events_named(&self, name: &str) -> Vec<Value> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
            .collect()
    }
}

impl Telemetry for RecordingTelemetry {
    fn record_event(&self, name: &str, attributes: Value) {
        self.events
            .lock()
            .unwrap()
            .push((name.to_string(), attributes));
    }

    fn record_metric(&self, name: &str, value: f64, unit: &str) {
        self.metrics
            .lock()
            .unwrap()
            .push((name.to_string(), value, unit.to_string()));
    }
}

pub struct Harness {
    pub model: Arc<ScriptedModel>,
    pub search: Arc<StaticSearch>,
    pub web: Arc<StaticWeb>,
    pub telemetry: Arc<RecordingTelemetry>,
    pub orchestrator: Orchestrator,
}

pub fn harness(model: ScriptedModel, search: StaticSearch, web: StaticWeb) -> Harness {
    harness_with_config(&Config::default(), model, search, web)
}

pub fn harness_with_config(
    config: &Config,
    model: ScriptedModel,
    search: StaticSearch,
    web: StaticWeb,
) -> Harness {
    let model = Arc::new(model);
    let search = Arc::new(search);
    let web = Arc::new(web);
    let telemetry = Arc::new(RecordingTelemetry::default());
    let orchestrator = Orchestrator::from_parts(
        config,
        model.clone(),
        search.clone(),
        web.clone(),
        telemetry.clone(),
    );
    Harness {
        model,
        search,
        web,
        telemetry,
        orchestrator,
    }
}

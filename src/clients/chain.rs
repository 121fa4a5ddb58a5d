use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, warn};

use crate::clients::traits::{Completion, CompletionRequest, LanguageModel, LlmError};
use crate::telemetry::{NoopTelemetry, Telemetry};

/// Ordered list of models; each request goes to the first one that answers.
/// Every answer is reported as an `llm.completion` event naming the model
/// that produced it and whether an earlier provider had failed.
pub struct ModelChain {
    name: String,
    providers: Vec<Arc<dyn LanguageModel>>,
    telemetry: Arc<dyn Telemetry>,
}

impl ModelChain {
    pub fn new(providers: Vec<Arc<dyn LanguageModel>>) -> Self {
        let name = providers
            .iter()
            .map(|p| p.model_name())
            .collect::<Vec<_>>()
            .join(" -> ");
        Self {
            name,
            providers,
            telemetry: Arc::new(NoopTelemetry),
        }
    }

    pub fn with_telemetry(mut self, telemetry: Arc<dyn Telemetry>) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[async_trait]
impl LanguageModel for ModelChain {
    fn model_name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        let mut last_err: Option<LlmError> = None;
        for provider in &self.providers {
            match provider.complete(request).await {
                Ok(mut completion) => {
                    completion.fallback_used = completion.fallback_used || last_err.is_some();
                    debug!(
                        "{} answered {} (fallback: {})",
                        completion.model, request.label, completion.fallback_used
                    );
                    self.telemetry.record_event(
                        "llm.completion",
                        json!({
                            "label": request.label,
                            "model": completion.model,
                            "fallback_used": completion.fallback_used,
                        }),
                    );
                    if completion.fallback_used {
                        self.telemetry.record_metric("llm.fallbacks", 1.0, "call");
                    }
                    return Ok(completion);
                }
                Err(e) => {
                    warn!(
                        "model {} failed for {}: {}",
                        provider.model_name(),
                        request.label,
                        e
                    );
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or(LlmError::NoProvider))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<(String, Value)>>,
        metrics: Mutex<Vec<String>>,
    }

    impl Telemetry for Recorder {
        fn record_event(&self, name: &str, attributes: Value) {
            self.events
                .lock()
                .unwrap()
                .push((name.to_string(), attributes));
        }

        fn record_metric(&self, name: &str, _value: f64, _unit: &str) {
            self.metrics.lock().unwrap().push(name.to_string());
        }
    }

    struct Fixed(&'static str, bool);

    #[async_trait]
    impl LanguageModel for Fixed {
        fn model_name(&self) -> &str {
            self.0
        }

        async fn complete(&self, _request: &CompletionRequest) -> Result<Completion, LlmError> {
            if self.1 {
                Ok(Completion {
                    text: format!("from {}", self.0),
                    model: self.0.to_string(),
                    fallback_used: false,
                })
            } else {
                Err(LlmError::Http("down".into()))
            }
        }
    }

    #[tokio::test]
    async fn test_first_healthy_provider_answers() {
        let chain = ModelChain::new(vec![
            Arc::new(Fixed("primary", false)),
            Arc::new(Fixed("backup", true)),
        ]);
        let out = chain
            .complete(&CompletionRequest::new("t", "s", "u"))
            .await
            .unwrap();
        assert_eq!(out.model, "backup");
        assert!(out.fallback_used);
        assert_eq!(chain.model_name(), "primary -> backup");
    }

    #[tokio::test]
    async fn test_fallback_is_reported_to_telemetry() {
        let rec = Arc::new(Recorder::default());
        let chain = ModelChain::new(vec![
            Arc::new(Fixed("primary", false)),
            Arc::new(Fixed("backup", true)),
        ])
        .with_telemetry(rec.clone());
        chain
            .complete(&CompletionRequest::new("code_generation", "s", "u"))
            .await
            .unwrap();

        let events = rec.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, "llm.completion");
        assert_eq!(events[0].1["label"], "code_generation");
        assert_eq!(events[0].1["model"], "backup");
        assert_eq!(events[0].1["fallback_used"], true);
        assert_eq!(*rec.metrics.lock().unwrap(), vec!["llm.fallbacks".to_string()]);
    }

    #[tokio::test]
    async fn test_primary_answer_is_not_a_fallback() {
        let rec = Arc::new(Recorder::default());
        let chain = ModelChain::new(vec![
            Arc::new(Fixed("primary", true)),
            Arc::new(Fixed("backup", true)),
        ])
        .with_telemetry(rec.clone());
        chain
            .complete(&CompletionRequest::new("t", "s", "u"))
            .await
            .unwrap();

        let events = rec.events.lock().unwrap();
        assert_eq!(events[0].1["model"], "primary");
        assert_eq!(events[0].1["fallback_used"], false);
        assert!(rec.metrics.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_chain_reports_no_provider() {
        let chain = ModelChain::new(vec![]);
        let err = chain
            .complete(&CompletionRequest::new("t", "s", "u"))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::NoProvider));
    }

    #[tokio::test]
    async fn test_last_error_is_returned_when_all_fail() {
        let chain = ModelChain::new(vec![
            Arc::new(Fixed("a", false)),
            Arc::new(Fixed("b", false)),
        ]);
        let err = chain
            .complete(&CompletionRequest::new("t", "s", "u"))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Http(_)));
    }
}

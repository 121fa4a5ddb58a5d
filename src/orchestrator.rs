//! Top-level query flow: classify, dispatch, synthesize.
//!
//! The [`Orchestrator`] holds only its injected components; every piece of
//! per-query state lives inside [`Orchestrator::handle`]. It never returns an
//! error: each failure becomes a `success = false` [`FinalResponse`].

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::clients::{LanguageModel, ModelChain, OpenAiChatClient};
use crate::config::Config;
use crate::intent::{Classification, Framework, Intent, IntentClassifier};
use crate::prompts;
use crate::retrieval::{DocumentSearch, LocalCorpus};
use crate::router::{Deadline, Dispatcher};
use crate::specialists::{CodeGenerator, DocumentationSpecialist, FrameworkSpecialist};
use crate::synthesis::{FinalResponse, Synthesizer};
use crate::telemetry::{Feedback, Telemetry, TelemetrySpan, TracingTelemetry};
use crate::web_search::{DisabledWebSearch, TavilyClient, WebSearch};

/// An incoming question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub text: String,
    /// Explicit framework chosen by the caller; overrides the classifier's pick
    #[serde(default)]
    pub framework_hint: Option<String>,
    /// Opaque caller-supplied id, used only for correlation
    pub conversation_id: String,
}

impl Query {
    pub fn new(text: impl Into<String>, conversation_id: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            framework_hint: None,
            conversation_id: conversation_id.into(),
        }
    }

    pub fn with_framework_hint(mut self, hint: impl Into<String>) -> Self {
        self.framework_hint = Some(hint.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    Received,
    Classified,
    Dispatched,
    Synthesized,
    Returned,
}

impl fmt::Display for QueryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QueryState::Received => "received",
            QueryState::Classified => "classified",
            QueryState::Dispatched => "dispatched",
            QueryState::Synthesized => "synthesized",
            QueryState::Returned => "returned",
        };
        f.write_str(s)
    }
}

pub struct Orchestrator {
    classifier: IntentClassifier,
    dispatcher: Dispatcher,
    synthesizer: Synthesizer,
    telemetry: Arc<dyn Telemetry>,
    query_timeout_ms: Option<u64>,
}

impl Orchestrator {
    pub fn new(
        classifier: IntentClassifier,
        dispatcher: Dispatcher,
        synthesizer: Synthesizer,
        telemetry: Arc<dyn Telemetry>,
    ) -> Self {
        Self {
            classifier,
            dispatcher,
            synthesizer,
            telemetry,
            query_timeout_ms: None,
        }
    }

    /// Bound each query by a total time budget
    pub fn with_query_timeout_ms(mut self, timeout_ms: Option<u64>) -> Self {
        self.query_timeout_ms = timeout_ms.filter(|ms| *ms > 0);
        self
    }

    /// Wire every component from configuration around the given collaborators.
    /// One model serves every role; temperatures differ per role.
    pub fn from_parts(
        config: &Config,
        model: Arc<dyn LanguageModel>,
        search: Arc<dyn DocumentSearch>,
        web: Arc<dyn WebSearch>,
        telemetry: Arc<dyn Telemetry>,
    ) -> Self {
        let llm = &config.llm;
        let classifier = IntentClassifier::new(model.clone(), telemetry.clone())
            .with_temperature(llm.classifier_temperature);
        let docs = DocumentationSpecialist::new(search, model.clone(), telemetry.clone())
            .with_top_k(config.retrieval.top_k)
            .with_temperature(llm.documentation_temperature);
        let frameworks = FrameworkSpecialist::new(web, model.clone(), telemetry.clone())
            .with_max_results(config.web_search.max_results)
            .with_temperature(llm.framework_temperature);
        let code = CodeGenerator::new(model.clone(), telemetry.clone())
            .with_temperature(llm.code_temperature);
        let dispatcher = Dispatcher::new(docs, frameworks, code)
            .with_parallel(config.orchestrator.parallel_dispatch);
        let synthesizer = Synthesizer::new(model, telemetry.clone())
            .with_temperature(llm.synthesis_temperature);

        Self::new(classifier, dispatcher, synthesizer, telemetry)
            .with_query_timeout_ms(Some(config.orchestrator.query_timeout_ms))
    }

    /// Build the production stack: OpenAI-compatible model chain, local JSONL
    /// corpus, Tavily web search and tracing-backed telemetry
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let telemetry: Arc<dyn Telemetry> = Arc::new(TracingTelemetry);

        let providers: Vec<Arc<dyn LanguageModel>> =
            OpenAiChatClient::from_config(&config.llm, config.runtime.openai_api_key.clone())?
                .into_iter()
                .map(|c| Arc::new(c) as Arc<dyn LanguageModel>)
                .collect();
        let model: Arc<dyn LanguageModel> =
            Arc::new(ModelChain::new(providers).with_telemetry(telemetry.clone()));

        let corpus_path = &config.retrieval.corpus_path;
        let search: Arc<dyn DocumentSearch> = if corpus_path.exists() {
            Arc::new(LocalCorpus::load(corpus_path)?)
        } else {
            warn!(
                "Documentation corpus {} not found; documentation answers disabled",
                corpus_path.display()
            );
            Arc::new(LocalCorpus::default())
        };

        let web: Arc<dyn WebSearch> = match &config.runtime.tavily_api_key {
            Some(key) => Arc::new(TavilyClient::new(&config.web_search, key.clone())?),
            None => {
                warn!("TAVILY_API_KEY not set; framework answers disabled");
                Arc::new(DisabledWebSearch)
            }
        };

        Ok(Self::from_parts(config, model, search, web, telemetry))
    }

    pub fn supported_frameworks() -> &'static [Framework] {
        &Framework::ALL
    }

    /// Sole caller-facing entry point
    pub async fn handle_query(&self, text: &str, conversation_id: &str) -> FinalResponse {
        self.handle(Query::new(text, conversation_id)).await
    }

    pub async fn handle(&self, query: Query) -> FinalResponse {
        let mut span = TelemetrySpan::agent(self.telemetry.clone(), "orchestrator", "handle_query");
        let conversation_id = query.conversation_id.as_str();
        let mut state = QueryState::Received;

        let text = query.text.trim();
        if text.is_empty() {
            span.fail("empty query");
            return FinalResponse::failed(prompts::EMPTY_QUERY);
        }

        let deadline = self.query_timeout_ms.map(Deadline::after_ms);
        let hint = query.framework_hint.as_deref().map(|h| {
            Framework::parse(h).unwrap_or_else(|| {
                warn!("Unknown framework hint {:?}; using generic", h);
                Framework::Generic
            })
        });

        let classification = self.classify(text, hint, deadline).await;
        advance(&mut state, QueryState::Classified, conversation_id);
        if let Some(reason) = &classification.failure {
            info!(
                "[{}] classification degraded to clarification: {}",
                conversation_id, reason
            );
        }
        let intent: Intent = classification.intent;

        let results = self.dispatcher.dispatch(text, &intent, deadline).await;
        advance(&mut state, QueryState::Dispatched, conversation_id);

        let response = self.synthesizer.synthesize(text, results).await;
        advance(&mut state, QueryState::Synthesized, conversation_id);

        if !response.success {
            span.fail("no specialist succeeded");
        }
        self.telemetry.record_event(
            "query.completed",
            json!({
                "conversation_id": conversation_id,
                "success": response.success,
                "strategy": response.strategy,
                "sources": response.sources.len(),
                "classification_degraded": classification.failure.is_some(),
            }),
        );
        advance(&mut state, QueryState::Returned, conversation_id);
        response
    }

    async fn classify(
        &self,
        text: &str,
        hint: Option<Framework>,
        deadline: Option<Deadline>,
    ) -> Classification {
        let fut = self.classifier.classify_detailed(text, hint);
        let Some(deadline) = deadline else {
            return fut.await;
        };
        match tokio::time::timeout_at(deadline.at, fut).await {
            Ok(c) => c,
            Err(_) => {
                warn!("Intent classification exceeded {} ms", deadline.budget_ms);
                self.telemetry
                    .record_metric("intent_classifier.failures", 1.0, "error");
                Classification {
                    intent: Intent::none(),
                    failure: Some(format!("timed out after {} ms", deadline.budget_ms)),
                }
            }
        }
    }

    /// Record a user's verdict on an answer. Nothing is stored; the verdict
    /// goes to telemetry tagged with the conversation id.
    pub fn record_feedback(&self, conversation_id: &str, feedback: Feedback) {
        info!("[{}] feedback: {}", conversation_id, feedback.as_str());
        self.telemetry.record_event(
            "user.feedback",
            json!({"conversation_id": conversation_id, "feedback": feedback.as_str()}),
        );
        self.telemetry
            .record_metric("user.feedback", feedback.value(), "rating");
    }
}

fn advance(state: &mut QueryState, next: QueryState, conversation_id: &str) {
    debug!("[{}] {} -> {}", conversation_id, state, next);
    *state = next;
}

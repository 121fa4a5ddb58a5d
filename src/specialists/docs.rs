//! SDK documentation specialist: retrieval-augmented answers

use std::sync::Arc;

use tracing::{error, info};

use crate::clients::{CompletionRequest, LanguageModel};
use crate::error::AssistantError;
use crate::prompts;
use crate::retrieval::{DocumentSearch, Passage, build_context};
use crate::specialists::{SpecialistId, SpecialistResult, SpecialistRun, Source};
use crate::telemetry::{Telemetry, TelemetrySpan};

pub struct DocumentationSpecialist {
    search: Arc<dyn DocumentSearch>,
    model: Arc<dyn LanguageModel>,
    telemetry: Arc<dyn Telemetry>,
    top_k: usize,
    temperature: f32,
}

impl DocumentationSpecialist {
    pub fn new(
        search: Arc<dyn DocumentSearch>,
        model: Arc<dyn LanguageModel>,
        telemetry: Arc<dyn Telemetry>,
    ) -> Self {
        Self {
            search,
            model,
            telemetry,
            top_k: 5,
            temperature: 0.1,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub async fn query(&self, question: &str) -> SpecialistRun {
        let id = SpecialistId::Documentation;
        let agent = id.agent_name();
        let mut span =
            TelemetrySpan::agent(self.telemetry.clone(), &agent, "rag_query").cancellable();

        if !self.search.is_indexed().await {
            span.fail("index empty");
            return SpecialistRun::without_context(SpecialistResult::failure(
                id,
                prompts::DOCS_NOT_INDEXED,
            ));
        }

        let passages = {
            let mut tool = TelemetrySpan::tool(
                self.telemetry.clone(),
                "document_search",
                "similarity_search",
            );
            match self.search.search(question, self.top_k).await {
                Ok(p) => p,
                Err(e) => {
                    tool.fail_with(&e);
                    span.fail_with(&AssistantError::specialist(&agent, &e));
                    return self.error(format!("Error querying SDK documentation: {}", e));
                }
            }
        };

        if passages.is_empty() {
            info!("No documentation passages matched the question");
            span.fail("no passages");
            return SpecialistRun::without_context(SpecialistResult::failure(
                id,
                prompts::DOCS_NOT_FOUND,
            ));
        }

        let context = build_context(&passages);
        let request = CompletionRequest::new(
            "documentation_answer",
            prompts::DOCUMENTATION_SYSTEM,
            prompts::documentation_prompt(&context, question),
        )
        .with_temperature(self.temperature);

        let completion = {
            let mut tool =
                TelemetrySpan::tool(self.telemetry.clone(), "llm_generation", "generate_answer");
            match self.model.complete(&request).await {
                Ok(c) => c,
                Err(e) => {
                    let err = AssistantError::specialist(&agent, &e);
                    tool.fail_with(&err);
                    span.fail_with(&err);
                    let mut run = self.error(format!("Error querying SDK documentation: {}", e));
                    // Retrieved passages stay useful to the code generator
                    run.context = Some(context);
                    return run;
                }
            }
        };

        self.telemetry.record_metric("sdk_agent.queries", 1.0, "query");
        span.finish();
        SpecialistRun {
            result: SpecialistResult::success(id, completion.text, sources_from(&passages)),
            context: Some(context),
        }
    }

    fn error(&self, message: String) -> SpecialistRun {
        error!("SDK agent error: {}", message);
        self.telemetry.record_metric("sdk_agent.errors", 1.0, "error");
        SpecialistRun::without_context(SpecialistResult::failure(
            SpecialistId::Documentation,
            message,
        ))
    }
}

fn sources_from(passages: &[Passage]) -> Vec<Source> {
    let n = passages.len() as f32;
    passages
        .iter()
        .enumerate()
        .map(|(rank, p)| {
            let (title, url) = match p.page {
                Some(page) => (
                    format!("{} (page {})", p.source, page),
                    format!("{}#page={}", p.source, page),
                ),
                None => (p.source.clone(), p.source.clone()),
            };
            // Without a backend score, fall back to a rank-derived one
            let score = p.score.unwrap_or(1.0 - rank as f32 / n);
            Source::new(title, url, score)
        })
        .collect()
}

//! Framework specialists: web search plus a model answer grounded in it

use std::sync::Arc;

use tracing::error;

use crate::clients::{CompletionRequest, LanguageModel};
use crate::error::AssistantError;
use crate::intent::Framework;
use crate::prompts;
use crate::specialists::{SpecialistId, SpecialistResult, SpecialistRun, Source};
use crate::telemetry::{Telemetry, TelemetrySpan};
use crate::web_search::{WebSearch, combined_context};

pub struct FrameworkSpecialist {
    web: Arc<dyn WebSearch>,
    model: Arc<dyn LanguageModel>,
    telemetry: Arc<dyn Telemetry>,
    max_results: usize,
    temperature: f32,
}

impl FrameworkSpecialist {
    pub fn new(
        web: Arc<dyn WebSearch>,
        model: Arc<dyn LanguageModel>,
        telemetry: Arc<dyn Telemetry>,
    ) -> Self {
        Self {
            web,
            model,
            telemetry,
            max_results: 3,
            temperature: 0.3,
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Answer `question` for one framework. Never fabricates an answer when
    /// the search comes back empty.
    pub async fn query(&self, framework: Framework, question: &str) -> SpecialistRun {
        let id = SpecialistId::Framework(framework);
        let name = framework.as_str();
        let agent = id.agent_name();
        let mut span = TelemetrySpan::agent(self.telemetry.clone(), &agent, "web_search_query")
            .cancellable();
        self.telemetry
            .record_metric(&format!("framework_router.routed_to_{}", name), 1.0, "route");

        let results = {
            let mut tool = TelemetrySpan::tool(
                self.telemetry.clone(),
                "web_search",
                &format!("search_{}", name),
            );
            match self
                .web
                .search_framework(name, question, self.max_results)
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    tool.fail_with(&e);
                    span.fail_with(&AssistantError::specialist(&agent, &e));
                    return self.error(framework, e.to_string());
                }
            }
        };

        if results.is_empty() {
            span.fail("no search results");
            return SpecialistRun::without_context(SpecialistResult::failure(
                id,
                prompts::framework_not_found(name),
            ));
        }

        let context = combined_context(&results);
        let request = CompletionRequest::new(
            "framework_answer",
            prompts::framework_system(name),
            prompts::framework_prompt(name, &context, question),
        )
        .with_temperature(self.temperature);

        let completion = {
            let mut tool = TelemetrySpan::tool(
                self.telemetry.clone(),
                "llm_synthesis",
                &format!("synthesize_{}", name),
            );
            match self.model.complete(&request).await {
                Ok(c) => c,
                Err(e) => {
                    let err = AssistantError::specialist(&agent, &e);
                    tool.fail_with(&err);
                    span.fail_with(&err);
                    let mut run = self.error(framework, e.to_string());
                    run.context = Some(context);
                    return run;
                }
            }
        };

        let sources = results
            .iter()
            .map(|r| Source::new(r.title.clone(), r.url.clone(), r.score))
            .collect();

        self.telemetry.record_metric(
            &format!("framework_specialist.{}.queries", name),
            1.0,
            "query",
        );
        span.finish();
        SpecialistRun {
            result: SpecialistResult::success(id, completion.text, sources),
            context: Some(context),
        }
    }

    fn error(&self, framework: Framework, cause: String) -> SpecialistRun {
        let name = framework.as_str();
        error!("Framework specialist ({}) error: {}", name, cause);
        self.telemetry.record_metric(
            &format!("framework_specialist.{}.errors", name),
            1.0,
            "error",
        );
        SpecialistRun::without_context(SpecialistResult::failure(
            SpecialistId::Framework(framework),
            format!(
                "Error querying {} information: {}",
                prompts::display_framework(name),
                cause
            ),
        ))
    }
}

//! Code generator: merges documentation and framework context into one
//! example with explanation, cost estimate and gotchas

use std::sync::Arc;

use tracing::{error, info};

use crate::clients::{CompletionRequest, LanguageModel};
use crate::error::AssistantError;
use crate::prompts;
use crate::specialists::{SpecialistId, SpecialistResult};
use crate::telemetry::{Telemetry, TelemetrySpan};

pub struct CodeGenerator {
    model: Arc<dyn LanguageModel>,
    telemetry: Arc<dyn Telemetry>,
    temperature: f32,
}

impl CodeGenerator {
    pub fn new(model: Arc<dyn LanguageModel>, telemetry: Arc<dyn Telemetry>) -> Self {
        Self {
            model,
            telemetry,
            temperature: 0.2,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Generate a code answer. With neither context available the answer is
    /// still produced, prefixed with a low-confidence note and reported as
    /// `success = false`.
    pub async fn generate(
        &self,
        query: &str,
        doc_context: Option<&str>,
        framework_context: Option<&str>,
    ) -> SpecialistResult {
        let id = SpecialistId::CodeGenerator;
        let mut span =
            TelemetrySpan::agent(self.telemetry.clone(), &id.agent_name(), "generate_code")
                .cancellable();

        let doc_context = doc_context.unwrap_or("").trim();
        let framework_context = framework_context.unwrap_or("").trim();
        let grounded = !doc_context.is_empty() || !framework_context.is_empty();

        let request = CompletionRequest::new(
            "code_generation",
            prompts::CODE_SYSTEM,
            prompts::code_prompt(query, doc_context, framework_context),
        )
        .with_temperature(self.temperature);

        match self.model.complete(&request).await {
            Ok(completion) => {
                self.telemetry
                    .record_metric("code_generator.queries", 1.0, "query");
                if grounded {
                    span.finish();
                    SpecialistResult::success(id, completion.text, vec![])
                } else {
                    info!("Code generated without documentation or framework context");
                    span.fail("ungrounded");
                    SpecialistResult {
                        specialist_id: id,
                        answer: format!(
                            "{}\n\n{}",
                            prompts::LOW_CONFIDENCE_CODE_NOTE,
                            completion.text
                        ),
                        sources: vec![],
                        success: false,
                    }
                }
            }
            Err(e) => {
                error!("Code generator error: {}", e);
                span.fail_with(&AssistantError::specialist(id.agent_name(), &e));
                self.telemetry
                    .record_metric("code_generator.errors", 1.0, "error");
                SpecialistResult::failure(id, format!("Error generating code: {}", e))
            }
        }
    }
}

//! Response synthesis: merges ordered specialist results into one
//! [`FinalResponse`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::clients::{CompletionRequest, LanguageModel};
use crate::error::AssistantError;
use crate::prompts;
use crate::specialists::{SpecialistId, SpecialistResult, Source};
use crate::telemetry::{Telemetry, TelemetrySpan};

/// How the final answer text was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// Single result returned as-is
    PassThrough,
    /// Merged by the synthesis model
    Model,
    /// Raw answers joined verbatim after the synthesis model failed
    Concatenated,
    /// Every specialist failed
    NoAnswer,
}

/// Which specialist ran and whether it succeeded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub specialist_id: SpecialistId,
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalResponse {
    pub answer: String,
    /// Documentation sources first, then framework, then code generation
    pub sources: Vec<Source>,
    pub success: bool,
    pub provenance: Vec<Provenance>,
    pub strategy: MergeStrategy,
}

impl FinalResponse {
    /// A failed response carrying only an explanation
    pub fn failed(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            sources: vec![],
            success: false,
            provenance: vec![],
            strategy: MergeStrategy::NoAnswer,
        }
    }
}

pub struct Synthesizer {
    model: Arc<dyn LanguageModel>,
    telemetry: Arc<dyn Telemetry>,
    temperature: f32,
}

impl Synthesizer {
    pub fn new(model: Arc<dyn LanguageModel>, telemetry: Arc<dyn Telemetry>) -> Self {
        Self {
            model,
            telemetry,
            temperature: 0.3,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Merge `results`, which must already be in documentation, framework,
    /// code order. Never fails: a synthesis model error degrades to verbatim
    /// concatenation.
    pub async fn synthesize(&self, query: &str, results: Vec<SpecialistResult>) -> FinalResponse {
        let success = results.iter().any(|r| r.success);
        let provenance = results
            .iter()
            .map(|r| Provenance {
                specialist_id: r.specialist_id,
                success: r.success,
            })
            .collect();
        let sources: Vec<Source> = results.iter().flat_map(|r| r.sources.clone()).collect();

        let (answer, strategy) = match results.as_slice() {
            [] => (prompts::NO_SPECIALIST_ANSWER.to_string(), MergeStrategy::NoAnswer),
            [only] => {
                debug!("Single specialist result; skipping synthesis model");
                (only.answer.clone(), MergeStrategy::PassThrough)
            }
            many if !success => (
                format!("{}\n\n{}", prompts::NO_SPECIALIST_ANSWER, concatenate(many)),
                MergeStrategy::NoAnswer,
            ),
            many => self.merge(query, many).await,
        };

        FinalResponse {
            answer,
            sources,
            success,
            provenance,
            strategy,
        }
    }

    async fn merge(&self, query: &str, results: &[SpecialistResult]) -> (String, MergeStrategy) {
        let mut span =
            TelemetrySpan::agent(self.telemetry.clone(), "response_synthesizer", "synthesize");
        let request = CompletionRequest::new(
            "response_synthesis",
            prompts::SYNTHESIS_SYSTEM,
            prompts::synthesis_prompt(query, &agent_responses(results)),
        )
        .with_temperature(self.temperature);

        let failure = match self.model.complete(&request).await {
            Ok(c) if !c.text.trim().is_empty() => {
                span.finish();
                return (c.text, MergeStrategy::Model);
            }
            Ok(_) => "synthesis model returned an empty answer".to_string(),
            Err(e) => e.to_string(),
        };

        let err = AssistantError::Synthesis { message: failure };
        warn!("{}; concatenating raw answers", err);
        span.fail_with(&err);
        self.telemetry
            .record_metric("response_synthesizer.errors", 1.0, "error");
        (concatenate(results), MergeStrategy::Concatenated)
    }
}

/// Render results for the synthesis prompt, marking unavailable ones
fn agent_responses(results: &[SpecialistResult]) -> String {
    results
        .iter()
        .map(|r| {
            let status = if r.success { "" } else { " [unavailable]" };
            format!("=== {}{} ===\n{}", r.specialist_id.heading(), status, r.answer)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Raw answers joined in arrival order, each under its heading
fn concatenate(results: &[SpecialistResult]) -> String {
    results
        .iter()
        .map(|r| format!("## {}\n\n{}", r.specialist_id.heading(), r.answer))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::Framework;

    #[test]
    fn test_concatenate_keeps_answers_verbatim_in_order() {
        let results = vec![
            SpecialistResult::success(SpecialistId::Documentation, "doc `code`", vec![]),
            SpecialistResult::failure(SpecialistId::Framework(Framework::LangChain), "Not found"),
        ];
        let text = concatenate(&results);
        let doc = text.find("doc `code`").unwrap();
        let fw = text.find("Not found").unwrap();
        assert!(doc < fw);
        assert!(text.contains("## LangChain guidance"));
    }

    #[test]
    fn test_agent_responses_mark_failures() {
        let results = vec![
            SpecialistResult::success(SpecialistId::Documentation, "a", vec![]),
            SpecialistResult::failure(SpecialistId::CodeGenerator, "b"),
        ];
        let text = agent_responses(&results);
        assert!(text.contains("=== SDK documentation ===\na"));
        assert!(text.contains("=== Code example [unavailable] ===\nb"));
    }

    #[test]
    fn test_failed_response_shape() {
        let r = FinalResponse::failed("boom");
        assert!(!r.success);
        assert!(r.sources.is_empty());
        assert_eq!(r.strategy, MergeStrategy::NoAnswer);
    }
}

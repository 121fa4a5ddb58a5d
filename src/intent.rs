//! Intent classification
//!
//! One model call decides which specialists a query needs. The reply is
//! treated as untrusted text: [`parse_intent_json`] validates its shape and
//! any failure degrades to an empty [`Intent`] (fail closed), which the
//! router answers with a clarification request.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};
use unicode_normalization::UnicodeNormalization;

use crate::clients::{CompletionRequest, LanguageModel};
use crate::error::{AssistantError, Result};
use crate::prompts;
use crate::telemetry::{Telemetry, TelemetrySpan};

/// Frameworks with a dedicated web-search specialist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    LangChain,
    LlamaIndex,
    CrewAi,
    AutoGen,
    Haystack,
    Generic,
}

/// Keywords that name each framework in free text
const FRAMEWORK_KEYWORDS: &[(Framework, &[&str])] = &[
    (Framework::LangChain, &["langchain", "lang chain", "langgraph", "lcel"]),
    (Framework::LlamaIndex, &["llamaindex", "llama index", "llama-index", "llama_index"]),
    (Framework::CrewAi, &["crewai", "crew ai", "crew-ai"]),
    (Framework::AutoGen, &["autogen", "auto gen", "ag2"]),
    (Framework::Haystack, &["haystack"]),
];

/// One whole-word pattern per framework, so "ag2" does not match "page2"
static FRAMEWORK_PATTERNS: Lazy<Vec<(Framework, Regex)>> = Lazy::new(|| {
    FRAMEWORK_KEYWORDS
        .iter()
        .map(|(framework, keywords)| {
            let alternation = keywords
                .iter()
                .map(|k| regex::escape(k))
                .collect::<Vec<_>>()
                .join("|");
            let re = Regex::new(&format!(r"\b(?:{})\b", alternation)).unwrap();
            (*framework, re)
        })
        .collect()
});

/// Minimum Jaro-Winkler similarity for a misspelt framework name
const FUZZY_THRESHOLD: f64 = 0.9;

impl Framework {
    pub const ALL: [Framework; 6] = [
        Framework::LangChain,
        Framework::LlamaIndex,
        Framework::CrewAi,
        Framework::AutoGen,
        Framework::Haystack,
        Framework::Generic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Framework::LangChain => "langchain",
            Framework::LlamaIndex => "llamaindex",
            Framework::CrewAi => "crewai",
            Framework::AutoGen => "autogen",
            Framework::Haystack => "haystack",
            Framework::Generic => "generic",
        }
    }

    /// Resolve a framework name. Case, spaces, `-` and `_` are ignored and
    /// near-misses ("langchian") are accepted. Unknown names return `None`.
    pub fn parse(name: &str) -> Option<Framework> {
        let normalized: String = name
            .nfkc()
            .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
            .collect::<String>()
            .to_lowercase();
        if normalized.is_empty() {
            return None;
        }
        if let Some(f) = Self::ALL.iter().find(|f| f.as_str() == normalized) {
            return Some(*f);
        }
        Self::ALL
            .iter()
            .map(|f| (*f, strsim::jaro_winkler(f.as_str(), &normalized)))
            .filter(|(_, sim)| *sim >= FUZZY_THRESHOLD)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(f, _)| f)
    }

    /// Find the framework a piece of text names, by keyword mentions.
    /// Returns `None` when no framework keyword appears.
    pub fn detect_in_text(text: &str) -> Option<Framework> {
        let lower: String = text.nfkc().collect::<String>().to_lowercase();
        let mut best: Option<Framework> = None;
        let mut best_score = 0;
        for (framework, re) in FRAMEWORK_PATTERNS.iter() {
            let score = re.find_iter(&lower).count();
            if score > best_score {
                best_score = score;
                best = Some(*framework);
            }
        }
        best
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which specialists a query needs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    pub needs_documentation: bool,
    pub needs_framework: bool,
    pub needs_code: bool,
    pub framework_name: Option<Framework>,
}

impl Intent {
    /// The fail-closed intent: nothing requested
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        !self.needs_documentation && !self.needs_framework && !self.needs_code
    }

    /// Framework the router should consult; `Generic` when none was named
    pub fn framework(&self) -> Framework {
        self.framework_name.unwrap_or(Framework::Generic)
    }
}

/// Outcome of one classification call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub intent: Intent,
    /// Set when the model call or the parse failed and the intent is the fail-closed default
    pub failure: Option<String>,
}

impl Classification {
    pub fn degraded(&self) -> bool {
        self.failure.is_some()
    }
}

/// Parse the classifier's reply into an [`Intent`].
///
/// Accepts a bare JSON object, optionally wrapped in markdown fences or
/// surrounded by prose. All three flags must be JSON booleans;
/// `framework_name` must be a string or null. `needs_sdk` is accepted as an
/// alias of `needs_documentation`. An unrecognised framework name is treated
/// as absent. `query` is scanned for a framework keyword when the model sets
/// `needs_framework` without a usable name; `Generic` is the last resort.
pub fn parse_intent_json(reply: &str, query: &str) -> Result<Intent> {
    let value = extract_json_object(reply)?;
    let obj = value
        .as_object()
        .ok_or_else(|| classification_error("reply is not a JSON object"))?;

    let flag = |keys: &[&str]| -> Result<bool> {
        let (key, v) = keys
            .iter()
            .find_map(|k| obj.get(*k).map(|v| (*k, v)))
            .ok_or_else(|| classification_error(format!("missing field {}", keys[0])))?;
        v.as_bool()
            .ok_or_else(|| classification_error(format!("field {} is not a boolean", key)))
    };

    let needs_documentation = flag(&["needs_documentation", "needs_sdk"])?;
    let needs_framework = flag(&["needs_framework"])?;
    let needs_code = flag(&["needs_code"])?;

    let named = match obj.get("framework_name") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => {
            let parsed = Framework::parse(s);
            if parsed.is_none() {
                debug!("Unrecognised framework name from classifier: {}", s);
            }
            parsed
        }
        Some(_) => return Err(classification_error("framework_name is not a string")),
    };

    let framework_name = match named {
        Some(f) => Some(f),
        None if needs_framework => {
            Some(Framework::detect_in_text(query).unwrap_or(Framework::Generic))
        }
        None => None,
    };

    Ok(Intent {
        needs_documentation,
        needs_framework,
        needs_code,
        framework_name,
    })
}

fn extract_json_object(reply: &str) -> Result<Value> {
    let trimmed = reply
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();
    if let Ok(v) = serde_json::from_str::<Value>(trimmed) {
        return Ok(v);
    }
    // Prose around the object: take the outermost braces
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => serde_json::from_str(&trimmed[start..=end])
            .map_err(|e| classification_error(format!("invalid JSON: {}", e))),
        _ => Err(classification_error("no JSON object in reply")),
    }
}

fn classification_error(message: impl Into<String>) -> AssistantError {
    AssistantError::Classification {
        message: message.into(),
    }
}

pub struct IntentClassifier {
    model: Arc<dyn LanguageModel>,
    telemetry: Arc<dyn Telemetry>,
    temperature: f32,
}

impl IntentClassifier {
    pub fn new(model: Arc<dyn LanguageModel>, telemetry: Arc<dyn Telemetry>) -> Self {
        Self {
            model,
            telemetry,
            temperature: 0.0,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub async fn classify(&self, query_text: &str) -> Intent {
        self.classify_detailed(query_text, None).await.intent
    }

    /// Classify, letting an explicit caller framework hint override the
    /// framework the model picked.
    pub async fn classify_detailed(
        &self,
        query_text: &str,
        framework_hint: Option<Framework>,
    ) -> Classification {
        let mut span =
            TelemetrySpan::agent(self.telemetry.clone(), "intent_classifier", "classify")
                .cancellable();

        let request = CompletionRequest::new(
            "intent_classification",
            prompts::CLASSIFIER_SYSTEM,
            prompts::classification_prompt(query_text),
        )
        .with_temperature(self.temperature)
        .with_max_tokens(200)
        .json();

        let parsed = match self.model.complete(&request).await {
            Ok(completion) => parse_intent_json(&completion.text, query_text).inspect_err(|e| {
                let preview: String = completion.text.chars().take(200).collect();
                warn!("Intent classification failed: {} (reply: {:?})", e, preview);
            }),
            Err(e) => {
                warn!("Intent classification call failed: {}", e);
                Err(AssistantError::from(e))
            }
        };

        match parsed {
            Ok(mut intent) => {
                if let Some(hint) = framework_hint {
                    intent.framework_name = Some(hint);
                }
                self.telemetry.record_event(
                    "intent.classified",
                    json!({
                        "needs_documentation": intent.needs_documentation,
                        "needs_framework": intent.needs_framework,
                        "needs_code": intent.needs_code,
                        "framework": intent.framework_name.map(|f| f.as_str()),
                    }),
                );
                span.finish();
                Classification {
                    intent,
                    failure: None,
                }
            }
            Err(e) => {
                span.fail_with(&e);
                self.telemetry
                    .record_metric("intent_classifier.failures", 1.0, "error");
                Classification {
                    intent: Intent::none(),
                    failure: Some(e.to_string()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_object() {
        let intent = parse_intent_json(
            r#"{"needs_documentation": true, "needs_framework": false, "needs_code": false, "framework_name": null}"#,
            "What does signal() do?",
        )
        .unwrap();
        assert_eq!(
            intent,
            Intent {
                needs_documentation: true,
                needs_framework: false,
                needs_code: false,
                framework_name: None,
            }
        );
    }

    #[test]
    fn test_parse_fenced_with_sdk_alias() {
        let reply = "```json\n{\"needs_sdk\": true, \"needs_framework\": true, \"needs_code\": true, \"framework_name\": \"LangChain\"}\n```";
        let intent = parse_intent_json(reply, "q").unwrap();
        assert!(intent.needs_documentation);
        assert_eq!(intent.framework_name, Some(Framework::LangChain));
    }

    #[test]
    fn test_parse_object_inside_prose() {
        let reply = "Sure! Here it is: {\"needs_documentation\": false, \"needs_framework\": false, \"needs_code\": true, \"framework_name\": null} Hope that helps.";
        let intent = parse_intent_json(reply, "q").unwrap();
        assert!(intent.needs_code);
    }

    #[test]
    fn test_string_flag_is_rejected() {
        let reply = r#"{"needs_documentation": "true", "needs_framework": false, "needs_code": false}"#;
        let err = parse_intent_json(reply, "q").unwrap_err();
        assert!(err.to_string().contains("not a boolean"));
    }

    #[test]
    fn test_missing_flag_is_rejected() {
        let reply = r#"{"needs_documentation": true, "needs_code": false}"#;
        assert!(parse_intent_json(reply, "q").is_err());
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(parse_intent_json("I think they want docs", "q").is_err());
        assert!(parse_intent_json("[true, false, true]", "q").is_err());
    }

    #[test]
    fn test_framework_without_name_uses_query_keywords() {
        let reply = r#"{"needs_documentation": false, "needs_framework": true, "needs_code": false, "framework_name": null}"#;
        let intent = parse_intent_json(reply, "How do I trace a CrewAI crew?").unwrap();
        assert_eq!(intent.framework_name, Some(Framework::CrewAi));
    }

    #[test]
    fn test_unknown_framework_defaults_to_generic() {
        let reply = r#"{"needs_documentation": false, "needs_framework": true, "needs_code": false, "framework_name": "semantic-kernel"}"#;
        let intent = parse_intent_json(reply, "Using Semantic Kernel planners").unwrap();
        assert_eq!(intent.framework_name, Some(Framework::Generic));
        assert_eq!(intent.framework(), Framework::Generic);
    }

    #[test]
    fn test_framework_name_normalisation() {
        assert_eq!(Framework::parse("Llama-Index"), Some(Framework::LlamaIndex));
        assert_eq!(Framework::parse("crew_ai"), Some(Framework::CrewAi));
        assert_eq!(Framework::parse("langchian"), Some(Framework::LangChain));
        assert_eq!(Framework::parse("django"), None);
        assert_eq!(Framework::parse(""), None);
    }

    #[test]
    fn test_detect_in_text() {
        assert_eq!(
            Framework::detect_in_text("Compare LangChain and LCEL pipelines"),
            Some(Framework::LangChain)
        );
        assert_eq!(Framework::detect_in_text("plain python please"), None);
        assert_eq!(Framework::detect_in_text("see page2 of the guide"), None);
        assert_eq!(
            Framework::detect_in_text("an AG2 group chat"),
            Some(Framework::AutoGen)
        );
    }

    #[test]
    fn test_empty_intent() {
        assert!(Intent::none().is_empty());
        assert_eq!(Intent::none().framework_name, None);
    }
}

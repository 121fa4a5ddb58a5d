//! Specialists answer one narrow sub-question each and report a
//! [`SpecialistResult`]. They never return errors: backend failures, empty
//! retrievals and timeouts all become `success = false` results with a
//! human-readable answer.

pub mod code;
pub mod docs;
pub mod framework;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::intent::Framework;

pub use code::CodeGenerator;
pub use docs::DocumentationSpecialist;
pub use framework::FrameworkSpecialist;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialistId {
    Documentation,
    Framework(Framework),
    CodeGenerator,
    Clarification,
}

impl SpecialistId {
    /// Agent name used in telemetry and logs
    pub fn agent_name(&self) -> String {
        match self {
            SpecialistId::Documentation => "sdk_agent".to_string(),
            SpecialistId::Framework(f) => format!("framework_specialist.{}", f.as_str()),
            SpecialistId::CodeGenerator => "code_generator".to_string(),
            SpecialistId::Clarification => "clarification".to_string(),
        }
    }

    /// Heading used when several answers are merged or concatenated
    pub fn heading(&self) -> String {
        match self {
            SpecialistId::Documentation => "SDK documentation".to_string(),
            SpecialistId::Framework(f) => {
                format!("{} guidance", crate::prompts::display_framework(f.as_str()))
            }
            SpecialistId::CodeGenerator => "Code example".to_string(),
            SpecialistId::Clarification => "Clarification".to_string(),
        }
    }
}

impl fmt::Display for SpecialistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.agent_name())
    }
}

/// A citation attached to an answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    pub url: String,
    /// Relevance in [0, 1]
    pub score: f32,
}

impl Source {
    pub fn new(title: impl Into<String>, url: impl Into<String>, score: f32) -> Self {
        let score = if score.is_finite() {
            score.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            title: title.into(),
            url: url.into(),
            score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialistResult {
    pub specialist_id: SpecialistId,
    pub answer: String,
    pub sources: Vec<Source>,
    pub success: bool,
}

impl SpecialistResult {
    pub fn success(id: SpecialistId, answer: impl Into<String>, sources: Vec<Source>) -> Self {
        Self {
            specialist_id: id,
            answer: answer.into(),
            sources,
            success: true,
        }
    }

    pub fn failure(id: SpecialistId, answer: impl Into<String>) -> Self {
        Self {
            specialist_id: id,
            answer: answer.into(),
            sources: vec![],
            success: false,
        }
    }

    pub fn clarification() -> Self {
        Self::failure(
            SpecialistId::Clarification,
            crate::prompts::CLARIFICATION_MESSAGE,
        )
    }

    pub fn timed_out(id: SpecialistId, timeout_ms: u64) -> Self {
        Self::failure(
            id,
            format!(
                "Timed out: the {} did not finish within the {} ms query budget.",
                id.heading().to_lowercase(),
                timeout_ms
            ),
        )
    }
}

/// A specialist result plus the raw context it gathered, which the code
/// generator reuses
#[derive(Debug, Clone)]
pub struct SpecialistRun {
    pub result: SpecialistResult,
    pub context: Option<String>,
}

impl SpecialistRun {
    pub fn without_context(result: SpecialistResult) -> Self {
        Self {
            result,
            context: None,
        }
    }
}

//! Domain-specific error types for the SDK assistant

use thiserror::Error;

/// Main error type for the assistant core and its collaborators
#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Classification error: {message}")]
    Classification { message: String },

    #[error("Retrieval error: {message}")]
    Retrieval { message: String },

    #[error("Specialist error ({specialist}): {message}")]
    Specialist { specialist: String, message: String },

    #[error("Synthesis error: {message}")]
    Synthesis { message: String },

    #[error("Timeout error: {operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("HTTP error: {message}")]
    Http { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AssistantError {
    /// Failure inside one specialist, tagged with its agent name
    pub fn specialist(specialist: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        AssistantError::Specialist {
            specialist: specialist.into(),
            message: cause.to_string(),
        }
    }

    /// Short machine-readable label, reported as `error_kind` on failed
    /// telemetry spans and in HTTP error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            AssistantError::Config { .. } => "config",
            AssistantError::Classification { .. } => "classification",
            AssistantError::Retrieval { .. } => "retrieval",
            AssistantError::Specialist { .. } => "specialist",
            AssistantError::Synthesis { .. } => "synthesis",
            AssistantError::Timeout { .. } => "timeout",
            AssistantError::Validation { .. } => "validation",
            AssistantError::Http { .. } => "http",
            AssistantError::Serialization { .. } => "serialization",
            AssistantError::Internal { .. } => "internal",
        }
    }
}

impl From<anyhow::Error> for AssistantError {
    fn from(err: anyhow::Error) -> Self {
        AssistantError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for AssistantError {
    fn from(err: serde_json::Error) -> Self {
        AssistantError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for AssistantError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return AssistantError::Http {
                message: format!("request timed out: {}", err),
            };
        }
        AssistantError::Http {
            message: format!("HTTP request failed: {}", err),
        }
    }
}

impl From<crate::clients::LlmError> for AssistantError {
    fn from(err: crate::clients::LlmError) -> Self {
        match err {
            crate::clients::LlmError::Timeout { timeout_ms } => AssistantError::Timeout {
                operation: "language model call".to_string(),
                timeout_ms,
            },
            other => AssistantError::Internal {
                message: other.to_string(),
            },
        }
    }
}

/// Result type alias for assistant operations
pub type Result<T> = std::result::Result<T, AssistantError>;

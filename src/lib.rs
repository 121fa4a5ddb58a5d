//! SDK assistant: answers SDK questions by classifying intent, dispatching
//! to documentation, framework and code-generation specialists, and
//! synthesizing their answers.

pub mod clients;
pub mod config;
pub mod error;
pub mod http;
pub mod intent;
pub mod orchestrator;
pub mod prompts;
pub mod retrieval;
pub mod router;
pub mod session;
pub mod specialists;
pub mod synthesis;
pub mod telemetry;
pub mod web_search;

pub use error::{AssistantError, Result};
pub use orchestrator::{Orchestrator, Query};
pub use synthesis::FinalResponse;

// Loads .env if present and silently ignores if missing.
pub fn load_env() {
    let _ = dotenvy::dotenv();
}

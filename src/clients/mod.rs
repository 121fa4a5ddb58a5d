pub mod chain;
pub mod openai;
pub mod traits;

pub use chain::ModelChain;
pub use openai::OpenAiChatClient;
pub use traits::{Completion, CompletionRequest, LanguageModel, LlmError};

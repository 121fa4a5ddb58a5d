use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Main configuration structure loaded from sdk_assistant.toml and environment variables
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub web_search: WebSearchConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub server: ServerConfig,
    /// Runtime configuration loaded from environment variables
    #[serde(skip)]
    pub runtime: RuntimeConfig,
}

/// Language model endpoint and per-role sampling settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    /// Tried in order when the primary model fails
    pub fallback_models: Vec<String>,
    pub classifier_temperature: f32,
    pub documentation_temperature: f32,
    pub framework_temperature: f32,
    pub code_temperature: f32,
    pub synthesis_temperature: f32,
    pub max_tokens: u32,
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            fallback_models: vec![],
            classifier_temperature: 0.0,
            documentation_temperature: 0.1,
            framework_temperature: 0.3,
            code_temperature: 0.2,
            synthesis_temperature: 0.3,
            max_tokens: 1500,
            timeout_ms: 60_000,
        }
    }
}

/// Documentation retrieval settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// JSONL file of indexed passages (`{"text", "page", "source"}` per line)
    pub corpus_path: PathBuf,
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            corpus_path: PathBuf::from("data/sdk_docs.jsonl"),
            top_k: 5,
        }
    }
}

/// Web search backend settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WebSearchConfig {
    pub base_url: String,
    pub max_results: usize,
    pub search_depth: String,
    pub timeout_ms: u64,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.tavily.com".to_string(),
            max_results: 3,
            search_depth: "advanced".to_string(),
            timeout_ms: 20_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Per-query budget; specialists still running at the deadline are marked timed out
    pub query_timeout_ms: u64,
    /// Run the documentation and framework specialists concurrently
    pub parallel_dispatch: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            query_timeout_ms: 90_000,
            parallel_dispatch: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8700".to_string(),
        }
    }
}

/// Runtime configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub openai_api_key: Option<String>,
    pub tavily_api_key: Option<String>,
    pub log_level: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            tavily_api_key: None,
            log_level: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Load runtime configuration from environment variables
    pub fn load_from_env() -> Self {
        Self {
            openai_api_key: non_empty_env("OPENAI_API_KEY"),
            tavily_api_key: non_empty_env("TAVILY_API_KEY"),
            log_level: non_empty_env("RUST_LOG")
                .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        }
    }

    /// Tracing filter built from `log_level`; an unparsable directive falls
    /// back to the default filter
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.log_level).unwrap_or_else(|e| {
            eprintln!("Ignoring invalid RUST_LOG {:?}: {}", self.log_level, e);
            EnvFilter::new(DEFAULT_LOG_FILTER)
        })
    }
}

const DEFAULT_LOG_FILTER: &str = "sdk_assistant=info";

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            retrieval: RetrievalConfig::default(),
            web_search: WebSearchConfig::default(),
            orchestrator: OrchestratorConfig::default(),
            server: ServerConfig::default(),
            runtime: RuntimeConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file and environment variables
    /// Uses SDK_ASSISTANT_CONFIG environment variable or defaults to "sdk_assistant.toml"
    pub fn load() -> anyhow::Result<Self> {
        // Env file resolution:
        // 1) SDK_ASSISTANT_ENV_FILE if set
        // 2) ./.env
        // 3) ../.env when the API key is still missing
        if let Ok(env_path) = std::env::var("SDK_ASSISTANT_ENV_FILE") {
            let _ = dotenvy::from_path(env_path);
        } else {
            let _ = dotenvy::from_path(".env");
            if std::env::var("OPENAI_API_KEY").is_err() {
                let _ = dotenvy::from_path("../.env");
            }
        }

        let config_path = std::env::var("SDK_ASSISTANT_CONFIG")
            .unwrap_or_else(|_| "sdk_assistant.toml".to_string());

        let mut config: Config = if let Ok(content) = std::fs::read_to_string(&config_path) {
            toml::from_str(&content)?
        } else {
            tracing::warn!("Config file {} not found, using defaults", config_path);
            Self::default()
        };

        config.apply_env_overrides();
        config.runtime = RuntimeConfig::load_from_env();
        config.validate()?;

        Ok(config)
    }

    /// Parse a TOML document without touching the environment
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let mut config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(model) = std::env::var("SDK_LLM_MODEL") {
            self.llm.model = model;
            tracing::debug!("SDK_LLM_MODEL env override applied");
        }
        if let Ok(base) = std::env::var("SDK_LLM_BASE_URL") {
            self.llm.base_url = base;
            tracing::debug!("SDK_LLM_BASE_URL env override applied");
        }
        if let Some(top_k) = std::env::var("SDK_TOP_K")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
        {
            self.retrieval.top_k = top_k;
        }
        if let Ok(path) = std::env::var("SDK_CORPUS_PATH") {
            self.retrieval.corpus_path = PathBuf::from(path);
        }
        if let Some(timeout) = std::env::var("SDK_QUERY_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            self.orchestrator.query_timeout_ms = timeout;
        }
        if let Ok(bind) = std::env::var("SDK_HTTP_BIND") {
            self.server.bind = bind;
        }
    }

    /// Validate the configuration
    pub fn validate(&mut self) -> anyhow::Result<()> {
        if !(1..=50).contains(&self.retrieval.top_k) {
            anyhow::bail!("retrieval.top_k must be between 1 and 50");
        }
        let temps = [
            ("classifier_temperature", self.llm.classifier_temperature),
            ("documentation_temperature", self.llm.documentation_temperature),
            ("framework_temperature", self.llm.framework_temperature),
            ("code_temperature", self.llm.code_temperature),
            ("synthesis_temperature", self.llm.synthesis_temperature),
        ];
        for (name, value) in temps {
            if !(0.0..=2.0).contains(&value) {
                anyhow::bail!("llm.{} must be between 0.0 and 2.0", name);
            }
        }
        if self.llm.model.trim().is_empty() {
            anyhow::bail!("llm.model must not be empty");
        }
        if self.orchestrator.query_timeout_ms == 0 {
            anyhow::bail!("orchestrator.query_timeout_ms must be > 0");
        }
        if self.web_search.max_results == 0 {
            anyhow::bail!("web_search.max_results must be > 0");
        } else if self.web_search.max_results > 10 {
            tracing::warn!(
                "web_search.max_results {} exceeds max 10, clamping to 10",
                self.web_search.max_results
            );
            self.web_search.max_results = 10;
        }
        if self.llm.timeout_ms == 0 {
            self.llm.timeout_ms = LlmConfig::default().timeout_ms;
        }
        Ok(())
    }

    /// Human-readable list of missing prerequisites (credentials, corpus file)
    pub fn missing_prerequisites(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.runtime.openai_api_key.is_none() {
            missing.push("OPENAI_API_KEY is not set".to_string());
        }
        if self.runtime.tavily_api_key.is_none() {
            missing.push("TAVILY_API_KEY is not set (framework questions will fail)".to_string());
        }
        if !self.retrieval.corpus_path.exists() {
            missing.push(format!(
                "documentation corpus not found at {}",
                self.retrieval.corpus_path.display()
            ));
        }
        missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = Config::from_toml_str(
            r#"
            [llm]
            model = "gpt-4o"
            fallback_models = ["gpt-4o-mini"]

            [retrieval]
            top_k = 8
            "#,
        )
        .unwrap();
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.llm.fallback_models, vec!["gpt-4o-mini".to_string()]);
        assert_eq!(config.llm.classifier_temperature, 0.0);
        assert_eq!(config.retrieval.top_k, 8);
        assert_eq!(config.web_search.max_results, 3);
        assert!(config.orchestrator.parallel_dispatch);
    }

    #[test]
    fn test_top_k_out_of_range_rejected() {
        let err = Config::from_toml_str("[retrieval]\ntop_k = 0\n").unwrap_err();
        assert!(err.to_string().contains("top_k"));
    }

    #[test]
    fn test_bad_temperature_rejected() {
        let err = Config::from_toml_str("[llm]\ncode_temperature = 3.5\n").unwrap_err();
        assert!(err.to_string().contains("code_temperature"));
    }

    #[test]
    fn test_max_results_clamped() {
        let config = Config::from_toml_str("[web_search]\nmax_results = 40\n").unwrap();
        assert_eq!(config.web_search.max_results, 10);
    }

    #[test]
    fn test_log_level_drives_env_filter() {
        let runtime = RuntimeConfig {
            log_level: "sdk_assistant=debug".to_string(),
            ..RuntimeConfig::default()
        };
        let shown = |r: &RuntimeConfig| r.env_filter().to_string().to_lowercase();
        assert_eq!(shown(&runtime), "sdk_assistant=debug");
        assert_eq!(shown(&RuntimeConfig::default()), DEFAULT_LOG_FILTER);
    }

    #[test]
    fn test_missing_prerequisites_lists_keys() {
        let mut config = Config::default();
        config.retrieval.corpus_path = PathBuf::from("/definitely/not/here.jsonl");
        let missing = config.missing_prerequisites();
        assert_eq!(missing.len(), 3);
        assert!(missing[0].contains("OPENAI_API_KEY"));
    }
}

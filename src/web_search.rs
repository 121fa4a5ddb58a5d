//! Web search contract and the Tavily backend

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::WebSearchConfig;
use crate::error::{AssistantError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebResult {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub score: f32,
}

#[async_trait]
pub trait WebSearch: Send + Sync {
    /// Search the web for `query` in the context of one framework. An empty
    /// result set means nothing was found (or the quota is exhausted).
    async fn search_framework(
        &self,
        framework: &str,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<WebResult>>;
}

/// Render search results as the context block given to the model
pub fn combined_context(results: &[WebResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, r)| {
            format!(
                "[Result {}] {}\nURL: {}\n{}\n",
                i + 1,
                r.title,
                r.url,
                r.content.trim()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Stand-in used when no search API key is configured; always finds nothing
pub struct DisabledWebSearch;

#[async_trait]
impl WebSearch for DisabledWebSearch {
    async fn search_framework(
        &self,
        framework: &str,
        _query: &str,
        _max_results: usize,
    ) -> Result<Vec<WebResult>> {
        tracing::debug!("Web search disabled; no results for {}", framework);
        Ok(vec![])
    }
}

pub struct TavilyClient {
    client: Client,
    endpoint: String,
    api_key: String,
    search_depth: String,
}

#[derive(Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<WebResult>,
}

impl TavilyClient {
    pub fn new(cfg: &WebSearchConfig, api_key: String) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(AssistantError::Config {
                message: "TAVILY_API_KEY is empty".into(),
            });
        }
        let client = Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(|e| AssistantError::Internal {
                message: format!("Failed to build HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            endpoint: format!("{}/search", cfg.base_url.trim_end_matches('/')),
            api_key,
            search_depth: cfg.search_depth.clone(),
        })
    }
}

#[async_trait]
impl WebSearch for TavilyClient {
    async fn search_framework(
        &self,
        framework: &str,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<WebResult>> {
        let scoped_query = if framework == "generic" {
            query.to_string()
        } else {
            format!("{} {}", framework, query)
        };
        let body = json!({
            "api_key": self.api_key,
            "query": scoped_query,
            "search_depth": self.search_depth,
            "max_results": max_results,
        });

        let resp = self.client.post(&self.endpoint).json(&body).send().await?;
        let status = resp.status();
        if status.as_u16() == 429 || status.as_u16() == 432 {
            // Plan quota exhausted: report as no results rather than failure
            tracing::warn!("Web search quota exceeded ({})", status);
            return Ok(vec![]);
        }
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(AssistantError::Http {
                message: format!("web search returned {}: {}", status, text),
            });
        }

        let parsed: TavilyResponse = resp.json().await?;
        let mut results = parsed.results;
        results.truncate(max_results);
        Ok(results)
    }
}

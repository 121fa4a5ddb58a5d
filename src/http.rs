//! HTTP transport for the assistant
//!
//! Axum JSON surface over [`Orchestrator::handle`]: health, info, metrics,
//! query and feedback. It adds no semantics of its own.

use std::cmp::Ordering;
use std::collections::VecDeque;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::error::AssistantError;
use crate::orchestrator::{Orchestrator, Query};
use crate::session::new_conversation_id;
use crate::synthesis::FinalResponse;
use crate::telemetry::Feedback;

/// Latencies kept for the p95 estimate
const LATENCY_WINDOW: usize = 256;

/// Shared state for HTTP server
#[derive(Clone)]
pub struct HttpState {
    pub config: Arc<Config>,
    pub orchestrator: Arc<Orchestrator>,
    pub metrics: Arc<Mutex<HttpMetrics>>,
}

impl HttpState {
    pub fn new(config: Arc<Config>, orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            config,
            orchestrator,
            metrics: Arc::new(Mutex::new(HttpMetrics::default())),
        }
    }
}

/// Counters for `/query` traffic
#[derive(Debug, Clone, Default)]
pub struct HttpMetrics {
    pub total_queries: u64,
    pub failed_answers: u64,
    pub errors_total: u64,
    pub last_request_unix: u64,
    pub latencies: VecDeque<f64>,
}

impl HttpMetrics {
    fn record_latency(&mut self, latency_ms: f64) {
        self.latencies.push_back(latency_ms);
        if self.latencies.len() > LATENCY_WINDOW {
            self.latencies.pop_front();
        }
    }

    /// Average and p95 of the retained latencies
    pub fn latency_summary(&self) -> (Option<f64>, Option<f64>) {
        if self.latencies.is_empty() {
            return (None, None);
        }
        let avg = self.latencies.iter().sum::<f64>() / self.latencies.len() as f64;
        let mut sorted: Vec<f64> = self.latencies.iter().copied().collect();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        let p95_idx = ((sorted.len() as f64 * 0.95) as usize).min(sorted.len() - 1);
        (Some(avg), sorted.get(p95_idx).copied())
    }
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub question: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub framework: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub conversation_id: String,
    #[serde(flatten)]
    pub response: FinalResponse,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub conversation_id: String,
    pub helpful: bool,
}

impl IntoResponse for AssistantError {
    fn into_response(self) -> Response {
        let status = match &self {
            AssistantError::Validation { .. } => StatusCode::BAD_REQUEST,
            AssistantError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = json!({
            "error": {"code": status.as_u16(), "kind": self.kind(), "message": self.to_string()}
        });
        (status, Json(body)).into_response()
    }
}

/// Health check endpoint
pub async fn health_handler() -> impl IntoResponse {
    "ok"
}

/// Info endpoint
pub async fn info_handler(State(state): State<HttpState>) -> impl IntoResponse {
    let frameworks: Vec<&str> = Orchestrator::supported_frameworks()
        .iter()
        .map(|f| f.as_str())
        .collect();
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "llm": {
            "model": state.config.llm.model,
            "fallback_models": state.config.llm.fallback_models,
        },
        "retrieval": {
            "corpus_path": state.config.retrieval.corpus_path.display().to_string(),
            "top_k": state.config.retrieval.top_k,
        },
        "frameworks": frameworks,
        "server": {"bind": state.config.server.bind},
    }))
}

/// Metrics endpoint
pub async fn metrics_handler(State(state): State<HttpState>) -> impl IntoResponse {
    let metrics = state.metrics.lock().await.clone();
    let (avg_latency_ms, p95_latency_ms) = metrics.latency_summary();
    Json(json!({
        "metrics_version": "1",
        "total_queries": metrics.total_queries,
        "failed_answers": metrics.failed_answers,
        "errors_total": metrics.errors_total,
        "last_request_unix": metrics.last_request_unix,
        "avg_latency_ms": avg_latency_ms,
        "p95_latency_ms": p95_latency_ms,
    }))
}

/// Answer one question. Always 200 once the body parses: a failed answer is
/// reported through `success = false`.
pub async fn query_handler(
    State(state): State<HttpState>,
    Json(req): Json<QueryRequest>,
) -> Json<QueryResponse> {
    let conversation_id = req
        .conversation_id
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(new_conversation_id);
    let mut query = Query::new(req.question, conversation_id.clone());
    if let Some(fw) = req.framework.filter(|f| !f.trim().is_empty()) {
        query = query.with_framework_hint(fw);
    }

    let response = state.orchestrator.handle(query).await;
    if !response.success {
        let mut m = state.metrics.lock().await;
        m.failed_answers = m.failed_answers.saturating_add(1);
    }
    Json(QueryResponse {
        conversation_id,
        response,
    })
}

pub async fn feedback_handler(
    State(state): State<HttpState>,
    Json(req): Json<FeedbackRequest>,
) -> Result<impl IntoResponse, AssistantError> {
    if req.conversation_id.trim().is_empty() {
        return Err(AssistantError::Validation {
            message: "conversation_id must not be empty".into(),
        });
    }
    let feedback = if req.helpful {
        Feedback::Helpful
    } else {
        Feedback::NotHelpful
    };
    state
        .orchestrator
        .record_feedback(&req.conversation_id, feedback);
    Ok(Json(json!({"recorded": true, "feedback": feedback})))
}

/// Build the router with CORS and `/query` metrics
pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/info", get(info_handler))
        .route("/metrics", get(metrics_handler))
        .route("/query", post(query_handler))
        .route("/feedback", post(feedback_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers([header::CONTENT_TYPE]),
        )
        .layer(middleware::from_fn_with_state(
            state.metrics.clone(),
            |State(metrics): State<Arc<Mutex<HttpMetrics>>>,
             req: axum::http::Request<Body>,
             next: axum::middleware::Next| async move {
                let is_query = req.uri().path() == "/query";
                let start = is_query.then(std::time::Instant::now);
                let resp = next.run(req).await;
                if let Some(start_time) = start {
                    let latency_ms = start_time.elapsed().as_secs_f64() * 1000.0;
                    let mut m = metrics.lock().await;
                    m.record_latency(latency_ms);
                    if !resp.status().is_success() {
                        m.errors_total = m.errors_total.saturating_add(1);
                    }
                    m.total_queries = m.total_queries.saturating_add(1);
                    m.last_request_unix = std::time::SystemTime::now()
                        .duration_since(std::time::UNIX_EPOCH)
                        .unwrap_or_default()
                        .as_secs();
                }
                resp
            },
        ))
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_http_server(state: HttpState) -> anyhow::Result<()> {
    let bind = state.config.server.bind.clone();
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind HTTP listener on {}: {}", bind, e))?;

    tracing::info!("Starting HTTP server on {}", bind);

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_summary() {
        let mut m = HttpMetrics::default();
        assert_eq!(m.latency_summary(), (None, None));
        for v in 1..=20 {
            m.record_latency(v as f64);
        }
        let (avg, p95) = m.latency_summary();
        assert_eq!(avg, Some(10.5));
        assert_eq!(p95, Some(20.0));
    }

    #[test]
    fn test_latency_window_is_bounded() {
        let mut m = HttpMetrics::default();
        for v in 0..(LATENCY_WINDOW + 10) {
            m.record_latency(v as f64);
        }
        assert_eq!(m.latencies.len(), LATENCY_WINDOW);
        assert_eq!(m.latencies.front(), Some(&10.0));
        assert_eq!(m.latencies.back(), Some(&((LATENCY_WINDOW + 9) as f64)));
    }

    #[test]
    fn test_validation_error_maps_to_bad_request() {
        let resp = AssistantError::Validation {
            message: "bad".into(),
        }
        .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}

//! Telemetry contract and sinks
//!
//! The assistant reports events and metrics through [`Telemetry`]. Calls are
//! fire-and-forget: implementations must never fail the caller, and nothing
//! in the answer path reads telemetry back.
//!
//! [`TelemetrySpan`] is the scoped form used around agent and tool calls. It
//! emits `span.start` on creation and `span.end` when dropped, so the span is
//! closed on every exit path including early returns from a failed specialist.
//! Spans marked [`TelemetrySpan::cancellable`] report `cancelled` when they are
//! dropped before `finish` or `fail`, which is what a deadline does to them.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::AssistantError;

pub trait Telemetry: Send + Sync {
    fn record_event(&self, name: &str, attributes: Value);
    fn record_metric(&self, name: &str, value: f64, unit: &str);
}

/// Drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTelemetry;

impl Telemetry for NoopTelemetry {
    fn record_event(&self, _name: &str, _attributes: Value) {}
    fn record_metric(&self, _name: &str, _value: f64, _unit: &str) {}
}

/// Emits events and metrics as structured `tracing` records
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingTelemetry;

impl Telemetry for TracingTelemetry {
    fn record_event(&self, name: &str, attributes: Value) {
        tracing::info!(target: "sdk_assistant::telemetry", event = name, attributes = %attributes);
    }

    fn record_metric(&self, name: &str, value: f64, unit: &str) {
        tracing::info!(target: "sdk_assistant::telemetry", metric = name, value, unit);
    }
}

/// Kind of work a span covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StepType {
    Agent,
    Tool,
}

impl StepType {
    fn prefix(self) -> &'static str {
        match self {
            StepType::Agent => "agent",
            StepType::Tool => "tool",
        }
    }
}

pub struct TelemetrySpan {
    sink: Arc<dyn Telemetry>,
    name: String,
    step_type: StepType,
    operation: String,
    started: Instant,
    failed: Option<String>,
    error_kind: Option<&'static str>,
    cancellable: bool,
    finished: bool,
}

impl TelemetrySpan {
    pub fn start(
        sink: Arc<dyn Telemetry>,
        step_type: StepType,
        name: &str,
        operation: &str,
    ) -> Self {
        let name = format!("{}.{}", step_type.prefix(), name);
        sink.record_event(
            "span.start",
            json!({"span": name, "step_type": step_type, "operation": operation}),
        );
        Self {
            sink,
            name,
            step_type,
            operation: operation.to_string(),
            started: Instant::now(),
            failed: None,
            error_kind: None,
            cancellable: false,
            finished: false,
        }
    }

    pub fn agent(sink: Arc<dyn Telemetry>, name: &str, operation: &str) -> Self {
        Self::start(sink, StepType::Agent, name, operation)
    }

    pub fn tool(sink: Arc<dyn Telemetry>, name: &str, operation: &str) -> Self {
        Self::start(sink, StepType::Tool, name, operation)
    }

    /// Report `cancelled` if dropped before [`finish`](Self::finish) or a failure
    pub fn cancellable(mut self) -> Self {
        self.cancellable = true;
        self
    }

    /// Mark the span as failed; reported when the span closes
    pub fn fail(&mut self, reason: impl Into<String>) {
        self.failed = Some(reason.into());
        self.finished = true;
    }

    /// Mark the span as failed with a typed error; its kind becomes `error_kind`
    pub fn fail_with(&mut self, err: &AssistantError) {
        self.error_kind = Some(err.kind());
        self.fail(err.to_string());
    }

    pub fn finish(&mut self) {
        self.finished = true;
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for TelemetrySpan {
    fn drop(&mut self) {
        let elapsed_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        let status = if self.failed.is_some() {
            "error"
        } else if self.cancellable && !self.finished {
            "cancelled"
        } else {
            "ok"
        };
        self.sink.record_event(
            "span.end",
            json!({
                "span": self.name,
                "step_type": self.step_type,
                "operation": self.operation,
                "status": status,
                "error": self.failed,
                "error_kind": self.error_kind,
                "duration_ms": elapsed_ms,
            }),
        );
        self.sink
            .record_metric(&format!("latency.{}", self.name), elapsed_ms, "millisecond");
    }
}

/// User verdict on an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feedback {
    Helpful,
    NotHelpful,
}

impl Feedback {
    pub fn as_str(&self) -> &'static str {
        match self {
            Feedback::Helpful => "helpful",
            Feedback::NotHelpful => "not_helpful",
        }
    }

    pub fn value(&self) -> f64 {
        match self {
            Feedback::Helpful => 1.0,
            Feedback::NotHelpful => 0.0,
        }
    }
}

//! Metrics collection and Prometheus export.
//!
//! Initializes the metrics exporter and provides the /metrics endpoint
//! handler plus the domain counters recorded by the analysis services.

use crate::models::LesionClass;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;

/// Global handle to the Prometheus recorder.
pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Only the first call has an effect.
pub fn init_metrics() {
    if METRICS_HANDLE.get().is_some() {
        return;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            let _ = METRICS_HANDLE.set(handle);
        }
        Err(e) => tracing::warn!(error = %e, "Failed to install Prometheus recorder"),
    }
}

/// Current metrics in Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized".to_string())
}

pub fn record_skin_prediction(diagnosis: LesionClass, elapsed: Duration) {
    counter!("skin_predictions_total", "diagnosis" => diagnosis.code()).increment(1);
    histogram!("skin_inference_duration_seconds").record(elapsed.as_secs_f64());
}

/// Outcome of one LLM call, used as a metric label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmOutcome {
    Success,
    Timeout,
    ProviderError,
    InvalidOutput,
}

impl LlmOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            LlmOutcome::Success => "success",
            LlmOutcome::Timeout => "timeout",
            LlmOutcome::ProviderError => "provider_error",
            LlmOutcome::InvalidOutput => "invalid_output",
        }
    }
}

pub fn record_llm_call(outcome: LlmOutcome, elapsed: Duration) {
    counter!("symptom_llm_requests_total", "outcome" => outcome.as_str()).increment(1);
    histogram!("symptom_llm_duration_seconds").record(elapsed.as_secs_f64());
}

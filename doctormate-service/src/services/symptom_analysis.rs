//! Symptom analysis backed by an LLM.
//!
//! The model is asked for a JSON object in a fixed schema. The answer is
//! parsed strictly: a missing or invalid field fails the request instead of
//! being filled in.

use super::metrics::{self, LlmOutcome};
use super::providers::{FinishReason, GenerationParams, ProviderError, TextProvider};
use crate::models::{Assessment, Confidence, Severity, SymptomAnalysis, SYMPTOM_DISCLAIMER};
use serde::Deserialize;
use service_core::error::AppError;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

const SYSTEM_PROMPT: &str = r#"You are a medical symptom checker assistant.
Analyze the user's symptoms and provide a structured medical assessment.

IMPORTANT: You must respond ONLY with valid JSON in this exact format:
{
  "possible_diagnosis": "string",
  "confidence": number (0-100),
  "severity": "Mild" or "Moderate" or "Severe",
  "description": "string",
  "recommendations": ["string", "string", ...],
  "emergency_care": "string",
  "disclaimer": "This is an AI-generated assessment and not a substitute for professional medical advice. Please consult a healthcare provider for proper diagnosis and treatment."
}

Base your analysis on common medical knowledge. Be cautious and recommend professional consultation when appropriate."#;

#[derive(Debug, Error)]
pub enum SymptomAnalysisError {
    #[error("LLM call timed out after {0:?}")]
    Timeout(Duration),

    #[error("LLM provider failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("LLM returned no content")]
    EmptyResponse,

    #[error("LLM returned an invalid assessment: {0}")]
    InvalidOutput(String),
}

impl SymptomAnalysisError {
    fn outcome(&self) -> LlmOutcome {
        match self {
            SymptomAnalysisError::Timeout(_) => LlmOutcome::Timeout,
            SymptomAnalysisError::Provider(ProviderError::Timeout) => LlmOutcome::Timeout,
            SymptomAnalysisError::Provider(_) => LlmOutcome::ProviderError,
            SymptomAnalysisError::EmptyResponse | SymptomAnalysisError::InvalidOutput(_) => {
                LlmOutcome::InvalidOutput
            }
        }
    }
}

impl From<SymptomAnalysisError> for AppError {
    fn from(err: SymptomAnalysisError) -> Self {
        match err {
            SymptomAnalysisError::Timeout(_)
            | SymptomAnalysisError::Provider(ProviderError::Timeout) => {
                AppError::GatewayTimeout(err.to_string())
            }
            other => AppError::ExternalService(anyhow::Error::new(other)),
        }
    }
}

/// Completion shape requested in [`SYSTEM_PROMPT`]. Any `disclaimer` the
/// model adds is ignored.
#[derive(Debug, Deserialize)]
struct LlmAssessment {
    possible_diagnosis: String,
    confidence: f64,
    severity: Severity,
    description: String,
    recommendations: Vec<String>,
    emergency_care: String,
}

#[derive(Clone)]
pub struct SymptomAnalysisService {
    provider: Arc<dyn TextProvider>,
    params: GenerationParams,
    timeout: Duration,
}

impl SymptomAnalysisService {
    pub fn new(provider: Arc<dyn TextProvider>, temperature: f32, timeout: Duration) -> Self {
        Self {
            provider,
            params: GenerationParams {
                temperature: Some(temperature),
                json_output: true,
            },
            timeout,
        }
    }

    #[tracing::instrument(skip_all, fields(model = self.provider.model(), symptoms_len = symptoms.len()))]
    pub async fn analyze(&self, symptoms: &str) -> Result<SymptomAnalysis, SymptomAnalysisError> {
        let start = Instant::now();
        let result = self.call_and_parse(symptoms).await;

        let outcome = match &result {
            Ok(_) => LlmOutcome::Success,
            Err(e) => e.outcome(),
        };
        metrics::record_llm_call(outcome, start.elapsed());

        match &result {
            Ok(analysis) => tracing::info!(
                severity = %analysis.assessment.severity,
                confidence = analysis.assessment.confidence.value(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Symptoms analysed"
            ),
            Err(e) => tracing::warn!(
                error = %e,
                outcome = outcome.as_str(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Symptom analysis failed"
            ),
        }

        result
    }

    async fn call_and_parse(&self, symptoms: &str) -> Result<SymptomAnalysis, SymptomAnalysisError> {
        let prompt = build_prompt(symptoms);

        let response = tokio::time::timeout(self.timeout, self.provider.generate(&prompt, &self.params))
            .await
            .map_err(|_| SymptomAnalysisError::Timeout(self.timeout))??;

        if response.finish_reason == FinishReason::Length {
            tracing::debug!(
                output_tokens = response.output_tokens,
                "LLM response truncated at token limit"
            );
        }

        let text = response
            .text
            .filter(|t| !t.trim().is_empty())
            .ok_or(SymptomAnalysisError::EmptyResponse)?;

        parse_assessment(&text)
    }
}

fn build_prompt(symptoms: &str) -> String {
    format!("{}\n\nUser symptoms: {}", SYSTEM_PROMPT, symptoms)
}

/// Remove a surrounding markdown code fence (```json ... ```), if any.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    // Drop the language tag on the opening line
    match inner.split_once('\n') {
        Some((tag, body)) if !tag.trim().contains('{') => body.trim(),
        _ => inner.trim(),
    }
}

fn parse_assessment(text: &str) -> Result<SymptomAnalysis, SymptomAnalysisError> {
    let raw: LlmAssessment = serde_json::from_str(strip_code_fence(text))
        .map_err(|e| SymptomAnalysisError::InvalidOutput(e.to_string()))?;

    let possible_diagnosis = raw.possible_diagnosis.trim().to_string();
    if possible_diagnosis.is_empty() {
        return Err(SymptomAnalysisError::InvalidOutput(
            "possible_diagnosis is blank".to_string(),
        ));
    }

    let description = raw.description.trim().to_string();
    if description.is_empty() {
        return Err(SymptomAnalysisError::InvalidOutput(
            "description is blank".to_string(),
        ));
    }

    let confidence = Confidence::from_percent(raw.confidence).ok_or_else(|| {
        SymptomAnalysisError::InvalidOutput(format!(
            "confidence {} outside [0, 100]",
            raw.confidence
        ))
    })?;

    Ok(SymptomAnalysis {
        assessment: Assessment {
            possible_diagnosis,
            confidence,
            severity: raw.severity,
            description,
            recommendations: raw.recommendations,
            emergency_care: raw.emergency_care,
            disclaimer: SYMPTOM_DISCLAIMER.to_string(),
        },
        referral: None,
    })
}

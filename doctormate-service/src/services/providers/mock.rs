//! Mock provider implementation for testing.

use super::{FinishReason, GenerationParams, ProviderError, ProviderResponse, TextProvider};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
enum MockBehaviour {
    Respond(String),
    Fail(String),
    Empty,
}

/// Mock text provider returning a canned response.
pub struct MockTextProvider {
    behaviour: MockBehaviour,
    delay: Duration,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

impl MockTextProvider {
    /// Always answer with `text`.
    pub fn responding(text: impl Into<String>) -> Self {
        Self::with(MockBehaviour::Respond(text.into()))
    }

    /// Always fail with an API error.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with(MockBehaviour::Fail(message.into()))
    }

    /// Answer with no text at all.
    pub fn empty() -> Self {
        Self::with(MockBehaviour::Empty)
    }

    /// Sleep for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().ok().and_then(|p| p.clone())
    }

    fn with(behaviour: MockBehaviour) -> Self {
        Self {
            behaviour,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }
}

#[async_trait]
impl TextProvider for MockTextProvider {
    async fn generate(
        &self,
        prompt: &str,
        _params: &GenerationParams,
    ) -> Result<ProviderResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_prompt.lock() {
            *last = Some(prompt.to_string());
        }

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match &self.behaviour {
            MockBehaviour::Respond(text) => Ok(ProviderResponse {
                text: Some(text.clone()),
                input_tokens: prompt.len() as i32 / 4,
                output_tokens: text.len() as i32 / 4,
                finish_reason: FinishReason::Complete,
            }),
            MockBehaviour::Empty => Ok(ProviderResponse {
                text: None,
                input_tokens: prompt.len() as i32 / 4,
                output_tokens: 0,
                finish_reason: FinishReason::Complete,
            }),
            MockBehaviour::Fail(message) => Err(ProviderError::ApiError(message.clone())),
        }
    }

    fn model(&self) -> &str {
        "mock"
    }
}

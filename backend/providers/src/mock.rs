use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use explica_core::{ExplicaError, LlmProvider, LlmRequest, LlmResponse};

/// A mock LLM provider that returns scripted responses and records every
/// request it receives.
pub struct MockProvider {
    name: String,
    fixed_response: Option<String>,
    script: Mutex<VecDeque<Result<String, ExplicaError>>>,
    requests: Mutex<Vec<LlmRequest>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fixed_response: None,
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Response returned whenever the script is empty.
    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.fixed_response = Some(response.into());
        self
    }

    /// Queue one outcome; queued outcomes are consumed before the fixed response.
    pub fn push_outcome(&self, outcome: Result<String, ExplicaError>) {
        lock(&self.script).push_back(outcome);
    }

    pub fn requests(&self) -> Vec<LlmRequest> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, ExplicaError> {
        lock(&self.requests).push(request.clone());
        let scripted = lock(&self.script).pop_front();
        let content = match scripted {
            Some(outcome) => outcome?,
            None => self
                .fixed_response
                .clone()
                .unwrap_or_else(|| "Mock response".to_string()),
        };
        Ok(LlmResponse {
            content,
            provider: self.name.clone(),
            model: request.model.clone(),
            tokens_used: 0,
            latency_ms: 0,
        })
    }
}

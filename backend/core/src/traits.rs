use async_trait::async_trait;

use crate::error::ExplicaError;

/// A chat-completions backend able to see images (the external AI gateway).
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g., "ai-gateway", "mock").
    fn name(&self) -> &str;

    /// Send a completion request and return the response text.
    ///
    /// Implementations classify upstream failures into `RateLimited`,
    /// `QuotaExhausted` or `UpstreamFailure`; they never return empty content
    /// as a success.
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, ExplicaError>;
}

/// Request to an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub model: String,
    pub system_prompt: String,
    pub user_prompt: String,
    pub image: Option<InlineImage>,
    pub temperature: Option<f32>,
}

/// Image attached to a request as base64 data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    pub base64: String,
}

impl InlineImage {
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }
}

/// Response from an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub provider: String,
    pub model: String,
    pub tokens_used: u64,
    pub latency_ms: u64,
}

/// Image analysis: one structured six-section pass over an uploaded image.
use std::sync::Arc;

use tracing::{info, warn};

use explica_core::{
    AnalysisRequest, AnalysisResponse, ExplicaError, InlineImage, LlmProvider, LlmRequest,
    ParsedResponse,
};

use crate::prompt::{build_user_message, PromptBranch, SYSTEM_PROMPT};

/// Runs analysis requests against a vision-capable provider.
pub struct ImageAnalyzer {
    provider: Arc<dyn LlmProvider>,
    model: String,
}

impl ImageAnalyzer {
    pub fn new(provider: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    /// Build the provider request for an analysis; rejects requests without an image.
    pub fn build_request(&self, request: &AnalysisRequest) -> Result<LlmRequest, ExplicaError> {
        if request.image_base64.trim().is_empty() {
            return Err(ExplicaError::MissingInput("Nenhuma imagem fornecida".into()));
        }
        let user_prompt = build_user_message(
            request.user_context.as_deref(),
            request.previous_analysis.as_deref(),
            request.effective_detail_level(),
        );
        Ok(LlmRequest {
            model: self.model.clone(),
            system_prompt: SYSTEM_PROMPT.to_string(),
            user_prompt,
            image: Some(InlineImage {
                mime_type: request.mime_type.clone(),
                base64: request.image_base64.clone(),
            }),
            temperature: None,
        })
    }

    /// Analyse an image and derive its quick summary.
    ///
    /// A response that breaks the six-section format is still returned; only
    /// the summary degrades to an empty string.
    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResponse, ExplicaError> {
        let llm_request = self.build_request(request)?;
        let branch = PromptBranch::select(
            request.user_context.as_deref(),
            request.previous_analysis.as_deref(),
        );
        info!(
            provider = self.provider.name(),
            detail_level = %request.effective_detail_level(),
            branch = ?branch,
            "Calling AI gateway for image analysis"
        );

        let response = self.provider.complete(&llm_request).await?;

        let parsed = ParsedResponse::parse(&response.content);
        if let Err(violation) = parsed.validate() {
            warn!(error = %violation, "Analysis does not follow the structured format");
        }
        let quick_summary = parsed.summary();

        info!(
            latency_ms = response.latency_ms,
            tokens = response.tokens_used,
            has_summary = !quick_summary.is_empty(),
            "Image analysis completed successfully"
        );
        Ok(AnalysisResponse {
            analysis: response.content,
            quick_summary,
        })
    }
}

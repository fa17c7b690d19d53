//! Literal translation of analysis text and summaries.

use std::sync::Arc;

use tracing::info;

use explica_core::{ExplicaError, LlmProvider, LlmRequest, TranslationRequest};

use crate::prompt::{language_name, translation_system_prompt};

pub struct Translator {
    provider: Arc<dyn LlmProvider>,
    model: String,
}

impl Translator {
    pub fn new(provider: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    pub async fn translate(&self, request: &TranslationRequest) -> Result<String, ExplicaError> {
        let target = request.target_language.trim();
        if request.text.trim().is_empty() || target.is_empty() {
            return Err(ExplicaError::MissingInput(
                "Texto e idioma de destino são obrigatórios".into(),
            ));
        }

        info!(target_language = %language_name(target), "Translating text");

        let response = self
            .provider
            .complete(&LlmRequest {
                model: self.model.clone(),
                system_prompt: translation_system_prompt(target),
                user_prompt: request.text.clone(),
                image: None,
                temperature: Some(0.0),
            })
            .await?;

        info!(latency_ms = response.latency_ms, "Translation completed successfully");
        Ok(response.content)
    }
}

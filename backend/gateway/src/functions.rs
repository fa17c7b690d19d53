//! Handlers for `POST /functions/v1/analyze-image` and `POST /functions/v1/translate`.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use tracing::{error, info_span, warn, Instrument};
use uuid::Uuid;

use explica_core::{
    AnalysisRequest, AnalysisResponse, ExplicaError, TranslationRequest, TranslationResponse,
};

use crate::error::ApiError;
use crate::server::GatewayState;

fn not_configured() -> ExplicaError {
    error!("AI gateway API key not configured");
    ExplicaError::Configuration("AI gateway API key not configured".into())
}

fn invalid_body(rejection: JsonRejection) -> ExplicaError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        warn!(error = %rejection, "Rejected oversized request body");
        return ExplicaError::PayloadTooLarge;
    }
    warn!(error = %rejection, "Rejected malformed request body");
    ExplicaError::MissingInput("Corpo da requisição inválido".into())
}

/// Analyse an image (or answer a follow-up about it).
pub async fn analyze_image(
    State(state): State<GatewayState>,
    payload: Result<Json<AnalysisRequest>, JsonRejection>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::analysis(invalid_body(e)))?;

    if request.image_base64.trim().is_empty() {
        return Err(ApiError::analysis(ExplicaError::MissingInput(
            "Nenhuma imagem fornecida".into(),
        )));
    }
    let analyzer = state
        .analyzer
        .clone()
        .ok_or_else(|| ApiError::analysis(not_configured()))?;

    let span = info_span!(
        "analyze_image",
        request_id = %Uuid::new_v4(),
        follow_up = request.previous_analysis.is_some()
    );
    async move {
        match analyzer.analyze(&request).await {
            Ok(response) => Ok(Json(response)),
            Err(e) => {
                error!(error = %e, "Error in analyze-image function");
                Err(ApiError::analysis(e))
            }
        }
    }
    .instrument(span)
    .await
}

/// Translate a block of text into the target language.
pub async fn translate(
    State(state): State<GatewayState>,
    payload: Result<Json<TranslationRequest>, JsonRejection>,
) -> Result<Json<TranslationResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::translation(invalid_body(e)))?;

    if request.text.trim().is_empty() || request.target_language.trim().is_empty() {
        return Err(ApiError::translation(ExplicaError::MissingInput(
            "Texto e idioma de destino são obrigatórios".into(),
        )));
    }
    let translator = state
        .translator
        .clone()
        .ok_or_else(|| ApiError::translation(not_configured()))?;

    let span = info_span!(
        "translate",
        request_id = %Uuid::new_v4(),
        target_language = %request.target_language
    );
    async move {
        match translator.translate(&request).await {
            Ok(translated_text) => Ok(Json(TranslationResponse { translated_text })),
            Err(e) => {
                error!(error = %e, "Error in translate function");
                Err(ApiError::translation(e))
            }
        }
    }
    .instrument(span)
    .await
}

/// Pre-flight requests that bypass the CORS layer still get an empty success.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

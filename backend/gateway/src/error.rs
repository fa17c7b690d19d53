//! Error responses for the backend functions.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use explica_core::{ErrorBody, ExplicaError};

/// An `ExplicaError` rendered as `{ "error": "..." }` with its status code.
#[derive(Debug)]
pub struct ApiError {
    pub error: ExplicaError,
    /// Message used for failures whose detail must stay server-side.
    failure_message: &'static str,
}

impl ApiError {
    pub fn analysis(error: ExplicaError) -> Self {
        Self {
            error,
            failure_message: "Erro ao processar a imagem",
        }
    }

    pub fn translation(error: ExplicaError) -> Self {
        Self {
            error,
            failure_message: "Erro ao traduzir",
        }
    }

    fn message(&self) -> String {
        match &self.error {
            ExplicaError::UpstreamFailure(_) | ExplicaError::ContractViolation(_) => {
                self.failure_message.to_string()
            }
            other => other.user_message(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.error.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorBody {
            error: self.message(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hides_upstream_detail() {
        let err = ApiError::translation(ExplicaError::UpstreamFailure("HTTP 503: internal".into()));
        assert_eq!(err.message(), "Erro ao traduzir");
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn keeps_quota_status() {
        let err = ApiError::analysis(ExplicaError::QuotaExhausted);
        assert_eq!(err.into_response().status(), StatusCode::PAYMENT_REQUIRED);
    }
}

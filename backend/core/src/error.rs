use thiserror::Error;

/// Error taxonomy shared by the gateway functions and the client orchestrator.
///
/// Every variant carries a fixed HTTP status and a user-facing message. Raw
/// upstream text is only ever kept for logging, never shown to the user.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExplicaError {
    /// A required field was absent; the request never reaches the upstream.
    /// The payload is the user-facing explanation.
    #[error("missing input: {0}")]
    MissingInput(String),

    /// The request body exceeds the functions' size limit.
    #[error("payload too large")]
    PayloadTooLarge,

    #[error("rate limited by upstream")]
    RateLimited,

    #[error("upstream quota exhausted")]
    QuotaExhausted,

    /// Any other non-2xx or malformed upstream answer. The payload is the
    /// internal detail (status, body) for logs.
    #[error("upstream failure: {0}")]
    UpstreamFailure(String),

    /// A 2xx answer that does not follow the six-section format.
    #[error("response contract violated: {0}")]
    ContractViolation(String),

    /// A session action was invoked without the state it needs.
    #[error("session precondition failed: {0}")]
    SessionPrecondition(String),

    #[error("an analysis request is already pending")]
    Busy,

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl ExplicaError {
    /// HTTP status used on the wire for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissingInput(_) => 400,
            Self::PayloadTooLarge => 413,
            Self::RateLimited => 429,
            Self::QuotaExhausted => 402,
            Self::SessionPrecondition(_) | Self::Busy => 409,
            Self::UpstreamFailure(_) | Self::ContractViolation(_) | Self::Configuration(_) => 500,
        }
    }

    /// Message safe to show to the end user.
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingInput(msg) | Self::SessionPrecondition(msg) => msg.clone(),
            Self::PayloadTooLarge => {
                "A imagem é grande demais. Envie uma imagem menor.".into()
            }
            Self::RateLimited => {
                "Limite de requisições excedido. Tente novamente em alguns minutos.".into()
            }
            Self::QuotaExhausted => "Créditos insuficientes. Adicione créditos à sua conta.".into(),
            Self::UpstreamFailure(_) => "Erro ao processar a solicitação.".into(),
            Self::ContractViolation(_) => "Resumo rápido indisponível para esta análise.".into(),
            Self::Busy => "Aguarde a conclusão da análise em andamento.".into(),
            Self::Configuration(_) => "Configuração do servidor incompleta".into(),
        }
    }

    /// Classify a non-2xx answer from one of the backend functions.
    ///
    /// `message` is the `error` field of the response body, if any. It is
    /// only surfaced for 400, which our own functions produce.
    pub fn from_status(status: u16, message: Option<String>) -> Self {
        match status {
            400 => Self::MissingInput(
                message.unwrap_or_else(|| "Dados obrigatórios ausentes".to_string()),
            ),
            402 => Self::QuotaExhausted,
            413 => Self::PayloadTooLarge,
            429 => Self::RateLimited,
            other => Self::UpstreamFailure(format!(
                "HTTP {other}: {}",
                message.unwrap_or_default()
            )),
        }
    }

    /// Whether simply re-issuing the same request later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited | Self::UpstreamFailure(_) | Self::Busy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_gateway_statuses() {
        assert_eq!(ExplicaError::from_status(429, None), ExplicaError::RateLimited);
        assert_eq!(ExplicaError::from_status(402, Some("x".into())), ExplicaError::QuotaExhausted);
        assert_eq!(ExplicaError::from_status(413, None), ExplicaError::PayloadTooLarge);
        assert_eq!(
            ExplicaError::from_status(400, Some("Nenhuma imagem fornecida".into())),
            ExplicaError::MissingInput("Nenhuma imagem fornecida".into())
        );
        assert!(matches!(
            ExplicaError::from_status(503, Some("boom".into())),
            ExplicaError::UpstreamFailure(_)
        ));
    }

    #[test]
    fn upstream_detail_never_reaches_user() {
        let err = ExplicaError::UpstreamFailure("HTTP 500: secret stack trace".into());
        assert!(!err.user_message().contains("secret"));
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn quota_is_not_retryable() {
        assert!(!ExplicaError::QuotaExhausted.is_retryable());
        assert!(ExplicaError::RateLimited.is_retryable());
    }
}

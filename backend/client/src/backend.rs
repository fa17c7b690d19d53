//! Access to the two backend functions.

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error};

use explica_core::{
    AnalysisRequest, AnalysisResponse, ErrorBody, ExplicaError, TranslationRequest,
    TranslationResponse,
};

/// The analysis and translation functions as seen by the orchestrator.
#[async_trait]
pub trait FunctionsBackend: Send + Sync {
    async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisResponse, ExplicaError>;

    async fn translate(
        &self,
        request: TranslationRequest,
    ) -> Result<TranslationResponse, ExplicaError>;
}

/// Calls the functions over HTTP, passing the publishable key as a bearer token.
pub struct HttpBackend {
    client: Client,
    base_url: String,
    publishable_key: Option<String>,
}

impl HttpBackend {
    /// `base_url` is the functions root, e.g. `http://localhost:8787/functions/v1`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            publishable_key: None,
        }
    }

    pub fn with_publishable_key(mut self, key: impl Into<String>) -> Self {
        self.publishable_key = Some(key.into());
        self
    }

    async fn call<B, R>(&self, function: &str, body: &B) -> Result<R, ExplicaError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, function);
        debug!(url = %url, "Calling backend function");

        let mut request = self.client.post(&url).json(body);
        if let Some(key) = &self.publishable_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            error!(function, error = %e, "Backend function unreachable");
            ExplicaError::UpstreamFailure(format!("{function}: {e}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .ok()
                .map(|body| body.error);
            error!(function, status = %status, "Backend function failed");
            return Err(ExplicaError::from_status(status.as_u16(), message));
        }

        response.json::<R>().await.map_err(|e| {
            error!(function, error = %e, "Malformed backend response");
            ExplicaError::UpstreamFailure(format!("{function}: malformed response: {e}"))
        })
    }
}

#[async_trait]
impl FunctionsBackend for HttpBackend {
    async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisResponse, ExplicaError> {
        self.call("analyze-image", &request).await
    }

    async fn translate(
        &self,
        request: TranslationRequest,
    ) -> Result<TranslationResponse, ExplicaError> {
        self.call("translate", &request).await
    }
}

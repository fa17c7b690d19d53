use std::time::Instant;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use explica_core::{ExplicaError, LlmProvider, LlmRequest, LlmResponse};
use explica_logging::{redact_sensitive_data, truncate_for_log};

pub const DEFAULT_BASE_URL: &str = "https://ai.gateway.lovable.dev/v1";
pub const DEFAULT_MODEL: &str = "google/gemini-2.5-flash";

/// Provider for any OpenAI-compatible `/chat/completions` gateway.
pub struct OpenAiCompatProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiCompatProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: MessageContent,
}

#[derive(Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    total_tokens: Option<u64>,
}

fn build_messages(request: &LlmRequest) -> Vec<ChatMessage> {
    let mut messages = Vec::new();
    if !request.system_prompt.is_empty() {
        messages.push(ChatMessage {
            role: "system",
            content: MessageContent::Text(request.system_prompt.clone()),
        });
    }
    let content = match &request.image {
        Some(image) => MessageContent::Parts(vec![
            ContentPart::Text {
                text: request.user_prompt.clone(),
            },
            ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: image.data_url(),
                },
            },
        ]),
        None => MessageContent::Text(request.user_prompt.clone()),
    };
    messages.push(ChatMessage {
        role: "user",
        content,
    });
    messages
}

/// Map a non-success gateway status onto the error taxonomy.
fn classify_status(status: StatusCode, body: &str) -> ExplicaError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => {
            warn!("AI gateway rate limit exceeded");
            ExplicaError::RateLimited
        }
        StatusCode::PAYMENT_REQUIRED => {
            warn!("AI gateway reports exhausted credits");
            ExplicaError::QuotaExhausted
        }
        other => {
            let body = truncate_for_log(&redact_sensitive_data(body), 2000);
            error!(status = %other, body = %body, "AI gateway error");
            ExplicaError::UpstreamFailure(format!("AI gateway returned {other}"))
        }
    }
}

/// Text of `choices[0].message.content` and the token count. Absent or blank
/// content is not a valid answer.
fn extract_content(response: ChatResponse) -> Result<(String, u64), ExplicaError> {
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| {
            error!("No content in AI response");
            ExplicaError::UpstreamFailure("invalid AI response".into())
        })?;
    let tokens_used = response.usage.and_then(|u| u.total_tokens).unwrap_or(0);
    Ok((content, tokens_used))
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        "ai-gateway"
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, ExplicaError> {
        let start = Instant::now();

        let body = ChatRequest {
            model: request.model.clone(),
            messages: build_messages(request),
            temperature: request.temperature,
        };

        debug!(
            model = %request.model,
            with_image = request.image.is_some(),
            "Sending request to AI gateway"
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "AI gateway HTTP request failed");
                ExplicaError::UpstreamFailure(format!("request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &error_body));
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse AI gateway response");
            ExplicaError::UpstreamFailure(format!("malformed response: {e}"))
        })?;

        let (content, tokens_used) = extract_content(chat_response)?;

        Ok(LlmResponse {
            content,
            provider: self.name().to_string(),
            model: request.model.clone(),
            tokens_used,
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}

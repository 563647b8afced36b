// ============================================================================
// Vault Infrastructure - OpenAI-compatible Completion Client
// File: crates/vault-infrastructure/src/completion/openai.rs
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, error, warn};

use vault_core::error::DomainError;
use vault_core::ports::{CompletionClient, CompletionRequest, CompletionResponse};
use vault_shared::config::ChatSettings;

/// Talks to any `/chat/completions` endpoint speaking the OpenAI wire format
/// (OpenRouter by default).
pub struct OpenAiCompletionClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    referer: Option<String>,
    title: Option<String>,
}

impl OpenAiCompletionClient {
    pub fn new(settings: &ChatSettings) -> Result<Self, DomainError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()
            .map_err(|e| DomainError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        let api_key = settings.api_key.clone().filter(|k| !k.trim().is_empty());
        if api_key.is_none() {
            warn!("Chat API key not set, chat completions will be unavailable");
        }

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key,
            referer: settings.referer.clone(),
            title: settings.title.clone(),
        })
    }
}

fn upstream_message(body: &Value, status: StatusCode) -> String {
    body.pointer("/error/message")
        .and_then(Value::as_str)
        .map(String::from)
        .unwrap_or_else(|| format!("Completion API returned {}", status))
}

#[async_trait]
impl CompletionClient for OpenAiCompletionClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, DomainError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            DomainError::UpstreamUnavailable("Chat completion API key is not configured".into())
        })?;

        let mut builder = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(request);
        if let Some(referer) = &self.referer {
            builder = builder.header("HTTP-Referer", referer);
        }
        if let Some(title) = &self.title {
            builder = builder.header("X-Title", title);
        }

        debug!(model = %request.model, "Calling completion API");
        let response = builder.send().await.map_err(|e| {
            error!("Completion API request failed: {}", e);
            if e.is_timeout() || e.is_connect() {
                DomainError::UpstreamUnavailable("Completion API is unreachable".into())
            } else {
                DomainError::Upstream(format!("Completion API request failed: {}", e))
            }
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| DomainError::Upstream(format!("Failed to read completion response: {}", e)))?;
        let body: Value = serde_json::from_str(&text).unwrap_or(Value::Null);

        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!("Completion API rate limited the request");
            return Err(DomainError::RateLimited(
                "Rate limit exceeded. Please try again later.".into(),
            ));
        }
        if !status.is_success() {
            let message = upstream_message(&body, status);
            error!(%status, "Completion API error: {}", message);
            return Err(DomainError::Upstream(message));
        }
        if body.is_null() {
            return Err(DomainError::Upstream("Completion API returned a non-JSON body".into()));
        }

        let content = body
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(String::from);
        Ok(CompletionResponse { content, raw: body })
    }
}

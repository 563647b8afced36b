//! Chat completion port

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::domain::ChatTurn;
use crate::error::DomainError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatTurn>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResponse {
    /// First choice's message content, if the upstream returned one.
    pub content: Option<String>,
    /// Upstream body, passed through to the caller.
    pub raw: Value,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, DomainError>;
}

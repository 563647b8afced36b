// ============================================================================
// Vault Core - Chat Assistant Gateway
// File: crates/vault-core/src/services/chat_service.rs
// ============================================================================
//! Forwards conversations to the completion API and keeps chat sessions.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

use vault_shared::config::ChatSettings;
use vault_shared::constants::{DEFAULT_CHAT_MAX_TOKENS, DEFAULT_CHAT_TEMPERATURE};

use crate::domain::{
    AuthUser, ChatMessage, ChatRole, ChatSession, ChatSessionDetail, ChatSessionSummary,
    ChatTurn, Document,
};
use crate::error::DomainError;
use crate::permissions::{self, Capability};
use crate::ports::{CompletionClient, CompletionRequest};
use crate::repositories::{ChatRepository, DocumentRepository, FundRepository};

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChatCompletionInput {
    pub model: Option<String>,

    #[validate(length(min = 1, message = "At least one message is required"))]
    pub messages: Vec<ChatTurn>,

    #[validate(range(min = 0.0, max = 2.0, message = "Temperature must be between 0 and 2"))]
    pub temperature: Option<f32>,

    #[serde(alias = "max_tokens")]
    #[validate(range(min = 1, message = "maxTokens must be at least 1"))]
    pub max_tokens: Option<u32>,

    /// Documents whose metadata primes the conversation.
    #[serde(default, alias = "document_ids")]
    pub document_ids: Vec<Uuid>,

    /// Session the last user turn and the reply are saved to.
    #[serde(alias = "session_id")]
    pub session_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct ChatOptions {
    pub default_model: String,
    pub models: Vec<String>,
}

impl From<&ChatSettings> for ChatOptions {
    fn from(settings: &ChatSettings) -> Self {
        Self {
            default_model: settings.default_model.clone(),
            models: settings.models.clone(),
        }
    }
}

pub struct ChatService {
    chat_repo: Arc<dyn ChatRepository>,
    document_repo: Arc<dyn DocumentRepository>,
    fund_repo: Arc<dyn FundRepository>,
    client: Arc<dyn CompletionClient>,
    options: ChatOptions,
}

impl ChatService {
    pub fn new(
        chat_repo: Arc<dyn ChatRepository>,
        document_repo: Arc<dyn DocumentRepository>,
        fund_repo: Arc<dyn FundRepository>,
        client: Arc<dyn CompletionClient>,
        options: ChatOptions,
    ) -> Self {
        Self { chat_repo, document_repo, fund_repo, client, options }
    }

    pub fn models(&self) -> &[String] {
        &self.options.models
    }

    /// Returns the upstream response body unchanged.
    pub async fn complete(&self, input: ChatCompletionInput, actor: &AuthUser) -> Result<Value, DomainError> {
        input.validate()?;

        // Ownership is checked before spending an upstream call
        if let Some(session_id) = &input.session_id {
            self.owned_session(session_id, actor).await?;
        }

        let mut messages = Vec::with_capacity(input.messages.len() + 1);
        if !input.document_ids.is_empty() {
            messages.push(self.document_context(&input.document_ids, actor).await?);
        }
        messages.extend(input.messages.iter().cloned());

        let request = CompletionRequest {
            model: input
                .model
                .clone()
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| self.options.default_model.clone()),
            messages,
            temperature: input.temperature.unwrap_or(DEFAULT_CHAT_TEMPERATURE),
            max_tokens: input.max_tokens.unwrap_or(DEFAULT_CHAT_MAX_TOKENS),
        };
        debug!(user_id = %actor.id, model = %request.model, "Chat completion with {} messages", request.messages.len());

        let response = self.client.complete(&request).await?;

        if let Some(session_id) = input.session_id {
            let mut turns = Vec::with_capacity(2);
            if let Some(last_user) = input.messages.iter().rev().find(|t| t.role == ChatRole::User) {
                turns.push(ChatMessage::new(session_id, last_user.clone()));
            }
            match &response.content {
                Some(content) => turns.push(ChatMessage::new(
                    session_id,
                    ChatTurn { role: ChatRole::Assistant, content: content.clone() },
                )),
                None => warn!(%session_id, "Completion carried no message content"),
            }
            if !turns.is_empty() {
                self.chat_repo.append_messages(&session_id, &turns).await?;
            }
        }

        Ok(response.raw)
    }

    async fn document_context(&self, ids: &[Uuid], actor: &AuthUser) -> Result<ChatTurn, DomainError> {
        let scope = if permissions::can(actor.role, Capability::ViewAllFunds) {
            None
        } else {
            Some(self.fund_repo.managed_fund_ids(&actor.id).await?)
        };

        let mut lines = Vec::with_capacity(ids.len());
        for (i, id) in ids.iter().enumerate() {
            let document = self
                .document_repo
                .find_by_id(id)
                .await?
                .ok_or_else(|| DomainError::not_found("Document", id))?;
            if matches!(&scope, Some(funds) if !funds.contains(&document.fund_id)) {
                return Err(DomainError::Forbidden("Document belongs to a fund you do not manage".into()));
            }
            let fund = self.fund_repo.find_by_id(&document.fund_id).await?;
            lines.push(format!("{}. {}", i + 1, describe(&document, fund.as_ref().map(|f| (f.name.as_str(), f.code.as_str())))));
        }

        Ok(ChatTurn::system(format!(
            "You are the Audit Vault assistant for fund compliance documents. \
             The user selected these documents as context:\n{}",
            lines.join("\n")
        )))
    }

    pub async fn list_sessions(&self, actor: &AuthUser) -> Result<Vec<ChatSessionSummary>, DomainError> {
        self.chat_repo.list_sessions(&actor.id).await
    }

    pub async fn create_session(&self, title: Option<String>, actor: &AuthUser) -> Result<ChatSession, DomainError> {
        let session = self.chat_repo.create_session(&ChatSession::new(actor.id, title)).await?;
        info!(session_id = %session.id, user_id = %actor.id, "Chat session created");
        Ok(session)
    }

    pub async fn get_session(&self, id: &Uuid, actor: &AuthUser) -> Result<ChatSessionDetail, DomainError> {
        let session = self.owned_session(id, actor).await?;
        let messages = self.chat_repo.messages(id).await?;
        Ok(ChatSessionDetail { session, messages })
    }

    pub async fn rename_session(&self, id: &Uuid, title: &str, actor: &AuthUser) -> Result<ChatSession, DomainError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(DomainError::Validation("Title is required".into()));
        }
        self.owned_session(id, actor).await?;
        self.chat_repo
            .rename_session(id, title)
            .await?
            .ok_or_else(|| DomainError::not_found("Chat session", id))
    }

    pub async fn delete_session(&self, id: &Uuid, actor: &AuthUser) -> Result<(), DomainError> {
        self.owned_session(id, actor).await?;
        if !self.chat_repo.delete_session(id).await? {
            return Err(DomainError::not_found("Chat session", id));
        }
        info!(session_id = %id, "Chat session deleted");
        Ok(())
    }

    async fn owned_session(&self, id: &Uuid, actor: &AuthUser) -> Result<ChatSession, DomainError> {
        let session = self
            .chat_repo
            .find_session(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Chat session", id))?;
        if session.user_id != actor.id {
            return Err(DomainError::Forbidden("Chat session belongs to another user".into()));
        }
        Ok(session)
    }
}

fn describe(document: &Document, fund: Option<(&str, &str)>) -> String {
    let fund = match fund {
        Some((name, code)) => format!("{} ({})", name, code),
        None => "unknown fund".to_string(),
    };
    format!(
        "\"{}\": {}, status {}, fund {}, period {} to {}",
        document.title,
        document.doc_type.as_str(),
        document.status.as_str(),
        fund,
        document.period_start.format("%Y-%m-%d"),
        document.period_end.format("%Y-%m-%d"),
    )
}

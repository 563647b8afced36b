//! Chat session repository trait (port)

use async_trait::async_trait;
use uuid::Uuid;
use crate::domain::{ChatMessage, ChatSession, ChatSessionSummary};
use crate::error::DomainError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// Most recently updated first.
    async fn list_sessions(&self, user_id: &Uuid) -> Result<Vec<ChatSessionSummary>, DomainError>;
    async fn create_session(&self, session: &ChatSession) -> Result<ChatSession, DomainError>;
    async fn find_session(&self, id: &Uuid) -> Result<Option<ChatSession>, DomainError>;
    /// Oldest first.
    async fn messages(&self, session_id: &Uuid) -> Result<Vec<ChatMessage>, DomainError>;
    async fn rename_session(&self, id: &Uuid, title: &str) -> Result<Option<ChatSession>, DomainError>;
    async fn delete_session(&self, id: &Uuid) -> Result<bool, DomainError>;
    /// Appends and bumps the session's `updated_at` in one transaction.
    async fn append_messages(&self, session_id: &Uuid, messages: &[ChatMessage]) -> Result<(), DomainError>;
}

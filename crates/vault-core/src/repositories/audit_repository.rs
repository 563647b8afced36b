//! Audit log repository trait (port)

use async_trait::async_trait;
use uuid::Uuid;
use crate::domain::{AuditHistoryEntry, AuditLogEntry, NewAuditEntry};
use crate::error::DomainError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuditRepository: Send + Sync {
    async fn append(&self, entry: &NewAuditEntry) -> Result<AuditLogEntry, DomainError>;
    /// Newest first, joined with the actor's current name and role.
    async fn history(&self, document_id: &Uuid) -> Result<Vec<AuditHistoryEntry>, DomainError>;
}

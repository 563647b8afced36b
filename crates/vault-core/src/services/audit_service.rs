//! Audit log writer

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error};
use uuid::Uuid;

use crate::domain::{AuditAction, AuditHistoryEntry, AuditLogEntry, NewAuditEntry};
use crate::error::DomainError;
use crate::repositories::AuditRepository;

/// Appends and reads immutable audit records. Failures are returned, never
/// swallowed.
pub struct AuditService {
    audit_repo: Arc<dyn AuditRepository>,
}

impl AuditService {
    pub fn new(audit_repo: Arc<dyn AuditRepository>) -> Self {
        Self { audit_repo }
    }

    pub async fn log_action(
        &self,
        user_id: Uuid,
        document_id: Uuid,
        action: AuditAction,
        details: Option<Value>,
    ) -> Result<AuditLogEntry, DomainError> {
        let entry = NewAuditEntry::new(user_id, document_id, action, details);
        let stored = self.audit_repo.append(&entry).await.map_err(|e| {
            error!(%document_id, action = action.as_str(), "Failed to write audit entry: {}", e);
            e
        })?;
        debug!(%document_id, action = action.as_str(), "Audit entry written");
        Ok(stored)
    }

    /// Newest first.
    pub async fn get_history(&self, document_id: &Uuid) -> Result<Vec<AuditHistoryEntry>, DomainError> {
        self.audit_repo.history(document_id).await
    }
}

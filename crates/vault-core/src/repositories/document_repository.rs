// ============================================================================
// Vault Core - Document Repository Port
// File: crates/vault-core/src/repositories/document_repository.rs
// ============================================================================
//! Document repository trait (port)
//!
//! Mutations that must be audited take the audit entry with them; an
//! implementation writes both in one transaction or neither.

use async_trait::async_trait;
use uuid::Uuid;
use crate::domain::{DocStatus, Document, DocumentQuery, DocumentSummary, NewAuditEntry};
use crate::error::DomainError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    async fn create_with_audit(
        &self,
        document: &Document,
        audit: &NewAuditEntry,
    ) -> Result<Document, DomainError>;

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Document>, DomainError>;

    /// Newest first.
    async fn list(&self, query: &DocumentQuery) -> Result<Vec<DocumentSummary>, DomainError>;

    /// Compare-and-set on `from`. Returns `None` when no row had id `id` and
    /// status `from`; nothing is written in that case.
    async fn update_status_with_audit(
        &self,
        id: &Uuid,
        from: DocStatus,
        to: DocStatus,
        audit: &NewAuditEntry,
    ) -> Result<Option<Document>, DomainError>;

    /// Hard delete. Audit entries go with the document. Returns whether a row existed.
    async fn delete(&self, id: &Uuid) -> Result<bool, DomainError>;
}

//! # Vault Core - Domain Module
//!
//! Domain entities for Audit Vault.

pub mod user;
pub mod fund;
pub mod document;
pub mod audit;
pub mod chat;

// Re-export all entities and enums
pub use user::{AuthUser, NewRegistration, User, UserRole, UserStatus};
pub use fund::{Fund, FundChanges, NewFund};
pub use document::{
    parse_period_date, DocStatus, DocType, Document, DocumentDetail, DocumentFilter,
    DocumentQuery, DocumentSummary, FilePayload, FundRef, NewDocument, UploaderRef,
};
pub use audit::{AuditAction, AuditActor, AuditHistoryEntry, AuditLogEntry, NewAuditEntry};
pub use chat::{
    ChatMessage, ChatRole, ChatSession, ChatSessionDetail, ChatSessionSummary, ChatTurn,
};

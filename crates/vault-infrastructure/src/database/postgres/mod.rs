//! PostgreSQL repository implementations

pub mod audit_repo_impl;
pub mod chat_repo_impl;
pub mod document_repo_impl;
pub mod fund_repo_impl;
pub mod user_repo_impl;

pub use audit_repo_impl::PgAuditRepository;
pub use chat_repo_impl::PgChatRepository;
pub use document_repo_impl::PgDocumentRepository;
pub use fund_repo_impl::PgFundRepository;
pub use user_repo_impl::PgUserRepository;

use tracing::error;
use vault_core::error::DomainError;

/// Maps a sqlx failure to a domain error, logging it with `context`.
/// Unique violations become `Conflict`.
pub(crate) fn db_error(context: &'static str) -> impl Fn(sqlx::Error) -> DomainError {
    move |e: sqlx::Error| {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                return DomainError::Conflict(format!("{}: duplicate value", context));
            }
            if db.is_foreign_key_violation() {
                return DomainError::Validation(format!("{}: referenced record does not exist", context));
            }
        }
        error!("Database error {}: {}", context, e);
        DomainError::Database(e.to_string())
    }
}

pub(crate) fn corrupt(column: &str, value: &str) -> DomainError {
    error!("Unexpected value {:?} in column {}", value, column);
    DomainError::Internal(format!("Unexpected value in column {}", column))
}

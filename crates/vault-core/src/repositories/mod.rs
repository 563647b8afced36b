//! Repository traits (ports)

pub mod user_repository;
pub mod fund_repository;
pub mod document_repository;
pub mod audit_repository;
pub mod chat_repository;

pub use user_repository::UserRepository;
pub use fund_repository::FundRepository;
pub use document_repository::DocumentRepository;
pub use audit_repository::AuditRepository;
pub use chat_repository::ChatRepository;

#[cfg(test)]
pub use user_repository::MockUserRepository;
#[cfg(test)]
pub use fund_repository::MockFundRepository;
#[cfg(test)]
pub use document_repository::MockDocumentRepository;
#[cfg(test)]
pub use audit_repository::MockAuditRepository;
#[cfg(test)]
pub use chat_repository::MockChatRepository;

//! Domain services (business logic)

pub mod audit_service;
pub mod auth_service;
pub mod chat_service;
pub mod document_service;
pub mod fund_service;
pub mod user_service;

pub use audit_service::AuditService;
pub use auth_service::{AuthService, LoginResult};
pub use chat_service::{ChatCompletionInput, ChatOptions, ChatService};
pub use document_service::{DocumentService, LifecyclePolicy};
pub use fund_service::FundService;
pub use user_service::UserService;

//! # Vault Infrastructure
//!
//! Adapters: PostgreSQL and in-memory repositories, blob stores and the
//! completion API client.

pub mod completion;
pub mod database;
pub mod storage;

pub use completion::OpenAiCompletionClient;
pub use database::{
    create_pool, run_migrations, MemoryDatabase, PgAuditRepository, PgChatRepository,
    PgDocumentRepository, PgFundRepository, PgUserRepository,
};
pub use storage::{LocalBlobStore, MemoryBlobStore};

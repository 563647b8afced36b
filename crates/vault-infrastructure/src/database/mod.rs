//! Database module (PostgreSQL and in-process adapters)

pub mod connection;
pub mod memory;
pub mod postgres;

pub use connection::{create_pool, run_migrations};
pub use memory::MemoryDatabase;
pub use postgres::{
    PgAuditRepository, PgChatRepository, PgDocumentRepository, PgFundRepository,
    PgUserRepository,
};

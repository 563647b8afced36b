//! In-process repositories for `database.driver = "memory"` and tests.
//!
//! One [`MemoryDatabase`] holds every table behind a single lock, so the
//! composite writes (document + audit entry) are atomic just like their
//! PostgreSQL counterparts.

mod tables;

pub use tables::MemoryDatabase;

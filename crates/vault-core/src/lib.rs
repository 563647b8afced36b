//! # Vault Core
//!
//! Domain entities, the role capability table, repository and port traits,
//! and the services implementing the document lifecycle.

pub mod domain;
pub mod error;
pub mod permissions;
pub mod ports;
pub mod repositories;
pub mod services;

pub use domain::*;
pub use error::DomainError;

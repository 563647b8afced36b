//! # Vault API
//!
//! HTTP handlers, the bearer-token extractor, error mapping and the router.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;

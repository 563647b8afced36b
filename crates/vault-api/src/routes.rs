// ============================================================================
// Vault API - Router
// File: crates/vault-api/src/routes.rs
// ============================================================================

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, patch, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, TraceLayer},
};
use tracing::warn;

use crate::handlers;
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let max_upload_bytes = state.config.app.max_upload_bytes;
    let cors = cors_layer(&state.config.app.cors_origins);

    // Public routes
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/register", post(handlers::auth::register));

    // Bearer-protected routes, the CurrentUser extractor does the check
    let protected_routes = Router::new()
        .route("/auth/profile", get(handlers::auth::profile))
        .route(
            "/documents",
            post(handlers::documents::create_document).get(handlers::documents::list_documents),
        )
        .route(
            "/documents/{id}",
            get(handlers::documents::get_document).delete(handlers::documents::delete_document),
        )
        .route("/documents/{id}/history", get(handlers::documents::document_history))
        .route("/documents/{id}/download", get(handlers::documents::download_document))
        .route("/documents/{id}/status", patch(handlers::documents::update_document_status))
        .route(
            "/funds",
            post(handlers::funds::create_fund).get(handlers::funds::list_funds),
        )
        .route(
            "/funds/{id}",
            get(handlers::funds::get_fund).patch(handlers::funds::update_fund),
        )
        .route("/users", get(handlers::users::list_users))
        .route("/users/{id}", get(handlers::users::get_user))
        .route(
            "/users/{id}/status",
            post(handlers::users::update_user_status).patch(handlers::users::update_user_status),
        )
        .route("/chat/completions", post(handlers::chat::completions))
        .route("/chat/models", get(handlers::chat::models))
        .route(
            "/chat/sessions",
            get(handlers::chat::list_sessions).post(handlers::chat::create_session),
        )
        .route(
            "/chat/sessions/{id}",
            get(handlers::chat::get_session)
                .patch(handlers::chat::rename_session)
                .delete(handlers::chat::delete_session),
        );

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

/// Empty origin list or `*` means any origin.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();
    base.allow_origin(parsed)
}

//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST API routes for login, refresh, logout and session validation
//! - Device registration and admin endpoints
//! - Session-cookie and bearer-token authentication middleware
//! - Cookie construction for the session/refresh pair

pub mod cookies;
pub mod middleware;
pub mod routes;

use axum::Router;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use fieldgate_shared::JwtService;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<DatabaseConnection>,
    /// JWT service for access token operations.
    pub jwt_service: Arc<JwtService>,
    /// Whether cookies carry the `Secure` attribute.
    pub cookie_secure: bool,
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes_with_state(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

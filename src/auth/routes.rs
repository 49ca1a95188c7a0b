//! Authentication routes

use axum::{
    routing::get,
    Router,
};

use super::handlers;

/// Creates and returns the authentication router
///
/// # Routes
/// (`POST /users` registration is mounted by the users router)
/// - `GET /me` - Current account
/// - `GET /role/:email` - Role lookup (self or admin)
pub fn auth_routes() -> Router {
    Router::new()
        .route("/me", get(handlers::me_handler))
        .route("/role/:email", get(handlers::role_handler))
}

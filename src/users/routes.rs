use super::handlers;
use crate::auth::handlers::register_handler;
use axum::{
    routing::{get, patch},
    Router,
};

/// Creates the user administration router
///
/// `POST /users` (registration) shares the path and lives here too.
pub fn users_routes() -> Router {
    Router::new()
        .route("/users", get(handlers::list_users).post(register_handler))
        .route("/users/:id/status", patch(handlers::update_status))
        .route("/users/:id/role", patch(handlers::update_role))
}

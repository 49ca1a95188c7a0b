use super::handlers;
use axum::{
    routing::{get, patch},
    Router,
};

/// Creates the donation request router
pub fn requests_routes() -> Router {
    Router::new()
        .route(
            "/requests",
            get(handlers::list_requests).post(handlers::create_request),
        )
        .route("/requests/pending", get(handlers::list_pending))
        .route("/requests/search", get(handlers::search_pending))
        .route("/requests/stats", get(handlers::request_stats))
        .route(
            "/requests/:id",
            get(handlers::get_request)
                .put(handlers::update_request)
                .delete(handlers::delete_request),
        )
        .route("/requests/:id/status", patch(handlers::change_status))
}

use super::handlers;
use axum::{
    routing::{get, patch, post},
    Router,
};

/// Creates the funding router
pub fn fundings_routes() -> Router {
    Router::new()
        .route(
            "/create-checkout-session",
            post(handlers::create_checkout_session),
        )
        .route(
            "/checkout-session/:session_id",
            get(handlers::get_checkout_session),
        )
        .route("/payment-success", patch(handlers::commit_payment))
        .route("/fundings", get(handlers::list_fundings))
}

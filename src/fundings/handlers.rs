use super::models::{CheckoutPayload, CommitQuery, FundingListQuery};
use super::services::FundingsService;
use crate::auth::AuthedUser;
use crate::common::{ApiError, AppState};
use axum::{
    extract::{Extension, Path, Query},
    Json,
};
use donation_domain::{CheckoutRedirect, CheckoutSession, CommitReceipt, FundingPage};
use std::sync::Arc;
use tokio::sync::RwLock;

async fn service(state: &Arc<RwLock<AppState>>) -> FundingsService {
    let app_state = state.read().await;
    FundingsService::new(
        app_state.db.clone(),
        app_state.checkout.clone(),
        app_state.config.clone(),
    )
}

/// POST /create-checkout-session
///
/// # Request Body
/// ```json
/// { "name": "Rahim", "email": "rahim@example.com", "amount": 500 }
/// ```
///
/// # Response
/// ```json
/// { "url": "https://checkout.stripe.com/...", "session_id": "cs_..." }
/// ```
pub async fn create_checkout_session(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    user: AuthedUser,
    Json(payload): Json<CheckoutPayload>,
) -> Result<Json<CheckoutRedirect>, ApiError> {
    Ok(Json(service(&state).await.create_checkout(&user, &payload).await?))
}

/// GET /checkout-session/:session_id
pub async fn get_checkout_session(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    user: AuthedUser,
    Path(session_id): Path<String>,
) -> Result<Json<CheckoutSession>, ApiError> {
    Ok(Json(service(&state).await.get_session(&user, &session_id).await?))
}

/// PATCH /payment-success?session_id=...
///
/// Idempotent: repeating the call for a recorded session returns
/// `{ "success": true, "created": false, ... }`.
pub async fn commit_payment(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    user: AuthedUser,
    Query(query): Query<CommitQuery>,
) -> Result<Json<CommitReceipt>, ApiError> {
    let session_id = query.session_id.unwrap_or_default();
    Ok(Json(service(&state).await.commit(&user, &session_id).await?))
}

/// GET /fundings
pub async fn list_fundings(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    user: AuthedUser,
    Query(query): Query<FundingListQuery>,
) -> Result<Json<FundingPage>, ApiError> {
    Ok(Json(service(&state).await.list(&user, &query).await?))
}

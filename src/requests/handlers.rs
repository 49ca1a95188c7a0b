// src/requests/handlers.rs

use super::models::{
    MessageResponse, PendingQuery, PendingSearchQuery, RequestListQuery, RequestPayload,
    RequestStats, StatusChange,
};
use super::services::RequestsService;
use crate::auth::AuthedUser;
use crate::common::{ApiError, AppState};
use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    Json,
};
use donation_domain::{DonationRequest, Page, RequestStatus};
use std::sync::Arc;
use tokio::sync::RwLock;

async fn service(state: &Arc<RwLock<AppState>>) -> RequestsService {
    let app_state = state.read().await;
    RequestsService::new(app_state.db.clone())
}

/// POST /requests
pub async fn create_request(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    user: AuthedUser,
    Json(payload): Json<RequestPayload>,
) -> Result<(StatusCode, Json<DonationRequest>), ApiError> {
    let request = service(&state).await.create(&user, payload).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// GET /requests - own requests, or all of them for volunteers/admins
pub async fn list_requests(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    user: AuthedUser,
    Query(query): Query<RequestListQuery>,
) -> Result<Json<Page<DonationRequest>>, ApiError> {
    Ok(Json(service(&state).await.list(&user, &query).await?))
}

/// GET /requests/:id
pub async fn get_request(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    _user: AuthedUser,
    Path(request_id): Path<String>,
) -> Result<Json<DonationRequest>, ApiError> {
    Ok(Json(service(&state).await.get(&request_id).await?))
}

/// PUT /requests/:id - owner edit while pending
pub async fn update_request(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    user: AuthedUser,
    Path(request_id): Path<String>,
    Json(payload): Json<RequestPayload>,
) -> Result<Json<DonationRequest>, ApiError> {
    Ok(Json(
        service(&state).await.update(&user, &request_id, payload).await?,
    ))
}

/// PATCH /requests/:id/status
pub async fn change_status(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    user: AuthedUser,
    Path(request_id): Path<String>,
    Json(body): Json<StatusChange>,
) -> Result<Json<DonationRequest>, ApiError> {
    let next = body
        .status
        .parse::<RequestStatus>()
        .map_err(ApiError::ValidationError)?;
    Ok(Json(
        service(&state).await.change_status(&user, &request_id, next).await?,
    ))
}

/// DELETE /requests/:id - owner delete while pending
pub async fn delete_request(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    user: AuthedUser,
    Path(request_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    service(&state).await.delete(&user, &request_id).await?;
    Ok(Json(MessageResponse {
        success: true,
        message: "Donation request deleted".to_string(),
    }))
}

/// GET /requests/pending - public
pub async fn list_pending(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    Query(query): Query<PendingQuery>,
) -> Result<Json<Page<DonationRequest>>, ApiError> {
    Ok(Json(service(&state).await.list_pending(&query).await?))
}

/// GET /requests/search - public
pub async fn search_pending(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    Query(query): Query<PendingSearchQuery>,
) -> Result<Json<Page<DonationRequest>>, ApiError> {
    Ok(Json(service(&state).await.search_pending(&query).await?))
}

/// GET /requests/stats - volunteers and admins
pub async fn request_stats(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    user: AuthedUser,
) -> Result<Json<RequestStats>, ApiError> {
    user.ensure_privileged()?;
    let counts = service(&state).await.status_counts().await?;
    Ok(Json(RequestStats::from(counts)))
}

use super::models::{RoleUpdate, StatusUpdate, UserListQuery};
use super::services::UsersService;
use crate::auth::{AuthedUser, User};
use crate::common::{ApiError, AppState};
use axum::{
    extract::{Extension, Path, Query},
    Json,
};
use donation_domain::{AccountStatus, Page, Role};
use std::sync::Arc;
use tokio::sync::RwLock;

/// GET /users - Paginated account list (admin)
pub async fn list_users(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    user: AuthedUser,
    Query(query): Query<UserListQuery>,
) -> Result<Json<Page<User>>, ApiError> {
    user.ensure_admin()?;

    let app_state = state.read().await;
    let service = UsersService::new(app_state.db.clone());
    Ok(Json(service.list_users(&query).await?))
}

/// PATCH /users/:id/status - Block or unblock (admin)
pub async fn update_status(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    user: AuthedUser,
    Path(user_id): Path<String>,
    Json(body): Json<StatusUpdate>,
) -> Result<Json<User>, ApiError> {
    let status = body.status.parse::<AccountStatus>().map_err(ApiError::ValidationError)?;

    let app_state = state.read().await;
    let service = UsersService::new(app_state.db.clone());
    Ok(Json(service.set_status(&user, &user_id, status).await?))
}

/// PATCH /users/:id/role - Promote (admin)
pub async fn update_role(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    user: AuthedUser,
    Path(user_id): Path<String>,
    Json(body): Json<RoleUpdate>,
) -> Result<Json<User>, ApiError> {
    let role = body
        .role
        .parse::<Role>()
        .map_err(|e| ApiError::ValidationError(e.to_string()))?;

    let app_state = state.read().await;
    let service = UsersService::new(app_state.db.clone());
    Ok(Json(service.set_role(&user, &user_id, role).await?))
}

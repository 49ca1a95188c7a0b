//! Authentication handlers

use axum::{
    extract::{Extension, Json, Path},
    http::StatusCode,
};
use donation_domain::Role;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use super::extractors::{find_user_by_provider_id, AuthedIdentity, AuthedUser};
use super::models::{RegisterPayload, RoleResponse, User};
use crate::common::validation::is_plausible_email;
use crate::common::{generate_user_id, safe_email_log, ApiError, AppConfig, AppState, ValidationResult};

/// Registers the token's identity, or returns the existing account.
///
/// Returns the user and whether a row was created.
pub async fn register_user(
    db: &SqlitePool,
    config: &AppConfig,
    identity: &AuthedIdentity,
    payload: RegisterPayload,
) -> Result<(User, bool), ApiError> {
    if let Some(existing) = find_user_by_provider_id(db, &identity.provider_id).await? {
        debug!(user_id = %existing.id, "Registration skipped: account exists");
        return Ok((existing, false));
    }

    let email = identity
        .email
        .clone()
        .or(payload.email)
        .map(|e| e.trim().to_string())
        .unwrap_or_default();

    let name = payload
        .name
        .or_else(|| identity.name.clone())
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());

    let mut validation = ValidationResult::new();
    if !is_plausible_email(&email) {
        validation.add_error("email", "must be a valid email address");
    }
    validation.optional_text("name", name.as_deref(), 100);
    validation.optional_text("avatar", payload.avatar.as_deref(), 500);
    validation.optional_text("district", payload.district.as_deref(), 100);
    validation.optional_text("upazila", payload.upazila.as_deref(), 100);
    validation.into_result()?;

    let role = if config.is_bootstrap_admin(&email) {
        Role::Admin
    } else {
        Role::Donor
    };
    let user_id = generate_user_id();

    let inserted = sqlx::query(
        r#"
        INSERT INTO users (id, provider_id, email, name, avatar, blood_group, district, upazila, role, status)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 'active')
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(&user_id)
    .bind(&identity.provider_id)
    .bind(&email)
    .bind(&name)
    .bind(&payload.avatar)
    .bind(payload.blood_group.map(|g| g.as_str()))
    .bind(&payload.district)
    .bind(&payload.upazila)
    .bind(role.as_str())
    .execute(db)
    .await
    .map_err(|e| {
        error!(error = %e, email = %safe_email_log(&email), "Failed to insert user");
        ApiError::DatabaseError(e)
    })?;

    if inserted.rows_affected() == 0 {
        // A concurrent registration of the same identity won the race.
        if let Some(existing) = find_user_by_provider_id(db, &identity.provider_id).await? {
            return Ok((existing, false));
        }
        warn!(email = %safe_email_log(&email), "Registration rejected: email already registered");
        return Err(ApiError::Conflict(
            "This email is already registered to another account".into(),
        ));
    }

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(&user_id)
        .fetch_one(db)
        .await
        .map_err(ApiError::DatabaseError)?;

    info!(
        user_id = %user.id,
        email = %safe_email_log(&user.email),
        role = %role,
        "User registered"
    );
    Ok((user, true))
}

/// POST /users
///
/// # Response
/// `201` with `{ "user": {...}, "created": true }` for a new account,
/// `200` with `created: false` when the identity was already registered.
pub async fn register_handler(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    identity: AuthedIdentity,
    Json(payload): Json<RegisterPayload>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let state = state_lock.read().await.clone();
    let (user, created) = register_user(&state.db, &state.config, &identity, payload).await?;

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((
        status,
        Json(serde_json::json!({ "user": user, "created": created })),
    ))
}

/// GET /me
pub async fn me_handler(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let state = state_lock.read().await.clone();

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(&authed.id)
        .fetch_one(&state.db)
        .await
        .map_err(ApiError::DatabaseError)?;

    Ok(Json(serde_json::json!({ "user": user })))
}

pub async fn lookup_role(db: &SqlitePool, email: &str) -> Result<Option<Role>, ApiError> {
    let row: Option<(String,)> = sqlx::query_as("SELECT role FROM users WHERE email = ?")
        .bind(email.trim())
        .fetch_optional(db)
        .await
        .map_err(ApiError::DatabaseError)?;

    Ok(row.map(|(role,)| Role::parse_or_default(&role)))
}

/// GET /role/:email
///
/// Callers may look up their own role; admins may look up anyone's.
pub async fn role_handler(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(email): Path<String>,
) -> Result<Json<RoleResponse>, ApiError> {
    let state = state_lock.read().await.clone();

    if !authed.email.eq_ignore_ascii_case(email.trim()) && !authed.is_admin() {
        warn!(
            user_id = %authed.id,
            target = %safe_email_log(&email),
            "Role lookup for another account denied"
        );
        return Err(ApiError::Forbidden("You can only look up your own role".into()));
    }

    match lookup_role(&state.db, &email).await? {
        Some(role) => {
            debug!(email = %safe_email_log(&email), role = %role, "Role resolved");
            Ok(Json(RoleResponse { role }))
        }
        None => Err(ApiError::NotFound("User not found".into())),
    }
}

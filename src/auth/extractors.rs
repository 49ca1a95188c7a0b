//! Authentication extractors for Axum

use async_trait::async_trait;
use axum::{
    extract::{Extension, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use donation_domain::{AccountStatus, RequestActor, Role};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, warn};

use super::models::{Claims, User};
use crate::common::dev_mode::DevModeConfig;
use crate::common::{safe_email_log, ApiError, AppState};

/// Authenticated user extractor
///
/// Validates the bearer token and loads the registered account, including
/// its role and status. Callers without an account get 401.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthedUser {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub status: AccountStatus,
}

impl AuthedUser {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    pub fn is_privileged(&self) -> bool {
        self.role.is_privileged()
    }

    pub fn actor(&self) -> RequestActor {
        RequestActor {
            user_id: self.id.clone(),
            email: self.email.clone(),
            role: self.role,
        }
    }

    pub fn ensure_admin(&self) -> Result<(), ApiError> {
        if self.is_admin() {
            Ok(())
        } else {
            warn!(user_id = %self.id, role = %self.role, "Admin-only action denied");
            Err(ApiError::Forbidden("Admin access required".into()))
        }
    }

    pub fn ensure_privileged(&self) -> Result<(), ApiError> {
        if self.is_privileged() {
            Ok(())
        } else {
            warn!(user_id = %self.id, role = %self.role, "Volunteer/admin action denied");
            Err(ApiError::Forbidden("Volunteer or admin access required".into()))
        }
    }

    /// Blocked accounts keep read access but cannot create or change records.
    pub fn ensure_active(&self) -> Result<(), ApiError> {
        match self.status {
            AccountStatus::Active => Ok(()),
            AccountStatus::Blocked => {
                warn!(user_id = %self.id, "Blocked user attempted a mutation");
                Err(ApiError::Forbidden("Your account is blocked".into()))
            }
        }
    }
}

impl From<&User> for AuthedUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role(),
            status: user.status(),
        }
    }
}

/// Token identity without a registered account, used by registration.
#[derive(Debug, Clone)]
pub struct AuthedIdentity {
    pub provider_id: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

async fn app_state<S: Send + Sync>(parts: &mut Parts, state: &S) -> Result<AppState, ApiError> {
    let Extension(state_lock): Extension<Arc<RwLock<AppState>>> =
        Extension::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::InternalServer("missing app state".to_string()))?;

    let app_state = state_lock.read().await.clone();
    Ok(app_state)
}

/// Extracts the bearer token. A missing or empty header is a 401.
fn bearer_token(parts: &Parts) -> Result<String, ApiError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(str::trim);

    let token = match header {
        Some(h) => h.strip_prefix("Bearer ").unwrap_or(h).trim(),
        None => {
            warn!("Authentication failed: missing Authorization header");
            return Err(ApiError::Unauthorized("missing auth".into()));
        }
    };

    if token.is_empty() {
        warn!("Authentication failed: empty bearer token");
        return Err(ApiError::Unauthorized("missing auth".into()));
    }
    Ok(token.to_string())
}

pub fn decode_claims(token: &str, secret: &str) -> Result<Claims, ApiError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        warn!(error = %e, "JWT token validation failed");
        ApiError::Unauthorized("invalid token".into())
    })
}

/// Makes sure the dev identity has a row so foreign keys hold.
async fn ensure_dev_user(db: &SqlitePool, dev_mode: &DevModeConfig) -> Result<AuthedUser, ApiError> {
    let dev_user = dev_mode.dev_user();

    sqlx::query(
        r#"
        INSERT INTO users (id, provider_id, email, name, role, status)
        VALUES (?, ?, ?, ?, ?, 'active')
        ON CONFLICT(id) DO UPDATE SET role = excluded.role
        "#,
    )
    .bind(&dev_user.id)
    .bind(&dev_user.id)
    .bind(&dev_user.email)
    .bind(&dev_user.name)
    .bind(dev_user.role.as_str())
    .execute(db)
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to provision dev user");
        ApiError::DatabaseError(e)
    })?;

    Ok(dev_user)
}

pub async fn find_user_by_provider_id(
    db: &SqlitePool,
    provider_id: &str,
) -> Result<Option<User>, ApiError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE provider_id = ?")
        .bind(provider_id)
        .fetch_optional(db)
        .await
        .map_err(|e| {
            error!(
                error = %e,
                provider_id = %provider_id,
                "Database error during user lookup in authentication"
            );
            ApiError::DatabaseError(e)
        })
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = app_state(parts, state).await?;

        // DEV MODE: Bypass authentication completely
        if app_state.dev_mode.is_enabled() {
            let dev_user = ensure_dev_user(&app_state.db, &app_state.dev_mode).await?;
            debug!(
                user_id = %dev_user.id,
                email = %safe_email_log(&dev_user.email),
                role = %dev_user.role,
                "DEV MODE: Authentication bypassed"
            );
            return Ok(dev_user);
        }

        let token = bearer_token(parts)?;
        let claims = decode_claims(&token, app_state.jwt_secret())?;

        match find_user_by_provider_id(&app_state.db, &claims.sub).await? {
            Some(user) => {
                let authed = AuthedUser::from(&user);
                debug!(
                    user_id = %authed.id,
                    email = %safe_email_log(&authed.email),
                    role = %authed.role,
                    "User authentication successful via extractor"
                );
                Ok(authed)
            }
            None => {
                warn!(provider_id = %claims.sub, "Authentication failed: user not registered");
                Err(ApiError::Unauthorized("user not found".into()))
            }
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthedIdentity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = app_state(parts, state).await?;

        if app_state.dev_mode.is_enabled() {
            let dev_user = app_state.dev_mode.dev_user();
            return Ok(AuthedIdentity {
                provider_id: dev_user.id,
                email: Some(dev_user.email),
                name: dev_user.name,
            });
        }

        let token = bearer_token(parts)?;
        let claims = decode_claims(&token, app_state.jwt_secret())?;

        Ok(AuthedIdentity {
            provider_id: claims.sub,
            email: claims.email.filter(|e| !e.trim().is_empty()),
            name: claims.name,
        })
    }
}

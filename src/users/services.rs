use donation_domain::{check_user_action, AccountStatus, Page, Role, UserAction};
use sqlx::SqlitePool;
use tracing::{error, info, warn};

use super::models::UserListQuery;
use crate::auth::{AuthedUser, User};
use crate::common::{like_pattern, non_blank_filter, safe_email_log, ApiError, PageRequest};

pub struct UsersService {
    db: SqlitePool,
}

impl UsersService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Paginated account list, newest first.
    pub async fn list_users(&self, query: &UserListQuery) -> Result<Page<User>, ApiError> {
        let raw_status = non_blank_filter(query.status.as_deref()).filter(|s| !s.eq_ignore_ascii_case("all"));
        let status = match raw_status {
            Some(raw) => Some(
                raw.parse::<AccountStatus>()
                    .map_err(ApiError::ValidationError)?,
            ),
            None => None,
        };
        let status = status.map(|s| s.as_str());
        let search = like_pattern(query.search.as_deref());
        let window = PageRequest::new(query.page, query.limit);

        let (total,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM users
            WHERE (? IS NULL OR status = ?)
              AND (? IS NULL OR name LIKE ? ESCAPE '\' OR email LIKE ? ESCAPE '\')
            "#,
        )
        .bind(status)
        .bind(status)
        .bind(&search)
        .bind(&search)
        .bind(&search)
        .fetch_one(&self.db)
        .await
        .map_err(ApiError::DatabaseError)?;

        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE (? IS NULL OR status = ?)
              AND (? IS NULL OR name LIKE ? ESCAPE '\' OR email LIKE ? ESCAPE '\')
            ORDER BY created_at DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(status)
        .bind(status)
        .bind(&search)
        .bind(&search)
        .bind(&search)
        .bind(window.limit)
        .bind(window.offset)
        .fetch_all(&self.db)
        .await
        .map_err(ApiError::DatabaseError)?;

        Ok(window.into_page(users, total))
    }

    pub async fn get_user(&self, user_id: &str) -> Result<User, ApiError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.db)
            .await
            .map_err(ApiError::DatabaseError)?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
    }

    /// Blocks or unblocks an account.
    ///
    /// The update only applies if the row still has the status and role the
    /// gate saw, so a concurrent promotion cannot be overridden by a block.
    pub async fn set_status(
        &self,
        actor: &AuthedUser,
        user_id: &str,
        status: AccountStatus,
    ) -> Result<User, ApiError> {
        let target = self.get_user(user_id).await?;
        let action = UserAction::for_status(status);
        if let Err(denied) = check_user_action(actor.role, &actor.email, &target.as_managed(), action) {
            warn!(
                actor_id = %actor.id,
                target_id = %target.id,
                reason = %denied,
                "User status change denied"
            );
            return Err(denied.into());
        }

        let result = sqlx::query(
            r#"
            UPDATE users SET status = ?, updated_at = datetime('now')
            WHERE id = ? AND status = ? AND role = ?
            "#,
        )
        .bind(status.as_str())
        .bind(&target.id)
        .bind(&target.status)
        .bind(&target.role)
        .execute(&self.db)
        .await
        .map_err(|e| {
            error!(error = %e, user_id = %target.id, "Failed to update user status");
            ApiError::DatabaseError(e)
        })?;

        if result.rows_affected() == 0 {
            return Err(ApiError::Conflict(
                "User was changed by someone else; reload and try again".into(),
            ));
        }

        info!(
            actor_id = %actor.id,
            target = %safe_email_log(&target.email),
            status = %status,
            "User status updated"
        );
        self.get_user(&target.id).await
    }

    /// Promotes an account to volunteer or admin.
    pub async fn set_role(&self, actor: &AuthedUser, user_id: &str, role: Role) -> Result<User, ApiError> {
        let target = self.get_user(user_id).await?;
        if let Err(denied) =
            check_user_action(actor.role, &actor.email, &target.as_managed(), UserAction::SetRole(role))
        {
            warn!(
                actor_id = %actor.id,
                target_id = %target.id,
                reason = %denied,
                "User role change denied"
            );
            return Err(denied.into());
        }

        let result = sqlx::query(
            "UPDATE users SET role = ?, updated_at = datetime('now') WHERE id = ? AND role = ?",
        )
        .bind(role.as_str())
        .bind(&target.id)
        .bind(&target.role)
        .execute(&self.db)
        .await
        .map_err(|e| {
            error!(error = %e, user_id = %target.id, "Failed to update user role");
            ApiError::DatabaseError(e)
        })?;

        if result.rows_affected() == 0 {
            return Err(ApiError::Conflict(
                "User was changed by someone else; reload and try again".into(),
            ));
        }

        info!(
            actor_id = %actor.id,
            target = %safe_email_log(&target.email),
            role = %role,
            "User role updated"
        );
        self.get_user(&target.id).await
    }
}

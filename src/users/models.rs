//! User administration request models

use serde::Deserialize;

/// `GET /users` query
#[derive(Deserialize, Debug, Default)]
pub struct UserListQuery {
    /// `all`, `active` or `blocked`
    pub status: Option<String>,
    /// Matched against name and email
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// `PATCH /users/:id/status` body
#[derive(Deserialize, Debug)]
pub struct StatusUpdate {
    pub status: String,
}

/// `PATCH /users/:id/role` body
#[derive(Deserialize, Debug)]
pub struct RoleUpdate {
    pub role: String,
}

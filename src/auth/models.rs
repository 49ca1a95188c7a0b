//! Authentication data models

use donation_domain::{AccountStatus, BloodGroup, ManagedAccount, Role};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// JWT claims issued by the credential provider
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Claims {
    /// Opaque identity id
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub exp: usize,
}

/// User database model
#[derive(FromRow, Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    #[serde(skip_serializing)]
    pub provider_id: String,
    pub email: String,
    pub name: Option<String>,
    pub avatar: Option<String>,
    pub blood_group: Option<String>,
    pub district: Option<String>,
    pub upazila: Option<String>,
    pub role: String,
    pub status: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl User {
    pub fn role(&self) -> Role {
        Role::parse_or_default(&self.role)
    }

    /// Unknown values read as blocked so a bad row never gains access.
    pub fn status(&self) -> AccountStatus {
        self.status.parse().unwrap_or(AccountStatus::Blocked)
    }

    pub fn as_managed(&self) -> ManagedAccount {
        ManagedAccount {
            email: self.email.clone(),
            role: self.role(),
            status: self.status(),
        }
    }
}

/// `POST /users` body
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPayload {
    pub name: Option<String>,
    /// Only consulted when the token carries no email.
    pub email: Option<String>,
    pub avatar: Option<String>,
    pub blood_group: Option<BloodGroup>,
    pub district: Option<String>,
    pub upazila: Option<String>,
}

/// `GET /role/:email` response
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct RoleResponse {
    pub role: Role,
}

//! Account registration and admin user management

use donation_domain::{
    can_manage, check_user_action, AccountStatus, ManagedAccount, Page, Role, UserAction,
};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::error::PortalError;
use crate::http::ApiClient;
use crate::inflight::InFlight;
use crate::query::{normalize_page, LatestTickets, ListQuery};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub blood_group: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub upazila: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub status: AccountStatus,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl UserAccount {
    fn managed(&self) -> ManagedAccount {
        ManagedAccount {
            email: self.email.clone(),
            role: self.role,
            status: self.status,
        }
    }
}

/// Profile sent with `POST /users` after the credential exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blood_group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upazila: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterResponse {
    pub user: UserAccount,
    #[serde(default)]
    pub created: bool,
}

#[derive(Deserialize)]
struct MeResponse {
    user: UserAccount,
}

/// Registers the signed-in identity; repeating it is harmless.
pub async fn register(api: &ApiClient, profile: &Registration) -> Result<RegisterResponse, PortalError> {
    let body = serde_json::to_value(profile).map_err(|e| PortalError::Decode(e.to_string()))?;
    let response: RegisterResponse = api.send_json(Method::POST, "/users", Some(body)).await?;
    if response.created {
        info!(user_id = %response.user.id, "Account registered");
    }
    Ok(response)
}

pub async fn current_user(api: &ApiClient) -> Result<UserAccount, PortalError> {
    let response: MeResponse = api.get("/me", Vec::new()).await?;
    Ok(response.user)
}

const LIST_KEY: &str = "users";

pub struct UserAdmin {
    api: ApiClient,
    tickets: LatestTickets,
    in_flight: InFlight,
}

impl UserAdmin {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            tickets: LatestTickets::default(),
            in_flight: InFlight::default(),
        }
    }

    /// Whether block/promote controls should be offered for `target` at all.
    pub fn can_manage(&self, actor_role: Role, actor_email: &str, target: &UserAccount) -> bool {
        can_manage(actor_role, actor_email, &target.managed())
    }

    pub fn is_busy(&self, user_id: &str) -> bool {
        self.in_flight.is_busy(user_id)
    }

    pub async fn list(&self, query: &ListQuery) -> Result<Page<UserAccount>, PortalError> {
        let ticket = self.tickets.issue(LIST_KEY);
        let body = self.api.call(Method::GET, "/users", query.params(), None).await?;
        if !self.tickets.is_current(&ticket) {
            return Err(PortalError::Stale);
        }
        normalize_page(body, "result", query.limit)
    }

    pub async fn set_status(
        &self,
        actor_role: Role,
        actor_email: &str,
        target: &UserAccount,
        status: AccountStatus,
    ) -> Result<UserAccount, PortalError> {
        check_user_action(actor_role, actor_email, &target.managed(), UserAction::for_status(status))?;
        let _guard = self.in_flight.begin(&target.id)?;

        let path = format!("/users/{}/status", urlencoding::encode(&target.id));
        let updated: UserAccount = self
            .api
            .send_json(Method::PATCH, &path, Some(json!({ "status": status })))
            .await?;
        info!(user_id = %updated.id, status = %updated.status, "User status changed");
        Ok(updated)
    }

    pub async fn block(&self, actor_role: Role, actor_email: &str, target: &UserAccount) -> Result<UserAccount, PortalError> {
        self.set_status(actor_role, actor_email, target, AccountStatus::Blocked).await
    }

    pub async fn unblock(&self, actor_role: Role, actor_email: &str, target: &UserAccount) -> Result<UserAccount, PortalError> {
        self.set_status(actor_role, actor_email, target, AccountStatus::Active).await
    }

    pub async fn set_role(
        &self,
        actor_role: Role,
        actor_email: &str,
        target: &UserAccount,
        role: Role,
    ) -> Result<UserAccount, PortalError> {
        check_user_action(actor_role, actor_email, &target.managed(), UserAction::SetRole(role))?;
        let _guard = self.in_flight.begin(&target.id)?;

        let path = format!("/users/{}/role", urlencoding::encode(&target.id));
        let updated: UserAccount = self
            .api
            .send_json(Method::PATCH, &path, Some(json!({ "role": role })))
            .await?;
        info!(user_id = %updated.id, role = %updated.role, "User role changed");
        Ok(updated)
    }
}

//! Authorization gate
//!
//! Two pure checks:
//! - route access: which surface a caller may open, given session and role state
//! - user management: which account mutations an actor may perform on a target
//!
//! Denials are terminal. Callers render them as "forbidden" and never retry.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::role::Role;

/// Classes of surfaces guarded by the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteClass {
    Public,
    Authenticated,
    /// Volunteers and admins.
    Privileged,
    AdminOnly,
}

/// Whether a caller with the given role may open a route class.
///
/// `None` means no signed-in identity.
pub fn can_access(role: Option<Role>, class: RouteClass) -> bool {
    match (class, role) {
        (RouteClass::Public, _) => true,
        (_, None) => false,
        (RouteClass::Authenticated, Some(_)) => true,
        (RouteClass::Privileged, Some(role)) => role.is_privileged(),
        (RouteClass::AdminOnly, Some(role)) => role.is_admin(),
    }
}

/// Snapshot of what a guard knows when it evaluates a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerState {
    pub session_loading: bool,
    pub signed_in: bool,
    pub role: Role,
    pub role_loading: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    /// Session or role still resolving; show a busy indicator.
    Loading,
    Render,
    RedirectToLogin,
    Forbidden,
}

/// Evaluates a route guard: loading first, then anonymous callers, then role.
///
/// Role-gated classes never render while the role is loading, so a donor
/// default can't leak a privileged surface.
pub fn route_decision(caller: CallerState, class: RouteClass) -> RouteDecision {
    if class == RouteClass::Public {
        return RouteDecision::Render;
    }
    if caller.session_loading {
        return RouteDecision::Loading;
    }
    if !caller.signed_in {
        return RouteDecision::RedirectToLogin;
    }
    match class {
        RouteClass::Public | RouteClass::Authenticated => RouteDecision::Render,
        RouteClass::Privileged | RouteClass::AdminOnly => {
            if caller.role_loading {
                RouteDecision::Loading
            } else if can_access(Some(caller.role), class) {
                RouteDecision::Render
            } else {
                RouteDecision::Forbidden
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    #[default]
    Active,
    Blocked,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Blocked => "blocked",
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(AccountStatus::Active),
            "blocked" => Ok(AccountStatus::Blocked),
            other => Err(format!("unknown account status: {}", other)),
        }
    }
}

/// The attributes of a target account that the gate looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedAccount {
    pub email: String,
    pub role: Role,
    pub status: AccountStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    Block,
    Unblock,
    SetRole(Role),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessDenied {
    #[error("Only admins can manage users")]
    NotAdmin,
    #[error("You can't modify your own account")]
    SelfModification,
    #[error("Admins cannot be blocked")]
    AdminNotBlockable,
    #[error("User is already {0}")]
    StatusUnchanged(AccountStatus),
    #[error("User already has the {0} role")]
    RoleUnchanged(Role),
    #[error("Users can only be promoted to volunteer or admin")]
    UnsupportedRole(Role),
}

fn same_account(a: &str, b: &str) -> bool {
    let a = a.trim();
    !a.is_empty() && a.eq_ignore_ascii_case(b.trim())
}

/// Whether `actor` may manage `target` at all: admins only, never themselves.
pub fn can_manage(actor_role: Role, actor_email: &str, target: &ManagedAccount) -> bool {
    actor_role.is_admin() && !same_account(actor_email, &target.email)
}

/// Checks one concrete account mutation.
pub fn check_user_action(
    actor_role: Role,
    actor_email: &str,
    target: &ManagedAccount,
    action: UserAction,
) -> Result<(), AccessDenied> {
    if !actor_role.is_admin() {
        return Err(AccessDenied::NotAdmin);
    }
    if same_account(actor_email, &target.email) {
        return Err(AccessDenied::SelfModification);
    }

    match action {
        UserAction::Block => {
            if target.role.is_admin() {
                Err(AccessDenied::AdminNotBlockable)
            } else if target.status == AccountStatus::Blocked {
                Err(AccessDenied::StatusUnchanged(AccountStatus::Blocked))
            } else {
                Ok(())
            }
        }
        UserAction::Unblock => {
            if target.status == AccountStatus::Active {
                Err(AccessDenied::StatusUnchanged(AccountStatus::Active))
            } else {
                Ok(())
            }
        }
        UserAction::SetRole(role) => match role {
            Role::Donor => Err(AccessDenied::UnsupportedRole(role)),
            Role::Volunteer | Role::Admin if role == target.role => {
                Err(AccessDenied::RoleUnchanged(role))
            }
            Role::Volunteer | Role::Admin => Ok(()),
        },
    }
}

impl UserAction {
    pub fn for_status(status: AccountStatus) -> Self {
        match status {
            AccountStatus::Active => UserAction::Unblock,
            AccountStatus::Blocked => UserAction::Block,
        }
    }
}

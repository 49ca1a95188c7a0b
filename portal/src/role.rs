//! Role resolution for the signed-in identity
//!
//! Unresolved roles read as `donor` with `loading = true`, so privileged
//! surfaces stay closed until the server has answered.

use donation_domain::Role;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

use crate::http::ApiClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleState {
    pub role: Role,
    pub loading: bool,
}

impl RoleState {
    pub const ANONYMOUS: RoleState = RoleState {
        role: Role::Donor,
        loading: false,
    };
    pub const PENDING: RoleState = RoleState {
        role: Role::Donor,
        loading: true,
    };

    fn resolved(role: Role) -> Self {
        Self {
            role,
            loading: false,
        }
    }
}

#[derive(Deserialize)]
struct RoleResponse {
    role: String,
}

#[derive(Default)]
struct RoleCache {
    epoch: u64,
    roles: HashMap<String, Role>,
}

pub struct RoleResolver {
    api: ApiClient,
    cache: Mutex<RoleCache>,
}

fn lock(cache: &Mutex<RoleCache>) -> MutexGuard<'_, RoleCache> {
    cache.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RoleResolver {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            cache: Mutex::new(RoleCache::default()),
        }
    }

    /// Cached answer without any I/O.
    pub fn current(&self) -> RoleState {
        let session = self.api.session();
        if session.is_loading() {
            return RoleState::PENDING;
        }
        let Some(identity) = session.identity() else {
            return RoleState::ANONYMOUS;
        };
        match self.cached(session.epoch(), &identity.email) {
            Some(role) => RoleState::resolved(role),
            None => RoleState::PENDING,
        }
    }

    /// Resolves the role, looking it up at most once per email and session.
    pub async fn resolve(&self) -> RoleState {
        let known = self.current();
        let session = self.api.session();
        if !known.loading || session.is_loading() {
            return known;
        }
        let Some(identity) = session.identity() else {
            return RoleState::ANONYMOUS;
        };
        let email = identity.email.trim().to_lowercase();
        if email.is_empty() {
            return RoleState::ANONYMOUS;
        }

        let epoch = session.epoch();

        let path = format!("/role/{}", urlencoding::encode(&email));
        match self.api.get::<RoleResponse>(&path, Vec::new()).await {
            Ok(response) => {
                let role = Role::parse_or_default(&response.role);
                let mut cache = lock(&self.cache);
                if cache.epoch != epoch {
                    cache.epoch = epoch;
                    cache.roles.clear();
                }
                cache.roles.insert(email, role);
                debug!(role = %role, "Role resolved");
                RoleState::resolved(role)
            }
            Err(e) => {
                warn!(error = %e, "Role lookup failed; staying on donor");
                RoleState::PENDING
            }
        }
    }

    fn cached(&self, epoch: u64, email: &str) -> Option<Role> {
        let mut cache = lock(&self.cache);
        if cache.epoch != epoch {
            cache.epoch = epoch;
            cache.roles.clear();
            return None;
        }
        cache.roles.get(&email.trim().to_lowercase()).copied()
    }
}

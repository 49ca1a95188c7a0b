//! # Donor portal core
//!
//! The client half of the donation platform, without any rendering:
//! - [`session`]: the single-writer session store every call reads from
//! - [`http`]: the API client (bearer handling, 401 invalidation, stale drops)
//! - [`role`]: role resolution and caching for the signed-in identity
//! - [`query`]: list normalization, debounce and last-write-wins tickets
//! - [`requests`], [`users`], [`payments`]: the three workflows
//!
//! A host UI owns one [`Portal`] and reads state from it.

pub mod config;
pub mod error;
pub mod http;
pub mod inflight;
pub mod payments;
pub mod query;
pub mod requests;
pub mod role;
pub mod session;
pub mod users;


pub use config::PortalConfig;
pub use error::PortalError;
pub use http::{ApiClient, HttpRequest, HttpResponse, HttpTransport, Transport};
pub use payments::{FundingHistory, PaymentFlow, PaymentOutcome, ReturnOutcome};
pub use query::ListQuery;
pub use requests::{PendingSearch, RequestDraft, RequestManager, RequestStats};
pub use role::{RoleResolver, RoleState};
pub use session::{Identity, SessionEvent, SessionState, SessionStore, SignOutReason};
pub use users::{Registration, UserAccount, UserAdmin};

use donation_domain::{route_decision, CallerState, RequestActor, RouteClass, RouteDecision};
use std::sync::Arc;

/// Everything one signed-in browser context needs, sharing one session.
pub struct Portal {
    pub config: PortalConfig,
    pub session: SessionStore,
    pub api: ApiClient,
    pub roles: RoleResolver,
    pub requests: RequestManager,
    pub pending: RequestManager,
    pub users: UserAdmin,
    pub payments: PaymentFlow,
}

impl Portal {
    pub fn new(config: PortalConfig, transport: Arc<dyn Transport>) -> Self {
        let session = SessionStore::new(config.login_path.clone());
        let api = ApiClient::new(transport, session.clone());
        Self {
            roles: RoleResolver::new(api.clone()),
            requests: RequestManager::new(api.clone(), &config),
            pending: RequestManager::pending(api.clone(), &config),
            users: UserAdmin::new(api.clone()),
            payments: PaymentFlow::new(api.clone()),
            session,
            api,
            config,
        }
    }

    /// Talks to the API over HTTP.
    pub fn connect(config: PortalConfig) -> Self {
        let transport = HttpTransport::new(reqwest::Client::new(), config.base_url.clone());
        Self::new(config, Arc::new(transport))
    }

    /// What a route of `class` should show right now.
    pub async fn route(&self, class: RouteClass) -> RouteDecision {
        let role = self.roles.resolve().await;
        let caller = CallerState {
            session_loading: self.session.is_loading(),
            signed_in: self.session.identity().is_some(),
            role: role.role,
            role_loading: role.loading,
        };
        route_decision(caller, class)
    }

    /// The signed-in identity as seen by the request state machine.
    pub async fn actor(&self) -> Option<RequestActor> {
        let identity = self.session.identity()?;
        let role = self.roles.resolve().await;
        Some(RequestActor {
            user_id: identity.id,
            email: identity.email,
            role: role.role,
        })
    }
}

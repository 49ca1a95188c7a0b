//! Process-wide session state
//!
//! A single writer (sign-in, sign-out, invalidation) with any number of
//! observers. Every identity change bumps the epoch, so work started under an
//! older identity can tell that it is stale.

use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub email: String,
    /// Bearer token issued by the credential provider.
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// The credential exchange has not finished yet.
    Loading,
    SignedOut,
    SignedIn(Identity),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub epoch: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignOutReason {
    UserRequested,
    /// The server rejected the token.
    Unauthorized,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn { email: String },
    SignedOut {
        redirect_to: String,
        reason: SignOutReason,
    },
}

#[derive(Clone)]
pub struct SessionStore {
    state: Arc<watch::Sender<SessionSnapshot>>,
    events: broadcast::Sender<SessionEvent>,
    login_path: Arc<str>,
}

impl SessionStore {
    pub fn new(login_path: impl Into<String>) -> Self {
        let (state, _) = watch::channel(SessionSnapshot {
            state: SessionState::Loading,
            epoch: 0,
        });
        let (events, _) = broadcast::channel(16);
        Self {
            state: Arc::new(state),
            events,
            login_path: Arc::from(login_path.into()),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    pub fn identity(&self) -> Option<Identity> {
        match &self.state.borrow().state {
            SessionState::SignedIn(identity) => Some(identity.clone()),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state.borrow().state, SessionState::Loading)
    }

    pub fn epoch(&self) -> u64 {
        self.state.borrow().epoch
    }

    /// Token for outbound calls. `None` means the header must be left off.
    pub fn bearer_token(&self) -> Option<String> {
        self.identity()
            .map(|identity| identity.token)
            .filter(|token| !token.trim().is_empty())
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn sign_in(&self, identity: Identity) {
        let email = identity.email.clone();
        self.state.send_modify(|snapshot| {
            snapshot.state = SessionState::SignedIn(identity);
            snapshot.epoch += 1;
        });
        info!(epoch = self.epoch(), "Session started");
        let _ = self.events.send(SessionEvent::SignedIn { email });
    }

    /// The credential exchange finished without an identity.
    pub fn finish_anonymous(&self) {
        self.state.send_if_modified(|snapshot| {
            if snapshot.state == SessionState::Loading {
                snapshot.state = SessionState::SignedOut;
                true
            } else {
                false
            }
        });
    }

    pub fn sign_out(&self) {
        self.end(SignOutReason::UserRequested);
    }

    /// Drops the identity after the server refused it.
    ///
    /// Several in-flight calls may fail together; only the first one
    /// publishes the sign-out.
    pub fn invalidate(&self) {
        self.end(SignOutReason::Unauthorized);
    }

    fn end(&self, reason: SignOutReason) {
        let ended = self.state.send_if_modified(|snapshot| {
            if matches!(snapshot.state, SessionState::SignedIn(_)) {
                snapshot.state = SessionState::SignedOut;
                snapshot.epoch += 1;
                true
            } else {
                false
            }
        });
        if !ended {
            return;
        }

        match reason {
            SignOutReason::Unauthorized => {
                warn!(epoch = self.epoch(), "Session invalidated by the server")
            }
            SignOutReason::UserRequested => info!(epoch = self.epoch(), "Signed out"),
        }
        let _ = self.events.send(SessionEvent::SignedOut {
            redirect_to: self.login_path.to_string(),
            reason,
        });
    }
}

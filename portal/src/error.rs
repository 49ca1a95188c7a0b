use donation_domain::{AccessDenied, CheckoutValidationError, TransitionError};
use thiserror::Error;

/// Shown when the server gave no usable message.
pub const GENERIC_MESSAGE: &str = "Something went wrong. Please try again.";

/// Shown when the server could not be reached at all.
pub const NETWORK_MESSAGE: &str = "Could not reach the server. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortalError {
    /// Bad input caught before anything was sent.
    #[error("{0}")]
    Validation(String),

    /// Refused locally by the authorization gate. Terminal.
    #[error("{0}")]
    Forbidden(String),

    /// The server refused the credentials (401/403). The session has
    /// already been invalidated when this is returned.
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    /// The record's state does not allow the action.
    #[error("{0}")]
    Conflict(String),

    /// Terminal. `session_id` is kept for support.
    #[error("{message}")]
    PaymentVerification {
        message: String,
        session_id: Option<String>,
    },

    #[error("{0}")]
    Network(String),

    /// 5xx and provider failures.
    #[error("{0}")]
    Server(String),

    /// The same record already has a change in flight.
    #[error("Another change to this record is still in progress")]
    Busy,

    /// The response arrived after the session or query moved on.
    #[error("Response discarded: superseded by a newer request")]
    Stale,

    #[error("Unexpected response from server: {0}")]
    Decode(String),
}

impl PortalError {
    /// Human-readable text for display.
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Whether a manual "Try again" makes sense. Nothing is retried
    /// automatically.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PortalError::Network(_) | PortalError::Server(_))
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, PortalError::Stale)
    }

    /// Attaches the checkout session to a verification failure.
    pub fn with_session(self, session_id: &str) -> Self {
        match self {
            PortalError::PaymentVerification { message, .. } => PortalError::PaymentVerification {
                message,
                session_id: Some(session_id.to_string()),
            },
            other => other,
        }
    }
}

impl From<CheckoutValidationError> for PortalError {
    fn from(err: CheckoutValidationError) -> Self {
        PortalError::Validation(err.to_string())
    }
}

impl From<TransitionError> for PortalError {
    fn from(err: TransitionError) -> Self {
        if err.is_permission() {
            PortalError::Forbidden(err.to_string())
        } else {
            PortalError::Conflict(err.to_string())
        }
    }
}

impl From<AccessDenied> for PortalError {
    fn from(err: AccessDenied) -> Self {
        match err {
            AccessDenied::StatusUnchanged(_) | AccessDenied::RoleUnchanged(_) => {
                PortalError::Conflict(err.to_string())
            }
            AccessDenied::UnsupportedRole(_) => PortalError::Validation(err.to_string()),
            _ => PortalError::Forbidden(err.to_string()),
        }
    }
}

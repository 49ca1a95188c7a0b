// Error handling types for the API

use axum::{http::StatusCode, response::IntoResponse, Json};
use donation_domain::{
    AccessDenied, CheckoutValidationError, SessionVerificationError, TransitionError,
};
use serde::Serialize;
use std::fmt;
use tracing::error;

use super::validation::ValidationResult;

/// API error types
#[derive(Debug)]
pub enum ApiError {
    Unauthorized(String),
    Forbidden(String),
    BadRequest(String),
    NotFound(String),
    /// The request is well formed but the record's state does not allow it.
    Conflict(String),
    InternalServer(String),
    DatabaseError(sqlx::Error),
    ValidationError(String),
    /// The checkout provider could not be reached or answered badly.
    PaymentProvider(String),
    /// The checkout session exists but does not prove a completed payment.
    PaymentVerification(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::InternalServer(msg) => write!(f, "Internal Server Error: {}", msg),
            ApiError::DatabaseError(e) => write!(f, "Database Error: {}", e),
            ApiError::ValidationError(msg) => write!(f, "Validation Error: {}", msg),
            ApiError::PaymentProvider(msg) => write!(f, "Payment Provider Error: {}", msg),
            ApiError::PaymentVerification(msg) => write!(f, "Payment Verification Error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) | ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::InternalServer(_) | ApiError::DatabaseError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::PaymentProvider(_) => StatusCode::BAD_GATEWAY,
            ApiError::PaymentVerification(_) => StatusCode::PAYMENT_REQUIRED,
        }
    }
}

/// JSON error response structure
///
/// `message` is meant for humans and is shown as-is by clients.
#[derive(Serialize)]
pub struct ErrorResponse {
    pub message: String,
    pub code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let (message, code) = match self {
            ApiError::Unauthorized(msg) => (msg, "UNAUTHORIZED"),
            ApiError::Forbidden(msg) => (msg, "FORBIDDEN"),
            ApiError::BadRequest(msg) => (msg, "BAD_REQUEST"),
            ApiError::NotFound(msg) => (msg, "NOT_FOUND"),
            ApiError::Conflict(msg) => (msg, "CONFLICT"),
            ApiError::InternalServer(msg) => (msg, "INTERNAL_SERVER_ERROR"),
            ApiError::DatabaseError(e) => {
                error!(error = %e, "Database error occurred");
                ("Database operation failed".to_string(), "DATABASE_ERROR")
            }
            ApiError::ValidationError(msg) => (msg, "VALIDATION_ERROR"),
            ApiError::PaymentProvider(msg) => (msg, "PAYMENT_PROVIDER_ERROR"),
            ApiError::PaymentVerification(msg) => (msg, "PAYMENT_VERIFICATION_ERROR"),
        };

        let error_response = ErrorResponse {
            message,
            code: code.to_string(),
        };

        (status, Json(error_response)).into_response()
    }
}

/// Helper function to convert ValidationResult to ApiError
impl From<ValidationResult> for ApiError {
    fn from(result: ValidationResult) -> Self {
        if result.is_valid {
            ApiError::InternalServer(
                "Validation result was valid but converted to error".to_string(),
            )
        } else {
            let error_messages: Vec<String> = result
                .errors
                .iter()
                .map(|e| format!("{}: {}", e.field, e.message))
                .collect();
            ApiError::ValidationError(error_messages.join(", "))
        }
    }
}

impl From<TransitionError> for ApiError {
    fn from(err: TransitionError) -> Self {
        if err.is_permission() {
            ApiError::Forbidden(err.to_string())
        } else {
            ApiError::Conflict(err.to_string())
        }
    }
}

impl From<AccessDenied> for ApiError {
    fn from(err: AccessDenied) -> Self {
        match err {
            AccessDenied::StatusUnchanged(_) | AccessDenied::RoleUnchanged(_) => {
                ApiError::Conflict(err.to_string())
            }
            AccessDenied::UnsupportedRole(_) => ApiError::ValidationError(err.to_string()),
            AccessDenied::NotAdmin
            | AccessDenied::SelfModification
            | AccessDenied::AdminNotBlockable => ApiError::Forbidden(err.to_string()),
        }
    }
}

impl From<CheckoutValidationError> for ApiError {
    fn from(err: CheckoutValidationError) -> Self {
        ApiError::ValidationError(err.to_string())
    }
}

impl From<SessionVerificationError> for ApiError {
    fn from(err: SessionVerificationError) -> Self {
        match err {
            SessionVerificationError::PayerMismatch => ApiError::Forbidden(err.to_string()),
            _ => ApiError::PaymentVerification(err.to_string()),
        }
    }
}

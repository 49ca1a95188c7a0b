// Common module - shared types and utilities across all modules

pub mod config;
pub mod dev_mode;
pub mod error;
pub mod helpers;
pub mod id_generator;
pub mod migrations;
pub mod pagination;
pub mod state;
pub mod validation;

// Re-export commonly used types for convenience
pub use config::AppConfig;
pub use error::ApiError;
pub use helpers::{like_pattern, non_blank_filter, safe_email_log};
pub use id_generator::*;
pub use pagination::PageRequest;
pub use state::AppState;
pub use validation::{ValidationError, ValidationResult, Validator};

#[cfg(test)]
pub mod test_support;

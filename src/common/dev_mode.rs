// src/common/dev_mode.rs
//! Development mode configuration and utilities
//! Allows bypassing token validation for local testing

use donation_domain::{AccountStatus, Role};
use std::env;
use tracing::{info, warn};

use crate::auth::AuthedUser;

#[derive(Debug, Clone)]
pub struct DevModeConfig {
    pub enabled: bool,
    pub user_email: String,
    pub user_name: String,
    pub user_role: Role,
}

impl DevModeConfig {
    pub fn from_env() -> Self {
        let enabled = env::var("DEV_MODE")
            .unwrap_or_else(|_| "false".to_string())
            .to_lowercase()
            == "true";

        let user_email = env::var("DEV_USER_EMAIL").unwrap_or_else(|_| "dev@test.com".to_string());
        let user_name = env::var("DEV_USER_NAME").unwrap_or_else(|_| "Dev User".to_string());
        let user_role = Role::parse_or_default(&env::var("DEV_USER_ROLE").unwrap_or_default());

        Self {
            enabled,
            user_email,
            user_name,
            user_role,
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            user_email: String::new(),
            user_name: String::new(),
            user_role: Role::Donor,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The fixed identity every request runs as in dev mode
    pub fn dev_user(&self) -> AuthedUser {
        AuthedUser {
            id: "U_DEV00001".to_string(),
            email: self.user_email.clone(),
            name: Some(self.user_name.clone()),
            role: self.user_role,
            status: AccountStatus::Active,
        }
    }
}

/// Log dev mode status on startup
pub fn log_dev_mode_status(config: &DevModeConfig) {
    if config.enabled {
        warn!(
            dev_user = %config.user_email,
            dev_role = %config.user_role,
            "DEV MODE ENABLED: token validation bypassed, do not use in production"
        );
    } else {
        info!("Production mode: bearer tokens required");
    }
}

/// CLI argument parsing for dev mode
pub fn parse_dev_mode_args<I: IntoIterator<Item = String>>(args: I) -> Option<bool> {
    args.into_iter().find_map(|arg| match arg.as_str() {
        "--dev" | "--dev-mode" => Some(true),
        "--no-dev" | "--prod" | "--production" => Some(false),
        _ => None,
    })
}

/// Override dev mode from CLI args
pub fn apply_cli_override(mut config: DevModeConfig) -> DevModeConfig {
    if let Some(cli_dev_mode) = parse_dev_mode_args(env::args()) {
        info!(dev_mode = cli_dev_mode, "CLI override for DEV_MODE");
        config.enabled = cli_dev_mode;
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_flags() {
        let args = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert_eq!(parse_dev_mode_args(args(&["donation_api", "--dev"])), Some(true));
        assert_eq!(parse_dev_mode_args(args(&["donation_api", "--prod"])), Some(false));
        assert_eq!(parse_dev_mode_args(args(&["donation_api"])), None);
    }

    #[test]
    fn test_dev_user_uses_configured_role() {
        let config = DevModeConfig {
            enabled: true,
            user_email: "dev@test.com".to_string(),
            user_name: "Dev".to_string(),
            user_role: Role::Volunteer,
        };
        let user = config.dev_user();
        assert_eq!(user.role, Role::Volunteer);
        assert_eq!(user.status, AccountStatus::Active);
    }
}

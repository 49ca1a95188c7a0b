// src/common/config.rs
//! Environment-driven configuration

use std::collections::HashSet;
use std::env;

/// Settings read once at start-up.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    /// Base URL of the portal; checkout return URLs hang off it.
    pub client_url: String,
    pub stripe_secret_key: Option<String>,
    pub stripe_api_base: String,
    pub payment_currency: String,
    /// Accounts registered with these emails start as admins.
    pub admin_emails: HashSet<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let admin_emails = get("ADMIN_EMAILS", "")
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        let cors_origins = get("CORS_ORIGINS", "http://localhost:5173,http://localhost:3000")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            database_url: get("DATABASE_URL", "sqlite://donation_api.db"),
            jwt_secret: get("JWT_SECRET", "replace_with_strong_secret"),
            port: get("PORT", "8080").parse().unwrap_or(8080),
            cors_origins,
            client_url: get("CLIENT_URL", "http://localhost:5173")
                .trim_end_matches('/')
                .to_string(),
            stripe_secret_key: lookup("STRIPE_SECRET_KEY").filter(|v| !v.trim().is_empty()),
            stripe_api_base: get("STRIPE_API_BASE", "https://api.stripe.com")
                .trim_end_matches('/')
                .to_string(),
            payment_currency: get("PAYMENT_CURRENCY", "usd").to_lowercase(),
            admin_emails,
        }
    }

    pub fn is_bootstrap_admin(&self, email: &str) -> bool {
        self.admin_emails.contains(&email.trim().to_lowercase())
    }

    pub fn success_url(&self) -> String {
        format!(
            "{}/dashboard/payment-success?session_id={{CHECKOUT_SESSION_ID}}",
            self.client_url
        )
    }

    pub fn cancel_url(&self) -> String {
        format!("{}/dashboard/payment-cancel", self.client_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_when_env_is_empty() {
        let config = AppConfig::from_lookup(|_| None);
        assert_eq!(config.database_url, "sqlite://donation_api.db");
        assert_eq!(config.port, 8080);
        assert_eq!(config.payment_currency, "usd");
        assert!(config.stripe_secret_key.is_none());
        assert!(config.admin_emails.is_empty());
    }

    #[test]
    fn test_values_are_normalized() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("ADMIN_EMAILS", " Root@Example.com , ,ops@example.com"),
            ("CLIENT_URL", "https://portal.example.com/"),
            ("PAYMENT_CURRENCY", "BDT"),
            ("PORT", "not-a-port"),
        ]);
        let config = AppConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));

        assert!(config.is_bootstrap_admin("root@example.com"));
        assert!(config.is_bootstrap_admin("OPS@example.com"));
        assert_eq!(config.admin_emails.len(), 2);
        assert_eq!(config.payment_currency, "bdt");
        assert_eq!(config.port, 8080);
        assert_eq!(
            config.success_url(),
            "https://portal.example.com/dashboard/payment-success?session_id={CHECKOUT_SESSION_ID}"
        );
    }
}

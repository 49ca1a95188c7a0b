use std::time::Duration;

pub const DEFAULT_SEARCH_QUIET_MS: u64 = 400;

/// Portal core settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalConfig {
    /// API root, without a trailing slash.
    pub base_url: String,
    /// Quiet interval before a search keystroke turns into a list call.
    pub search_quiet: Duration,
    pub default_limit: i64,
    /// Where the shell sends the user after the session ends.
    pub login_path: String,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            search_quiet: Duration::from_millis(DEFAULT_SEARCH_QUIET_MS),
            default_limit: donation_domain::pagination::DEFAULT_LIMIT,
            login_path: "/login".to_string(),
        }
    }
}

impl PortalConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    /// Reads `DONATION_API_URL`, `SEARCH_DEBOUNCE_MS`, `PAGE_LIMIT` and
    /// `LOGIN_PATH`, keeping defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let base_url = lookup("DONATION_API_URL")
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or(defaults.base_url);
        let search_quiet = lookup("SEARCH_DEBOUNCE_MS")
            .and_then(|ms| ms.trim().parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.search_quiet);
        let default_limit = lookup("PAGE_LIMIT")
            .and_then(|limit| limit.trim().parse::<i64>().ok())
            .filter(|limit| *limit > 0)
            .unwrap_or(defaults.default_limit);
        let login_path = lookup("LOGIN_PATH")
            .filter(|path| path.starts_with('/'))
            .unwrap_or(defaults.login_path);

        Self {
            base_url,
            search_quiet,
            default_limit,
            login_path,
        }
    }
}

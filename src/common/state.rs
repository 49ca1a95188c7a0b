// Application state shared across all modules

use sqlx::SqlitePool;
use std::sync::Arc;

use crate::common::config::AppConfig;
use crate::common::dev_mode::DevModeConfig;
use crate::services::CheckoutProvider;

/// Application state containing database pool, services, and configuration
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
    pub dev_mode: DevModeConfig,
    pub checkout: Arc<dyn CheckoutProvider>,
}

impl AppState {
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt_secret
    }
}

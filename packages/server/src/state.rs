use std::sync::Arc;
use std::time::Duration;

use journal_common::storage::PhotoStore;
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::polish::Polisher;
use crate::rate_limit::RateLimiter;
use crate::utils::jwt::TokenVerifier;

/// Shared handles, built once in `main` and cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<AppConfig>,
    pub verifier: Arc<dyn TokenVerifier>,
    pub polisher: Arc<dyn Polisher>,
    pub photo_store: Arc<dyn PhotoStore>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn polish_timeout(&self) -> Duration {
        Duration::from_secs(self.config.polish.timeout_secs)
    }
}

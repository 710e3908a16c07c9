pub mod auth;
pub mod directory;
pub mod error;
pub mod events;
pub mod relay;

use mindmate_db::DbPool;
use std::sync::Arc;

/// Snowflake worker id used for every id minted by this process.
pub const WORKER_ID: u16 = 1;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    /// Process-local fan-out groups keyed by identity.
    pub channels: Arc<events::ChannelRegistry>,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(db: DbPool, config: AppConfig) -> Self {
        Self {
            db,
            channels: Arc::new(events::ChannelRegistry::default()),
            config,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub jwt_secret: String,
    /// Origins allowed by CORS. Empty means any origin.
    pub allowed_origins: Vec<String>,
}

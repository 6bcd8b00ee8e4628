//! Application state: the collaborators `reelcore-orchestrator::protocol`
//! needs, wired up from `Settings`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use reelcore_config::Settings;
use reelcore_dispatch::{Broker, PgBroker};
use reelcore_state::{RedisStateStore, StateStore};
use sqlx::postgres::PgPoolOptions;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn StateStore>,
    pub broker: Arc<dyn Broker>,
    pub storage_root: PathBuf,
    pub lock_ttl: Duration,
    pub workflow_ttl: Duration,
}

impl AppState {
    /// Connect to the state store and broker described by `settings`.
    pub async fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let store = RedisStateStore::connect(&settings.redis_url)
            .await
            .map_err(|e| anyhow::anyhow!(e))?;
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(&settings.broker_database_url)
            .await?;
        let broker = PgBroker::new(pool);

        Ok(Self {
            store: Arc::new(store),
            broker: Arc::new(broker),
            storage_root: PathBuf::from(&settings.storage_root),
            lock_ttl: Duration::from_secs(settings.lock_ttl_seconds),
            workflow_ttl: Duration::from_secs(settings.workflow_ttl_seconds),
        })
    }
}

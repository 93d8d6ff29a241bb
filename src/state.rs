use crate::config::{AppConfig, PoolConfig};
use crate::store::{MemoryTokenStore, PgTokenStore, TokenStore};
use axum::extract::FromRef;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn TokenStore>,
}

impl AppState {
    /// Connect to Postgres using the environment configuration.
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let store = PgTokenStore::connect(&config.database_url, &config.pool).await?;
        Self::with_migrated_store(config, store).await
    }

    /// Bring the schema up to date before serving. A failed migration aborts start-up.
    pub async fn with_migrated_store(
        config: Arc<AppConfig>,
        store: PgTokenStore,
    ) -> anyhow::Result<Self> {
        store.migrate().await?;
        tracing::info!("database migrations applied");
        Ok(Self::from_parts(config, Arc::new(store)))
    }

    pub fn from_parts(config: Arc<AppConfig>, store: Arc<dyn TokenStore>) -> Self {
        Self { config, store }
    }

    /// State backed by an in-memory store, for tests and local experiments.
    pub fn in_memory(store: MemoryTokenStore) -> Self {
        let config = Arc::new(AppConfig {
            database_url: "memory://".into(),
            host: "127.0.0.1".into(),
            port: 0,
            request_timeout_secs: 30,
            pool: PoolConfig::default(),
        });
        Self::from_parts(config, Arc::new(store))
    }
}

impl FromRef<AppState> for Arc<dyn TokenStore> {
    fn from_ref(state: &AppState) -> Self {
        Arc::clone(&state.store)
    }
}

use std::time::Duration;

use quarry_core::cache::MemoryCache;
use quarry_core::error::AppError;
use quarry_core::query::CacheKey;
use quarry_core::traits::ResultCache;
use quarry_db::{Database, DatabaseConfig, PgResultCache};
use tokio::task::JoinHandle;

use crate::config::CacheMode;

/// How often expired PostgreSQL keys are deleted.
pub const PURGE_INTERVAL: Duration = Duration::from_secs(600);

/// The result cache selected at startup.
#[derive(Clone)]
pub enum CacheBackend {
    Memory(MemoryCache),
    Postgres { db: Database, cache: PgResultCache },
}

impl CacheBackend {
    /// Open the configured backend.
    ///
    /// A backend that cannot be reached is not fatal: this logs one warning
    /// and returns `None`, and the server runs with caching disabled.
    pub async fn open(mode: CacheMode) -> Option<Self> {
        match mode {
            CacheMode::Disabled => {
                tracing::info!("Result cache disabled");
                None
            }
            CacheMode::Memory => {
                tracing::info!("Using in-memory result cache");
                Some(Self::Memory(MemoryCache::new()))
            }
            CacheMode::Postgres => match Self::connect_postgres().await {
                Ok(backend) => {
                    tracing::info!("Using PostgreSQL result cache");
                    Some(backend)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Result cache unavailable, continuing without cache");
                    None
                }
            },
        }
    }

    async fn connect_postgres() -> Result<Self, AppError> {
        let db = Database::connect(&DatabaseConfig::from_env()?).await?;
        db.migrate().await?;
        let cache = db.result_cache();
        Ok(Self::Postgres { db, cache })
    }

    /// Name reported by the health endpoint.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Postgres { .. } => "postgres",
        }
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        match self {
            Self::Memory(_) => Ok(()),
            Self::Postgres { db, .. } => db.health_check().await,
        }
    }

    /// Delete expired keys from storage. moka evicts on its own, so only
    /// the PostgreSQL backend has work to do.
    pub async fn purge_expired(&self) -> Result<u64, AppError> {
        match self {
            Self::Memory(_) => Ok(0),
            Self::Postgres { cache, .. } => cache.purge_expired().await,
        }
    }

    /// Start a background task that purges expired keys every `every`.
    ///
    /// Returns `None` for backends that expire entries themselves.
    pub fn spawn_purge(&self, every: Duration) -> Option<JoinHandle<()>> {
        let Self::Postgres { .. } = self else {
            return None;
        };

        let backend = self.clone();
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match backend.purge_expired().await {
                    Ok(0) => {}
                    Ok(purged) => tracing::info!(purged, "Purged expired cache entries"),
                    Err(e) => tracing::warn!(error = %e, "Cache purge failed"),
                }
            }
        }))
    }

    pub async fn close(&self) {
        if let Self::Postgres { db, .. } = self {
            db.close().await;
        }
    }
}

impl ResultCache for CacheBackend {
    async fn get(&self, key: &CacheKey) -> Result<Vec<String>, AppError> {
        match self {
            Self::Memory(cache) => cache.get(key).await,
            Self::Postgres { cache, .. } => cache.get(key).await,
        }
    }

    async fn append(&self, key: &CacheKey, payload: &str) -> Result<(), AppError> {
        match self {
            Self::Memory(cache) => cache.append(key, payload).await,
            Self::Postgres { cache, .. } => cache.append(key, payload).await,
        }
    }

    async fn expire(&self, key: &CacheKey, ttl: Duration) -> Result<(), AppError> {
        match self {
            Self::Memory(cache) => cache.expire(key, ttl).await,
            Self::Postgres { cache, .. } => cache.expire(key, ttl).await,
        }
    }
}

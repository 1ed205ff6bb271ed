//! In-process result cache backed by moka.
//!
//! Each key holds an ordered list of serialized results. A list never
//! expires on its own: the TTL starts only once [`ResultCache::expire`] is
//! called, which the search does after every site has finished.

use std::time::{Duration, Instant};

use moka::Expiry;
use moka::future::Cache;
use moka::ops::compute::Op;

use crate::error::AppError;
use crate::query::CacheKey;
use crate::traits::ResultCache;

/// Maximum number of cached queries held in memory.
pub const DEFAULT_MAX_KEYS: u64 = 10_000;

#[derive(Debug, Clone)]
struct CachedList {
    items: Vec<String>,
    /// Set only by `expire`; consumed by [`ListExpiry`] on that write.
    reset_ttl: Option<Duration>,
}

struct ListExpiry;

impl Expiry<String, CachedList> for ListExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedList,
        _created_at: Instant,
    ) -> Option<Duration> {
        value.reset_ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CachedList,
        _updated_at: Instant,
        duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.reset_ttl.or(duration_until_expiry)
    }
}

/// moka-backed [`ResultCache`].
///
/// Appends go through moka's per-key entry API, which serializes
/// concurrent writers for the same key.
#[derive(Clone)]
pub struct MemoryCache {
    inner: Cache<String, CachedList>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_KEYS)
    }

    pub fn with_capacity(max_keys: u64) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_keys)
            .expire_after(ListExpiry)
            .build();
        Self { inner }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultCache for MemoryCache {
    async fn get(&self, key: &CacheKey) -> Result<Vec<String>, AppError> {
        Ok(self
            .inner
            .get(key.as_str())
            .await
            .map(|list| list.items)
            .unwrap_or_default())
    }

    async fn append(&self, key: &CacheKey, payload: &str) -> Result<(), AppError> {
        let payload = payload.to_string();
        self.inner
            .entry(key.as_str().to_string())
            .and_upsert_with(|existing| async move {
                let mut items = existing.map(|e| e.into_value().items).unwrap_or_default();
                items.push(payload);
                CachedList {
                    items,
                    reset_ttl: None,
                }
            })
            .await;
        Ok(())
    }

    async fn expire(&self, key: &CacheKey, ttl: Duration) -> Result<(), AppError> {
        self.inner
            .entry(key.as_str().to_string())
            .and_compute_with(|existing| async move {
                match existing {
                    Some(entry) => Op::Put(CachedList {
                        items: entry.into_value().items,
                        reset_ttl: Some(ttl),
                    }),
                    None => Op::Nop,
                }
            })
            .await;
        Ok(())
    }
}

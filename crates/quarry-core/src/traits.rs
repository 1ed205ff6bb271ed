use std::future::Future;
use std::time::Duration;

use crate::error::AppError;
use crate::models::{SearchResult, SiteDescriptor};
use crate::query::{CacheKey, SearchQuery};

/// Fetches the raw HTML of a site's search page.
///
/// Implementations log at debug level at most; the caller owns failure
/// reporting so every site failure is logged once, with the site name.
pub trait Fetcher: Send + Sync + Clone + 'static {
    fn fetch(
        &self,
        site: &SiteDescriptor,
        url: &str,
    ) -> impl Future<Output = Result<String, AppError>> + Send;
}

/// Applies a site's selector rules to a fetched page.
///
/// Returns `None` whenever the page holds no validated match; internal
/// failures (bad markup, missing elements) are folded into `None`.
pub trait Extractor: Send + Sync + Clone + 'static {
    fn extract(
        &self,
        html: &str,
        site: &SiteDescriptor,
        search_url: &str,
        query: &SearchQuery,
    ) -> Option<SearchResult>;
}

/// Key-value store holding an ordered list of serialized results per key.
///
/// `append` must be safe under concurrent calls for the same key: the
/// search fans out one task per site and each appends independently.
pub trait ResultCache: Send + Sync + Clone + 'static {
    /// All payloads for `key` in append order; empty if absent or expired.
    fn get(&self, key: &CacheKey) -> impl Future<Output = Result<Vec<String>, AppError>> + Send;

    /// Append one payload to the end of the list for `key`.
    fn append(
        &self,
        key: &CacheKey,
        payload: &str,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Set or refresh the time-to-live of `key`. No-op if `key` is absent.
    fn expire(
        &self,
        key: &CacheKey,
        ttl: Duration,
    ) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// A no-op ResultCache: every read misses and writes are dropped.
#[derive(Debug, Clone)]
pub struct NullCache;

impl ResultCache for NullCache {
    async fn get(&self, _key: &CacheKey) -> Result<Vec<String>, AppError> {
        Ok(vec![])
    }

    async fn append(&self, _key: &CacheKey, _payload: &str) -> Result<(), AppError> {
        Ok(())
    }

    async fn expire(&self, _key: &CacheKey, _ttl: Duration) -> Result<(), AppError> {
        Ok(())
    }
}

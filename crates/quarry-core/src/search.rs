use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_stream::wrappers::ReceiverStream;
use tracing::Instrument;
use uuid::Uuid;

use crate::catalog::SiteCatalog;
use crate::models::{SerializedResult, SiteDescriptor, StreamEvent};
use crate::query::{CacheKey, SearchQuery};
use crate::traits::{Extractor, Fetcher, ResultCache};

/// Bound on a single outbound page request.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(15);
/// Bound on waiting for a readiness selector in a rendered page.
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(15);
/// Lifetime of a completed cache entry.
pub const CACHE_TTL: Duration = Duration::from_secs(3600);

/// Stream of events for one search. Ends after [`StreamEvent::Completed`].
pub type SearchStream = ReceiverStream<StreamEvent>;

/// Timing knobs for a search.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub fetch_timeout: Duration,
    pub ready_timeout: Duration,
    pub cache_ttl: Duration,
    /// Events buffered between the search and a slow reader.
    pub channel_capacity: usize,
}

impl SearchConfig {
    /// Hard cap on one site task: twice the site's own timeout budget.
    pub fn site_deadline(&self, site: &SiteDescriptor) -> Duration {
        let budget = if site.js_required {
            self.fetch_timeout + self.ready_timeout
        } else {
            self.fetch_timeout
        };
        budget * 2
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            ready_timeout: DEFAULT_READY_TIMEOUT,
            cache_ttl: CACHE_TTL,
            channel_capacity: 64,
        }
    }
}

/// Orchestrates one query across every site: cache check → fan-out of
/// fetch → extract per site → incremental emit + cache append → fan-in →
/// expiry + completion.
///
/// Generic over the fetcher, extractor and cache so tests run without real
/// HTTP, browsers or stores. With no cache the service runs in
/// cache-disabled mode: every query is scraped live.
#[derive(Clone)]
pub struct SearchService<F, E, C>
where
    F: Fetcher,
    E: Extractor,
    C: ResultCache,
{
    catalog: Arc<SiteCatalog>,
    fetcher: F,
    extractor: E,
    cache: Option<C>,
    config: SearchConfig,
}

/// Everything one fan-out task needs, owned by that task.
struct SiteJob {
    site: Arc<SiteDescriptor>,
    search_url: String,
    query: Arc<SearchQuery>,
    key: Arc<CacheKey>,
}

impl<F, E, C> SearchService<F, E, C>
where
    F: Fetcher,
    E: Extractor,
    C: ResultCache,
{
    /// Create a SearchService without a result cache.
    pub fn new(catalog: Arc<SiteCatalog>, fetcher: F, extractor: E) -> Self {
        Self {
            catalog,
            fetcher,
            extractor,
            cache: None,
            config: SearchConfig::default(),
        }
    }

    /// Create a SearchService backed by a result cache.
    pub fn with_cache(catalog: Arc<SiteCatalog>, fetcher: F, extractor: E, cache: C) -> Self {
        Self {
            catalog,
            fetcher,
            extractor,
            cache: Some(cache),
            config: SearchConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SearchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn catalog(&self) -> &SiteCatalog {
        &self.catalog
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache.is_some()
    }

    /// Start a search and return its event stream.
    ///
    /// The search runs on its own task. Dropping the stream does not cancel
    /// it: in-flight sites run to completion or to their deadline, and the
    /// cache entry is still written.
    pub fn search(&self, query: SearchQuery) -> SearchStream {
        let (tx, rx) = mpsc::channel(self.config.channel_capacity);
        let span = tracing::info_span!(
            "search",
            search_id = %Uuid::new_v4(),
            key = %query.cache_key(),
        );
        let service = self.clone();
        tokio::spawn(service.run(query, tx).instrument(span));
        ReceiverStream::new(rx)
    }

    async fn run(self, query: SearchQuery, tx: mpsc::Sender<StreamEvent>) {
        let key = query.cache_key();

        // 1. Cache
        if let Some(cached) = self.cached_results(&key).await {
            tracing::info!(query = %query, results = cached.len(), "Cache hit");
            let _ = tx.send(StreamEvent::Cached).await;
            for payload in cached {
                let event = StreamEvent::Result(SerializedResult::from_cached(payload));
                let _ = tx.send(event).await;
            }
            let _ = tx.send(StreamEvent::Completed).await;
            return;
        }

        // 2. Fan out
        tracing::info!(query = %query, "Cache miss, starting live scrape");
        let _ = tx.send(StreamEvent::Searching).await;
        let started = Instant::now();

        let query = Arc::new(query);
        let key = Arc::new(key);
        let mut tasks = JoinSet::new();

        for site in self.catalog.iter() {
            let deadline = self.config.site_deadline(site);
            let job = SiteJob {
                site: Arc::clone(site),
                search_url: site.search_url(&query),
                query: Arc::clone(&query),
                key: Arc::clone(&key),
            };
            let site_name = site.name.clone();
            let task = scrape_site(
                job,
                self.fetcher.clone(),
                self.extractor.clone(),
                self.cache.clone(),
                tx.clone(),
            );

            tasks.spawn(
                async move {
                    match tokio::time::timeout(deadline, task).await {
                        Ok(found) => found,
                        Err(_) => {
                            tracing::warn!(
                                site = %site_name,
                                deadline_secs = deadline.as_secs_f64(),
                                "Site exceeded its deadline"
                            );
                            false
                        }
                    }
                }
                .in_current_span(),
            );
        }

        // 3. Fan in
        let mut found = 0usize;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(true) => found += 1,
                Ok(false) => {}
                Err(e) => tracing::error!(error = %e, "Site task aborted"),
            }
        }

        // 4. Seal the cache entry
        if let Some(cache) = &self.cache
            && let Err(e) = cache.expire(&key, self.config.cache_ttl).await
        {
            tracing::warn!(error = %e, "Failed to set cache expiry");
        }

        tracing::info!(
            sites = self.catalog.len(),
            results = found,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Live scrape completed"
        );
        let _ = tx.send(StreamEvent::Completed).await;
    }

    /// Cached payloads for `key`, or `None` on a miss or a cache failure.
    async fn cached_results(&self, key: &CacheKey) -> Option<Vec<String>> {
        let cache = self.cache.as_ref()?;
        match cache.get(key).await {
            Ok(items) if !items.is_empty() => Some(items),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Cache read failed, searching live");
                None
            }
        }
    }
}

/// Fetch, extract, emit and cache one site. Returns true if a result was found.
///
/// Every failure stays inside this task: it is logged and yields no event.
async fn scrape_site<F, E, C>(
    job: SiteJob,
    fetcher: F,
    extractor: E,
    cache: Option<C>,
    tx: mpsc::Sender<StreamEvent>,
) -> bool
where
    F: Fetcher,
    E: Extractor,
    C: ResultCache,
{
    let html = match fetcher.fetch(&job.site, &job.search_url).await {
        Ok(html) => html,
        Err(e) => {
            tracing::warn!(site = %job.site.name, error = %e, "Fetch failed");
            return false;
        }
    };

    // Parsing a large page is CPU work; keep it off the async workers.
    let site = Arc::clone(&job.site);
    let search_url = job.search_url.clone();
    let query = Arc::clone(&job.query);
    let extracted = tokio::task::spawn_blocking(move || {
        extractor.extract(&html, &site, &search_url, &query)
    })
    .await;

    let result = match extracted {
        Ok(Some(result)) => result,
        Ok(None) => {
            tracing::debug!(site = %job.site.name, "No matching result");
            return false;
        }
        Err(e) => {
            tracing::warn!(site = %job.site.name, error = %e, "Extraction aborted");
            return false;
        }
    };

    let payload = match SerializedResult::encode(&result) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!(site = %job.site.name, error = %e, "Failed to encode result");
            return false;
        }
    };

    tracing::info!(site = %job.site.name, title = %result.result.title, "Result found");
    let _ = tx.send(StreamEvent::Result(payload.clone())).await;

    if let Some(cache) = &cache
        && let Err(e) = cache.append(&job.key, payload.as_str()).await
    {
        tracing::warn!(site = %job.site.name, error = %e, "Failed to cache result");
    }

    true
}

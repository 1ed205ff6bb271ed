//! Test utilities: mock implementations of the core traits.
//!
//! Handwritten mocks for dependency injection in unit tests. All mocks use
//! `Arc<Mutex<_>>` for interior mutability, so clones share state and tests
//! can assert on recorded calls.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::AppError;
use crate::models::{
    ExtractMethod, LinkRule, ResultLink, SearchResult, SiteDescriptor, TitleRule,
};
use crate::normalize::contains_all_terms;
use crate::query::{CacheKey, SearchQuery};
use crate::traits::{Extractor, Fetcher, ResultCache};

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// Create a valid static site descriptor at `https://{id}.example`.
pub fn make_site(id: &str, name: &str) -> SiteDescriptor {
    SiteDescriptor {
        id: id.to_string(),
        name: name.to_string(),
        search_url_template: format!("https://{id}.example/search?q={{query}}"),
        js_required: false,
        wait_for_selector: None,
        result_item_selector: "div.result".to_string(),
        title_rule: TitleRule {
            selector: Some("a".to_string()),
            method: ExtractMethod::Text,
        },
        link_rule: LinkRule {
            selector: Some("a".to_string()),
            attr: "href".to_string(),
        },
    }
}

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// Mock fetcher serving a canned page per site id.
///
/// Sites without a page fail with an HTTP error.
#[derive(Clone, Default)]
pub struct MockFetcher {
    pages: Arc<Mutex<HashMap<String, Result<String, String>>>>,
    delays: Arc<Mutex<HashMap<String, Duration>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, site_id: &str, html: &str) -> Self {
        self.pages
            .lock()
            .unwrap()
            .insert(site_id.to_string(), Ok(html.to_string()));
        self
    }

    pub fn with_error(self, site_id: &str, message: &str) -> Self {
        self.pages
            .lock()
            .unwrap()
            .insert(site_id.to_string(), Err(message.to_string()));
        self
    }

    /// Delay the response for `site_id` before returning it.
    pub fn with_delay(self, site_id: &str, delay: Duration) -> Self {
        self.delays
            .lock()
            .unwrap()
            .insert(site_id.to_string(), delay);
        self
    }

    /// Site ids fetched so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, site: &SiteDescriptor, _url: &str) -> Result<String, AppError> {
        self.calls.lock().unwrap().push(site.id.clone());

        let delay = self.delays.lock().unwrap().get(&site.id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let page = self.pages.lock().unwrap().get(&site.id).cloned();
        match page {
            Some(Ok(html)) => Ok(html),
            Some(Err(message)) => Err(AppError::HttpError(message)),
            None => Err(AppError::HttpError(format!("no page for {}", site.id))),
        }
    }
}

// ---------------------------------------------------------------------------
// MockExtractor
// ---------------------------------------------------------------------------

/// Mock extractor that treats the whole page as the result title.
///
/// Matches when the trimmed page contains every query term; the link is the
/// search URL with a `#result` fragment.
#[derive(Clone)]
pub struct MockExtractor;

impl Extractor for MockExtractor {
    fn extract(
        &self,
        html: &str,
        site: &SiteDescriptor,
        search_url: &str,
        query: &SearchQuery,
    ) -> Option<SearchResult> {
        let title = html.trim();
        if !contains_all_terms(title, &query.terms()) {
            return None;
        }
        Some(SearchResult {
            site_id: site.id.clone(),
            site_name: site.name.clone(),
            result: ResultLink {
                title: title.to_string(),
                link: format!("{search_url}#result"),
            },
            search_link: search_url.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// MockCache
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MockEntry {
    items: Vec<String>,
    ttl: Option<Duration>,
}

/// Mock cache backed by an in-memory map. Never expires anything; the last
/// TTL set per key is recorded for assertions.
#[derive(Clone, Default)]
pub struct MockCache {
    entries: Arc<Mutex<HashMap<String, MockEntry>>>,
    failing: bool,
}

impl MockCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache whose every operation fails.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// Pre-populate `key` (a full cache key such as `search:zelda`).
    pub fn with_entry(self, key: &str, items: &[&str]) -> Self {
        self.entries.lock().unwrap().insert(
            key.to_string(),
            MockEntry {
                items: items.iter().map(|s| s.to_string()).collect(),
                ttl: None,
            },
        );
        self
    }

    pub fn items(&self, key: &str) -> Vec<String> {
        self.entries
            .lock()
            .unwrap()
            .get(key)
            .map(|e| e.items.clone())
            .unwrap_or_default()
    }

    pub fn ttl(&self, key: &str) -> Option<Duration> {
        self.entries.lock().unwrap().get(key).and_then(|e| e.ttl)
    }

    fn check(&self) -> Result<(), AppError> {
        if self.failing {
            Err(AppError::CacheError("connection refused".into()))
        } else {
            Ok(())
        }
    }
}

impl ResultCache for MockCache {
    async fn get(&self, key: &CacheKey) -> Result<Vec<String>, AppError> {
        self.check()?;
        Ok(self.items(key.as_str()))
    }

    async fn append(&self, key: &CacheKey, payload: &str) -> Result<(), AppError> {
        self.check()?;
        self.entries
            .lock()
            .unwrap()
            .entry(key.as_str().to_string())
            .or_default()
            .items
            .push(payload.to_string());
        Ok(())
    }

    async fn expire(&self, key: &CacheKey, ttl: Duration) -> Result<(), AppError> {
        self.check()?;
        if let Some(entry) = self.entries.lock().unwrap().get_mut(key.as_str()) {
            entry.ttl = Some(ttl);
        }
        Ok(())
    }
}

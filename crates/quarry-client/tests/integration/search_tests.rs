//! `SearchService` driven end to end through the real selector extractor.

use std::sync::Arc;
use std::time::{Duration, Instant};

use quarry_client::SelectorExtractor;
use quarry_core::search::CACHE_TTL;
use quarry_core::testutil::{MockCache, MockFetcher, make_site};
use quarry_core::{SearchConfig, SearchQuery, SearchResult, SearchService, SiteCatalog, StreamEvent};
use tokio_stream::StreamExt;

const MATCHING_PAGE: &str = r#"
<html><body>
  <div class="result"><a href="/game/42">The Legend of  Zelda Free Download</a></div>
  <div class="result"><a href="/game/43">Zelda II</a></div>
</body></html>
"#;

const NO_ITEMS_PAGE: &str = r#"
<html><body>
  <div class="empty-state"><a href="/game/1">Zelda</a></div>
</body></html>
"#;

fn fast_config() -> SearchConfig {
    SearchConfig {
        fetch_timeout: Duration::from_millis(100),
        ready_timeout: Duration::from_millis(100),
        ..SearchConfig::default()
    }
}

fn catalog() -> Arc<SiteCatalog> {
    let sites = vec![
        make_site("slow", "Slow"),
        make_site("hit", "Hit"),
        make_site("miss", "Miss"),
    ];
    Arc::new(SiteCatalog::new(sites).unwrap())
}

#[tokio::test]
async fn timeout_match_and_empty_page_through_selector_extractor() {
    let fetcher = MockFetcher::new()
        .with_page("slow", MATCHING_PAGE)
        .with_delay("slow", Duration::from_secs(5))
        .with_page("hit", MATCHING_PAGE)
        .with_page("miss", NO_ITEMS_PAGE);
    let cache = MockCache::new();
    let svc = SearchService::with_cache(catalog(), fetcher, SelectorExtractor::new(), cache.clone())
        .with_config(fast_config());

    let started = Instant::now();
    let events: Vec<StreamEvent> = svc.search(SearchQuery::new("zelda").unwrap()).collect().await;

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(events.len(), 3);
    assert_eq!(events[0], StreamEvent::Searching);
    assert_eq!(events[2], StreamEvent::Completed);

    let StreamEvent::Result(payload) = &events[1] else {
        panic!("expected a result event, got {:?}", events[1]);
    };
    let result = payload.decode().unwrap();
    assert_eq!(result.site_id, "hit");
    assert_eq!(result.site_name, "Hit");
    assert_eq!(result.result.title, "The Legend of Zelda");
    assert_eq!(result.result.link, "https://hit.example/game/42");
    assert_eq!(result.search_link, "https://hit.example/search?q=zelda");

    let cached = cache.items("search:zelda");
    assert_eq!(cached.len(), 1);
    assert_eq!(serde_json::from_str::<SearchResult>(&cached[0]).unwrap(), result);
    assert_eq!(cache.ttl("search:zelda"), Some(CACHE_TTL));
}

#[tokio::test]
async fn page_without_result_items_caches_nothing() {
    let fetcher = MockFetcher::new().with_page("miss", NO_ITEMS_PAGE);
    let cache = MockCache::new();
    let catalog = Arc::new(SiteCatalog::new(vec![make_site("miss", "Miss")]).unwrap());
    let svc = SearchService::with_cache(catalog, fetcher, SelectorExtractor::new(), cache.clone())
        .with_config(fast_config());

    let events: Vec<StreamEvent> = svc.search(SearchQuery::new("zelda").unwrap()).collect().await;

    assert_eq!(events, vec![StreamEvent::Searching, StreamEvent::Completed]);
    assert!(cache.items("search:zelda").is_empty());
    assert_eq!(cache.ttl("search:zelda"), None);
}

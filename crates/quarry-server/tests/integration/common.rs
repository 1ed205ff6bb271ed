use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::Request;
use http_body_util::BodyExt;
use tower::ServiceExt;

use quarry_core::cache::MemoryCache;
use quarry_core::testutil::{MockExtractor, MockFetcher, make_site};
use quarry_core::{SearchService, SiteCatalog};
use quarry_server::cache::CacheBackend;
use quarry_server::routes;
use quarry_server::state::AppState;

pub struct TestApp {
    pub router: Router,
    pub fetcher: MockFetcher,
}

/// Router over three mock sites backed by an in-memory cache.
///
/// Pages: "Beta" and "Alpha" mention Zelda, "Gamma" does not.
pub fn setup_test_app() -> TestApp {
    let fetcher = MockFetcher::new()
        .with_page("gamma", "Mario Kart 8")
        .with_page("beta", "Zelda: Tears of the Kingdom")
        .with_page("alpha", "The Legend of Zelda");
    let cache = CacheBackend::Memory(MemoryCache::new());

    let catalog = SiteCatalog::new(vec![
        make_site("gamma", "Gamma"),
        make_site("beta", "Beta"),
        make_site("alpha", "Alpha"),
    ])
    .expect("valid test catalog");

    let service = SearchService::with_cache(
        Arc::new(catalog),
        fetcher.clone(),
        MockExtractor,
        cache.clone(),
    );

    let state = Arc::new(AppState {
        search: Box::new(service),
        cache: Some(cache),
    });

    TestApp {
        router: routes::router(state),
        fetcher,
    }
}

/// Router with no cache and an empty catalog.
pub fn setup_uncached_app() -> Router {
    let service = SearchService::<_, _, CacheBackend>::new(
        Arc::new(SiteCatalog::default()),
        MockFetcher::new(),
        MockExtractor,
    );
    let state = Arc::new(AppState {
        search: Box::new(service),
        cache: None,
    });
    routes::router(state)
}

/// GET `uri` and return the status plus the full body as text.
pub async fn get(router: &Router, uri: &str) -> (axum::http::StatusCode, String) {
    let response = router
        .clone()
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

/// The JSON payload of every `data:` line in an SSE body.
pub fn sse_payloads(body: &str) -> Vec<serde_json::Value> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| serde_json::from_str(data.trim()).unwrap())
        .collect()
}

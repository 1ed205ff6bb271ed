use axum::http::StatusCode;
use serde_json::json;

use crate::integration::common::{get, setup_test_app, setup_uncached_app, sse_payloads};

#[tokio::test]
async fn health_reports_memory_cache() {
    let app = setup_test_app();

    let (status, body) = get(&app.router, "/health").await;

    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["cache"], "memory");
}

#[tokio::test]
async fn health_reports_disabled_cache() {
    let router = setup_uncached_app();

    let (status, body) = get(&router, "/health").await;

    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["cache"], "disabled");
}

#[tokio::test]
async fn missing_query_returns_400() {
    let app = setup_test_app();

    let (status, body) = get(&app.router, "/api/search/stream").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["error"], "invalid_query");
    assert!(app.fetcher.calls().is_empty());
}

#[tokio::test]
async fn blank_query_returns_400() {
    let app = setup_test_app();

    let (status, _) = get(&app.router, "/api/search/stream?query=%20%20").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn search_streams_searching_results_completed() {
    let app = setup_test_app();

    let (status, body) = get(&app.router, "/api/search/stream?query=zelda").await;

    assert_eq!(status, StatusCode::OK);
    let events = sse_payloads(&body);
    assert_eq!(events.first(), Some(&json!({"status": "searching"})));
    assert_eq!(events.last(), Some(&json!({"status": "completed"})));

    let mut sites: Vec<_> = events[1..events.len() - 1]
        .iter()
        .map(|e| e["site_id"].as_str().unwrap().to_string())
        .collect();
    sites.sort();
    assert_eq!(sites, vec!["alpha", "beta"]);
    assert_eq!(app.fetcher.calls().len(), 3);
}

#[tokio::test]
async fn repeated_query_is_replayed_from_cache() {
    let app = setup_test_app();

    let (_, first) = get(&app.router, "/api/search/stream?query=Zelda").await;
    let (status, second) = get(&app.router, "/api/search/stream?query=%20zelda%20").await;

    assert_eq!(status, StatusCode::OK);
    let first = sse_payloads(&first);
    let second = sse_payloads(&second);

    assert_eq!(second.first(), Some(&json!({"status": "cached"})));
    assert_eq!(second.last(), Some(&json!({"status": "completed"})));
    let site_ids = |events: &[serde_json::Value]| {
        let mut ids: Vec<String> = events[1..events.len() - 1]
            .iter()
            .map(|e| e["site_id"].as_str().unwrap().to_string())
            .collect();
        ids.sort();
        ids
    };
    assert_eq!(site_ids(&first), site_ids(&second));
    assert_eq!(site_ids(&second), vec!["alpha", "beta"]);
    assert_eq!(app.fetcher.calls().len(), 3, "replay must not fetch");
}

#[tokio::test]
async fn search_with_no_matches_still_completes() {
    let app = setup_test_app();

    let (status, body) = get(&app.router, "/api/search/stream?query=metroid").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        sse_payloads(&body),
        vec![json!({"status": "searching"}), json!({"status": "completed"})]
    );
}

#[tokio::test]
async fn sites_are_listed_in_name_order() {
    let app = setup_test_app();

    let (status, body) = get(&app.router, "/api/sites").await;

    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["total"], 3);
    let names: Vec<_> = json["sites"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Alpha", "Beta", "Gamma"]);
    assert_eq!(json["sites"][0]["js_required"], false);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = setup_test_app();

    let (status, body) = get(&app.router, "/api-docs/openapi.json").await;

    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert!(json["paths"]["/api/search/stream"].is_object());
}

use std::convert::Infallible;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use futures::Stream;
use tokio_stream::StreamExt;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use quarry_core::SearchQuery;

use crate::dto::{HealthResponse, SearchParams, SiteListResponse, SiteResponse};
use crate::error::ApiError;
use crate::openapi::ApiDoc;
use crate::state::AppState;

/// Build the full router with all routes.
pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/api/search/stream", get(search_stream))
        .route("/api/sites", get(list_sites));

    let public = Router::new()
        .route("/health", get(health))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    public.merge(api).with_state(state)
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

/// Stream search results as server-sent events.
///
/// Each event's `data:` line is JSON: `{"status": "searching"}` or
/// `{"status": "cached"}` first, then one object per result, then
/// `{"status": "completed"}`.
#[utoipa::path(
    get,
    path = "/api/search/stream",
    params(SearchParams),
    responses(
        (status = 200, description = "text/event-stream of search events"),
        (status = 400, description = "Missing or empty query", body = crate::dto::ErrorResponse),
    ),
    tag = "search"
)]
pub async fn search_stream(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let query = SearchQuery::new(params.query.unwrap_or_default())?;

    let events = state
        .search
        .search(query)
        .map(|event| Ok(Event::default().data(event.to_json())));

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

// ---------------------------------------------------------------------------
// Sites
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/sites",
    responses(
        (status = 200, description = "Configured sites in name order", body = SiteListResponse),
    ),
    tag = "sites"
)]
pub async fn list_sites(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let catalog = state.search.catalog();
    let response = SiteListResponse {
        sites: catalog.iter().map(|site| SiteResponse::from(&**site)).collect(),
        total: catalog.len(),
    };

    axum::Json(response)
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Cache backend is unreachable", body = HealthResponse),
    ),
    tag = "system"
)]
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let cache_status = match &state.cache {
        None => "disabled",
        Some(cache) => match cache.health_check().await {
            Ok(()) => cache.kind(),
            Err(e) => {
                tracing::warn!(error = %e, "Cache health check failed");
                "error"
            }
        },
    };

    let (status, label) = if cache_status == "error" {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    } else {
        (StatusCode::OK, "healthy")
    };

    let response = HealthResponse {
        status: label,
        cache: cache_status,
    };

    (status, axum::Json(response))
}

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Quarry API",
        version = "0.1.0",
        description = "Concurrent multi-site search with results streamed as server-sent events."
    ),
    paths(
        crate::routes::search_stream,
        crate::routes::list_sites,
        crate::routes::health,
    ),
    components(schemas(
        crate::dto::SiteResponse,
        crate::dto::SiteListResponse,
        crate::dto::HealthResponse,
        crate::dto::ErrorResponse,
    )),
    tags(
        (name = "search", description = "Streaming search"),
        (name = "sites", description = "Configured site catalog"),
        (name = "system", description = "Health and system status"),
    )
)]
pub struct ApiDoc;

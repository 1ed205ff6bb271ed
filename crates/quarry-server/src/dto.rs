use serde::{Deserialize, Serialize};

use quarry_core::SiteDescriptor;

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct SearchParams {
    /// Free-text search query.
    pub query: Option<String>,
}

// ---------------------------------------------------------------------------
// Sites
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SiteResponse {
    pub id: String,
    pub name: String,
    pub js_required: bool,
}

impl From<&SiteDescriptor> for SiteResponse {
    fn from(site: &SiteDescriptor) -> Self {
        Self {
            id: site.id.clone(),
            name: site.name.clone(),
            js_required: site.js_required,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SiteListResponse {
    pub sites: Vec<SiteResponse>,
    pub total: usize,
}

// ---------------------------------------------------------------------------
// Health / errors
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    /// `memory`, `postgres`, `disabled`, or `error`.
    pub cache: &'static str,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

use thiserror::Error;

/// Application-wide error types for Quarry.
#[derive(Error, Debug)]
pub enum AppError {
    /// HTTP request failed (fetching a search page).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Headless browser could not launch, navigate, or render.
    #[error("Browser error: {0}")]
    BrowserError(String),

    /// Site descriptor catalog could not be loaded or failed validation.
    #[error("Catalog error: {0}")]
    CatalogError(String),

    /// Result cache backend failed (connect, read, append, expire).
    #[error("Cache error: {0}")]
    CacheError(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The caller supplied a missing or empty query.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Returns true if this error was caused by caller input.
    ///
    /// These are the only errors reported back to the caller; everything
    /// else is logged and degraded inside the search pipeline.
    pub fn is_user_error(&self) -> bool {
        matches!(self, AppError::InvalidQuery(_))
    }
}

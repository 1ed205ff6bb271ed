use std::fmt;

use url::form_urlencoded;

use crate::error::AppError;

/// A caller-supplied search query.
///
/// Keeps the raw text: terms and the outbound URL are derived from it as
/// given, while the cache key uses the trimmed, lower-cased form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    raw: String,
}

impl SearchQuery {
    /// Rejects a missing (empty) or whitespace-only query.
    pub fn new(raw: impl Into<String>) -> Result<Self, AppError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(AppError::InvalidQuery(
                "Query parameter is required".to_string(),
            ));
        }
        Ok(Self { raw })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whitespace-separated terms, all of which a title must contain.
    pub fn terms(&self) -> Vec<&str> {
        self.raw.split_whitespace().collect()
    }

    /// Form-urlencoded query (space becomes `+`).
    ///
    /// Only RFC 3986 unreserved characters stay literal: `*` is escaped and
    /// `~` is not, unlike plain `application/x-www-form-urlencoded`.
    pub fn url_encoded(&self) -> String {
        let encoded: String = form_urlencoded::byte_serialize(self.raw.as_bytes()).collect();
        encoded.replace('*', "%2A").replace("%7E", "~")
    }

    pub fn cache_key(&self) -> CacheKey {
        CacheKey::for_query(self)
    }
}

impl fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Cache key for a query: `"search:" + trimmed lower-cased query`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn for_query(query: &SearchQuery) -> Self {
        Self(format!("search:{}", query.raw.trim().to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

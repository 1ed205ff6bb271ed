use quarry_core::search::SearchStream;
use quarry_core::traits::{Extractor, Fetcher, ResultCache};
use quarry_core::{SearchQuery, SearchService, SiteCatalog};

use crate::cache::CacheBackend;

/// The search capability the routes need, independent of which fetcher,
/// extractor and cache the service was built with.
pub trait SearchBackend: Send + Sync {
    fn search(&self, query: SearchQuery) -> SearchStream;
    fn catalog(&self) -> &SiteCatalog;
}

impl<F, E, C> SearchBackend for SearchService<F, E, C>
where
    F: Fetcher,
    E: Extractor,
    C: ResultCache,
{
    fn search(&self, query: SearchQuery) -> SearchStream {
        SearchService::search(self, query)
    }

    fn catalog(&self) -> &SiteCatalog {
        SearchService::catalog(self)
    }
}

/// Shared application state, available to all route handlers via `State<Arc<AppState>>`.
pub struct AppState {
    pub search: Box<dyn SearchBackend>,
    /// The cache the search service writes to, if any; used for health reporting.
    pub cache: Option<CacheBackend>,
}

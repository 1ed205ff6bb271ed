pub mod cache;
pub mod catalog;
pub mod dispatch;
pub mod error;
pub mod models;
pub mod normalize;
pub mod query;
pub mod search;
pub mod traits;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use cache::MemoryCache;
pub use catalog::SiteCatalog;
pub use dispatch::SiteFetcher;
pub use error::AppError;
pub use models::{SearchResult, SerializedResult, SiteDescriptor, StreamEvent};
pub use query::{CacheKey, SearchQuery};
pub use search::{SearchConfig, SearchService, SearchStream};
pub use traits::{Extractor, Fetcher, NullCache, ResultCache};

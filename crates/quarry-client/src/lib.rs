pub mod browser_fetcher;
pub mod extractor;
pub mod fetcher;

pub use browser_fetcher::BrowserFetcher;
pub use extractor::SelectorExtractor;
pub use fetcher::StaticFetcher;

use quarry_core::dispatch::SiteFetcher;

/// The production fetcher: static HTTP for plain sites, headless Chromium
/// for `js_required` ones.
pub type DefaultFetcher = SiteFetcher<StaticFetcher, BrowserFetcher>;

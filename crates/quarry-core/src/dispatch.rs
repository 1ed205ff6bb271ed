use crate::error::AppError;
use crate::models::SiteDescriptor;
use crate::traits::Fetcher;

/// Routes each site to the static or the browser fetch path.
///
/// The choice is a static property of the descriptor (`js_required`),
/// made once per dispatch.
#[derive(Clone)]
pub struct SiteFetcher<S, B> {
    static_fetcher: S,
    browser_fetcher: B,
}

impl<S: Fetcher, B: Fetcher> SiteFetcher<S, B> {
    pub fn new(static_fetcher: S, browser_fetcher: B) -> Self {
        Self {
            static_fetcher,
            browser_fetcher,
        }
    }
}

impl<S: Fetcher, B: Fetcher> Fetcher for SiteFetcher<S, B> {
    async fn fetch(&self, site: &SiteDescriptor, url: &str) -> Result<String, AppError> {
        if site.js_required {
            self.browser_fetcher.fetch(site, url).await
        } else {
            self.static_fetcher.fetch(site, url).await
        }
    }
}

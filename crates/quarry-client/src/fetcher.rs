use std::time::Duration;

use quarry_core::error::AppError;
use quarry_core::models::SiteDescriptor;
use quarry_core::search::DEFAULT_FETCH_TIMEOUT;
use quarry_core::traits::Fetcher;
use reqwest::Client;
use reqwest::redirect::Policy;

/// User-Agent sent on every static fetch. Several catalog sites serve an
/// empty or bot page to non-browser agents.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/98.0.4758.82 Safari/537.36";

const MAX_REDIRECTS: usize = 10;

/// Plain HTTP fetcher using reqwest.
///
/// Clones share one connection pool, so every static site in a search
/// reuses the same client.
#[derive(Clone)]
pub struct StaticFetcher {
    client: Client,
    timeout_secs: u64,
}

impl StaticFetcher {
    pub fn new() -> Result<Self, AppError> {
        Self::with_timeout(DEFAULT_FETCH_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(timeout)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            timeout_secs: timeout.as_secs(),
        })
    }
}

impl Fetcher for StaticFetcher {
    async fn fetch(&self, _site: &SiteDescriptor, url: &str) -> Result<String, AppError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(self.timeout_secs)
            } else if e.is_connect() {
                AppError::NetworkError(format!("Connection failed: {e}"))
            } else {
                AppError::HttpError(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::HttpError(format!(
                "HTTP {} for {}",
                status.as_u16(),
                url
            )));
        }

        response.text().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(self.timeout_secs)
            } else {
                AppError::HttpError(format!("Failed to read response body: {e}"))
            }
        })
    }
}

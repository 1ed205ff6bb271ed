use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use quarry_core::error::AppError;
use quarry_core::models::SiteDescriptor;
use quarry_core::search::{DEFAULT_FETCH_TIMEOUT, DEFAULT_READY_TIMEOUT};
use quarry_core::traits::Fetcher;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// Default number of browser instances allowed to run at once.
pub const DEFAULT_MAX_BROWSERS: usize = 4;

const READY_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// How long a graceful close, or the process exit after it, may take.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Headless-browser fetcher using Chromium via the Chrome DevTools Protocol.
///
/// Unlike [`super::StaticFetcher`], this renders JavaScript before returning
/// the HTML. Every [`Fetcher::fetch`] call launches its own Chromium process
/// with a throwaway profile directory, so no cookies or storage leak between
/// sites or queries. The process is closed on every exit path.
///
/// The number of live browsers is bounded by a semaphore. A whole render
/// (launch, navigation, readiness wait and teardown) must finish within
/// the site's budget of navigation plus readiness timeout. Dropping the
/// fetch future stops the render and frees its permit immediately.
///
/// # Example
///
/// ```rust,no_run
/// use quarry_client::BrowserFetcher;
/// use quarry_core::testutil::make_site;
/// use quarry_core::traits::Fetcher;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let fetcher = BrowserFetcher::new(2);
/// let site = make_site("example", "Example");
/// let html = fetcher.fetch(&site, "https://example.com").await?;
/// println!("{}", &html[..200]);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct BrowserFetcher {
    limiter: Arc<Semaphore>,
    chrome: Option<PathBuf>,
    nav_timeout: Duration,
    ready_timeout: Duration,
}

impl BrowserFetcher {
    /// Browser fetcher with 15 s navigation and readiness timeouts.
    ///
    /// `max_browsers` is clamped to at least one.
    pub fn new(max_browsers: usize) -> Self {
        Self::with_timeouts(max_browsers, DEFAULT_FETCH_TIMEOUT, DEFAULT_READY_TIMEOUT)
    }

    pub fn with_timeouts(
        max_browsers: usize,
        nav_timeout: Duration,
        ready_timeout: Duration,
    ) -> Self {
        let chrome = find_chrome_binary();
        match &chrome {
            Some(bin) => tracing::info!("Using Chrome binary: {}", bin.display()),
            None => tracing::info!("No Chrome binary found, deferring to chromiumoxide lookup"),
        }

        Self {
            limiter: Arc::new(Semaphore::new(max_browsers.max(1))),
            chrome,
            nav_timeout,
            ready_timeout,
        }
    }

    /// Browser instances that may still be launched right now.
    pub fn available_slots(&self) -> usize {
        self.limiter.available_permits()
    }

    /// Upper bound on one render, from launch to teardown.
    pub fn budget(&self) -> Duration {
        self.nav_timeout + self.ready_timeout
    }
}

impl Fetcher for BrowserFetcher {
    async fn fetch(&self, site: &SiteDescriptor, url: &str) -> Result<String, AppError> {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|e| AppError::BrowserError(format!("Browser pool closed: {e}")))?;

        let job = RenderJob {
            url: url.to_string(),
            wait_for: readiness_selector(site).map(str::to_string),
            chrome: self.chrome.clone(),
            nav_timeout: self.nav_timeout,
            ready_timeout: self.ready_timeout,
        };

        let budget = self.budget();
        tokio::time::timeout(budget, job.run())
            .await
            .map_err(|_| AppError::Timeout(budget.as_secs()))?
    }
}

/// The element to wait for, if any. Only meaningful for rendered sites.
fn readiness_selector(site: &SiteDescriptor) -> Option<&str> {
    if site.js_required {
        site.wait_for_selector.as_deref()
    } else {
        None
    }
}

struct RenderJob {
    url: String,
    wait_for: Option<String>,
    chrome: Option<PathBuf>,
    nav_timeout: Duration,
    ready_timeout: Duration,
}

impl RenderJob {
    async fn run(self) -> Result<String, AppError> {
        let profile = tempfile::Builder::new()
            .prefix("quarry-browser-")
            .tempdir()
            .map_err(|e| AppError::BrowserError(format!("Failed to create profile dir: {e}")))?;

        let config = self.browser_config(profile.path())?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| AppError::BrowserError(format!("Failed to launch browser: {e}")))?;

        // The CDP handler must be polled continuously for the connection to work.
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    tracing::debug!("Browser CDP handler error: {event:?}");
                    break;
                }
            }
        });

        let mut session = BrowserSession { browser, handler };
        let result = session.render(&self).await;
        session.shutdown().await;
        result
    }

    fn browser_config(&self, profile: &Path) -> Result<BrowserConfig, AppError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .disable_default_args()
            .user_data_dir(profile)
            .request_timeout(self.nav_timeout);

        if let Some(bin) = &self.chrome {
            builder = builder.chrome_executable(bin);
        }

        builder
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-popup-blocking")
            .arg("--disable-translate")
            .arg("--no-first-run")
            .build()
            .map_err(|e| AppError::BrowserError(format!("Browser config error: {e}")))
    }
}

/// A launched browser plus its CDP handler task.
///
/// `shutdown` closes the process gracefully and kills it if that stalls.
/// If the session is dropped without it (a panic or a cancelled fetch), the
/// handler is aborted and chromiumoxide kills the child process on drop.
struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl BrowserSession {
    async fn render(&self, job: &RenderJob) -> Result<String, AppError> {
        let page = tokio::time::timeout(job.nav_timeout, self.browser.new_page(job.url.as_str()))
            .await
            .map_err(|_| AppError::Timeout(job.nav_timeout.as_secs()))?
            .map_err(|e| AppError::BrowserError(format!("Failed to navigate to {}: {e}", job.url)))?;

        if let Some(selector) = &job.wait_for {
            wait_for_element(&page, selector, job.ready_timeout).await?;
        }

        tokio::time::timeout(job.nav_timeout, page.content())
            .await
            .map_err(|_| AppError::Timeout(job.nav_timeout.as_secs()))?
            .map_err(|e| AppError::BrowserError(format!("Failed to read page content: {e}")))
    }

    async fn shutdown(mut self) {
        let closed = match tokio::time::timeout(SHUTDOWN_GRACE, self.browser.close()).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "Browser close failed");
                false
            }
            Err(_) => false,
        };

        if closed
            && let Ok(Ok(_)) = tokio::time::timeout(SHUTDOWN_GRACE, self.browser.wait()).await
        {
            return;
        }

        tracing::debug!("Browser did not exit cleanly, killing it");
        if let Some(Err(e)) = self.browser.kill().await {
            tracing::warn!(error = %e, "Failed to kill browser process");
        }
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

/// Poll until `selector` matches an element, or fail after `timeout`.
async fn wait_for_element(page: &Page, selector: &str, timeout: Duration) -> Result<(), AppError> {
    let poll = async {
        loop {
            if page.find_element(selector).await.is_ok() {
                return;
            }
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
    };

    tokio::time::timeout(timeout, poll).await.map_err(|_| {
        AppError::BrowserError(format!(
            "Readiness selector '{selector}' did not appear within {}s",
            timeout.as_secs()
        ))
    })
}

/// Tries to locate the real Chrome/Chromium binary.
///
/// On systems where Chromium is installed via **snap**, the wrapper at
/// `/snap/bin/chromium` strips unknown CLI flags, breaking headless mode.
/// `CHROME_BIN` wins if it exists; then the real binary inside the snap,
/// then well-known system paths. If nothing is found, `chromiumoxide` does
/// its own lookup.
fn find_chrome_binary() -> Option<PathBuf> {
    let candidates: &[&str] = &[
        // Snap (Ubuntu default)
        "/snap/chromium/current/usr/lib/chromium-browser/chrome",
        // Flatpak
        "/var/lib/flatpak/exports/bin/org.chromium.Chromium",
        // Common apt / manual installs
        "/usr/bin/google-chrome-stable",
        "/usr/bin/google-chrome",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
    ];

    if let Ok(p) = std::env::var("CHROME_BIN") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    candidates.iter().map(PathBuf::from).find(|p| p.exists())
}

/// Smoke-test for `BrowserFetcher`.
///
/// Launches a headless Chromium, renders <https://example.com>, waits for its
/// `<h1>`, and runs the selector extractor over the result.
///
/// Run with:
///   cargo run -p quarry-client --example browser_smoke
use quarry_client::{BrowserFetcher, SelectorExtractor};
use quarry_core::models::{ExtractMethod, LinkRule, SiteDescriptor, TitleRule};
use quarry_core::query::SearchQuery;
use quarry_core::traits::{Extractor, Fetcher};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .init();

    let site = SiteDescriptor {
        id: "example".into(),
        name: "Example Domain".into(),
        search_url_template: "https://example.com/?q={query}".into(),
        js_required: true,
        wait_for_selector: Some("h1".into()),
        result_item_selector: "body > div".into(),
        title_rule: TitleRule {
            selector: Some("h1".into()),
            method: ExtractMethod::Text,
        },
        link_rule: LinkRule {
            selector: Some("a".into()),
            attr: "href".into(),
        },
    };
    site.validate()?;

    let query = SearchQuery::new("example domain")?;
    let url = site.search_url(&query);

    println!("Launching headless browser…");
    let fetcher = BrowserFetcher::new(1);
    println!("Fetching {url} …");
    let html = fetcher.fetch(&site, &url).await?;

    assert!(
        html.contains("<h1>Example Domain</h1>"),
        "Expected <h1> not found in rendered HTML"
    );

    let result = SelectorExtractor::new()
        .extract(&html, &site, &url, &query)
        .ok_or_else(|| anyhow::anyhow!("extractor found no result"))?;

    println!("OK: got {} bytes of rendered HTML", html.len());
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

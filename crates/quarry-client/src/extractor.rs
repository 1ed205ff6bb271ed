use quarry_core::models::{ExtractMethod, ResultLink, SearchResult, SiteDescriptor};
use quarry_core::normalize::{clean_title, contains_all_terms};
use quarry_core::query::SearchQuery;
use quarry_core::traits::Extractor;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Extractor driven by a descriptor's CSS selector rules.
///
/// Only the first item matching `result_item_selector` is considered. Any
/// step that fails (missing element, empty title, unresolvable link, title
/// not containing every query term) yields `None`.
#[derive(Debug, Clone, Default)]
pub struct SelectorExtractor;

impl SelectorExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Extractor for SelectorExtractor {
    fn extract(
        &self,
        html: &str,
        site: &SiteDescriptor,
        search_url: &str,
        query: &SearchQuery,
    ) -> Option<SearchResult> {
        let document = Html::parse_document(html);
        let item_selector = Selector::parse(&site.result_item_selector).ok()?;
        let item = document.select(&item_selector).next()?;

        let title_el = scoped(item, site.title_rule.selector.as_deref())?;
        let raw_title = match &site.title_rule.method {
            ExtractMethod::Text => text_content(title_el),
            ExtractMethod::Attribute(name) => title_el.value().attr(name)?.trim().to_string(),
        };
        if raw_title.is_empty() {
            return None;
        }

        let link_el = scoped(item, site.link_rule.selector.as_deref())?;
        let href = link_el.value().attr(&site.link_rule.attr)?.trim();
        if href.is_empty() {
            return None;
        }
        let link = Url::parse(search_url).ok()?.join(href).ok()?;

        let title = clean_title(&raw_title);
        if !contains_all_terms(&title, &query.terms()) {
            return None;
        }

        Some(SearchResult {
            site_id: site.id.clone(),
            site_name: site.name.clone(),
            result: ResultLink {
                title,
                link: link.to_string(),
            },
            search_link: search_url.to_string(),
        })
    }
}

/// The first match of `selector` inside `item`, or `item` itself.
fn scoped<'a>(item: ElementRef<'a>, selector: Option<&str>) -> Option<ElementRef<'a>> {
    match selector {
        Some(css) => {
            let selector = Selector::parse(css).ok()?;
            item.select(&selector).next()
        }
        None => Some(item),
    }
}

/// Trimmed text nodes of an element, concatenated.
fn text_content(el: ElementRef<'_>) -> String {
    el.text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

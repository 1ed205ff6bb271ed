//! The loaded-once set of site descriptors.
//!
//! The catalog is parsed and validated at startup: every selector must
//! compile and every `id` must be unique, so nothing about a descriptor can
//! fail for structural reasons once a search is running.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use scraper::Selector;

use crate::error::AppError;
use crate::models::{ExtractMethod, SiteDescriptor};
use crate::query::SearchQuery;

/// Placeholder substituted with the encoded query in `search_url_template`.
pub const QUERY_PLACEHOLDER: &str = "{query}";

impl SiteDescriptor {
    /// Build this site's search URL for a query.
    pub fn search_url(&self, query: &SearchQuery) -> String {
        self.search_url_template
            .replace(QUERY_PLACEHOLDER, &query.url_encoded())
    }

    /// Check the descriptor's shape and compile every selector it names.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.id.trim().is_empty() {
            return Err(AppError::CatalogError(format!(
                "site '{}' has an empty id",
                self.name
            )));
        }
        if self.name.trim().is_empty() {
            return Err(AppError::CatalogError(format!(
                "site '{}' has an empty name",
                self.id
            )));
        }
        if !self.search_url_template.contains(QUERY_PLACEHOLDER) {
            return Err(AppError::CatalogError(format!(
                "site '{}': search_url_template has no {QUERY_PLACEHOLDER} placeholder",
                self.id
            )));
        }

        self.check_selector("result_item_selector", Some(&self.result_item_selector))?;
        self.check_selector("title_from_item.selector", self.title_rule.selector.as_deref())?;
        self.check_selector("link_from_item.selector", self.link_rule.selector.as_deref())?;
        self.check_selector("wait_for_selector", self.wait_for_selector.as_deref())?;

        if let ExtractMethod::Attribute(name) = &self.title_rule.method
            && name.trim().is_empty()
        {
            return Err(AppError::CatalogError(format!(
                "site '{}': title_from_item.method is empty",
                self.id
            )));
        }
        if self.link_rule.attr.trim().is_empty() {
            return Err(AppError::CatalogError(format!(
                "site '{}': link_from_item.method is empty",
                self.id
            )));
        }

        Ok(())
    }

    fn check_selector(&self, field: &str, selector: Option<&str>) -> Result<(), AppError> {
        let Some(selector) = selector else {
            return Ok(());
        };
        Selector::parse(selector).map_err(|e| {
            AppError::CatalogError(format!(
                "site '{}': invalid {field} '{selector}': {e}",
                self.id
            ))
        })?;
        Ok(())
    }
}

/// Immutable, name-sorted set of site descriptors.
#[derive(Debug, Clone, Default)]
pub struct SiteCatalog {
    sites: Vec<Arc<SiteDescriptor>>,
}

impl SiteCatalog {
    /// Validate, check id uniqueness, and sort by `name`.
    pub fn new(mut sites: Vec<SiteDescriptor>) -> Result<Self, AppError> {
        let mut seen = HashSet::new();
        for site in &sites {
            site.validate()?;
            if !seen.insert(site.id.as_str()) {
                return Err(AppError::CatalogError(format!(
                    "duplicate site id '{}'",
                    site.id
                )));
            }
            if site.wait_for_selector.is_some() && !site.js_required {
                tracing::warn!(
                    site = %site.name,
                    "wait_for_selector is ignored for sites without js_required"
                );
            }
        }

        sites.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(Self {
            sites: sites.into_iter().map(Arc::new).collect(),
        })
    }

    /// Parse a JSON array of descriptors.
    pub fn from_json(json: &str) -> Result<Self, AppError> {
        let sites: Vec<SiteDescriptor> = serde_json::from_str(json)
            .map_err(|e| AppError::CatalogError(format!("Invalid site catalog JSON: {e}")))?;
        Self::new(sites)
    }

    /// Read and parse a catalog file.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            AppError::CatalogError(format!(
                "Failed to read site catalog {}: {e}",
                path.display()
            ))
        })?;
        let catalog = Self::from_json(&json)?;
        tracing::info!(
            sites = catalog.len(),
            path = %path.display(),
            "Loaded site catalog"
        );
        Ok(catalog)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<SiteDescriptor>> {
        self.sites.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Arc<SiteDescriptor>> {
        self.sites.iter().find(|s| s.id == id)
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::testutil::make_site;

    #[test]
    fn test_sorted_by_name() {
        let catalog = SiteCatalog::new(vec![
            make_site("c", "Charlie"),
            make_site("a", "alpha"),
            make_site("b", "Bravo"),
        ])
        .unwrap();
        let names: Vec<_> = catalog.iter().map(|s| s.name.as_str()).collect();
        // Byte order, like the catalog's original sort.
        assert_eq!(names, vec!["Bravo", "Charlie", "alpha"]);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let err = SiteCatalog::new(vec![make_site("a", "One"), make_site("a", "Two")]).unwrap_err();
        assert!(err.to_string().contains("duplicate site id 'a'"));
    }

    #[test]
    fn test_invalid_selector_rejected() {
        let mut site = make_site("a", "One");
        site.result_item_selector = "div[".into();
        let err = SiteCatalog::new(vec![site]).unwrap_err();
        assert!(matches!(err, AppError::CatalogError(_)));
        assert!(err.to_string().contains("result_item_selector"));
    }

    #[test]
    fn test_template_requires_placeholder() {
        let mut site = make_site("a", "One");
        site.search_url_template = "https://a.example/search".into();
        let err = SiteCatalog::new(vec![site]).unwrap_err();
        assert!(err.to_string().contains("{query}"));
    }

    #[test]
    fn test_empty_link_attribute_rejected() {
        let mut site = make_site("a", "One");
        site.link_rule.attr = " ".into();
        assert!(SiteCatalog::new(vec![site]).is_err());
    }

    #[test]
    fn test_search_url_substitutes_encoded_query() {
        let site = make_site("a", "One");
        let query = SearchQuery::new("half life").unwrap();
        assert_eq!(site.search_url(&query), "https://a.example/search?q=half+life");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{
                "id": "beta",
                "name": "Beta",
                "search_url_template": "https://beta.example/?s={{query}}",
                "js_required": true,
                "wait_for_selector": ".results",
                "result_item_selector": ".results .item",
                "title_from_item": {{"selector": "img", "method": "alt"}},
                "link_from_item": {{"selector": "a", "method": "href"}}
            }}]"#
        )
        .unwrap();

        let catalog = SiteCatalog::load(file.path()).unwrap();
        assert_eq!(catalog.len(), 1);
        let site = catalog.get("beta").unwrap();
        assert!(site.js_required);
        assert_eq!(site.wait_for_selector.as_deref(), Some(".results"));
        assert_eq!(
            site.title_rule.method,
            ExtractMethod::Attribute("alt".into())
        );
    }

    #[test]
    fn test_malformed_json_is_catalog_error() {
        let err = SiteCatalog::from_json("{not json").unwrap_err();
        assert!(matches!(err, AppError::CatalogError(_)));
    }
}

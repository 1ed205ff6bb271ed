use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// How a value is read from a matched element.
///
/// Serialized as a plain string: `"text"` selects the element's text
/// content, any other value names the attribute to read (`"alt"`,
/// `"title"`, `"href"`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ExtractMethod {
    Text,
    Attribute(String),
}

impl From<String> for ExtractMethod {
    fn from(raw: String) -> Self {
        if raw == "text" {
            ExtractMethod::Text
        } else {
            ExtractMethod::Attribute(raw)
        }
    }
}

impl From<ExtractMethod> for String {
    fn from(method: ExtractMethod) -> Self {
        match method {
            ExtractMethod::Text => "text".to_string(),
            ExtractMethod::Attribute(name) => name,
        }
    }
}

/// Where to find the result title inside a matched item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleRule {
    /// Selector relative to the item; `None` means the item itself.
    #[serde(default)]
    pub selector: Option<String>,
    pub method: ExtractMethod,
}

/// Where to find the result link inside a matched item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRule {
    /// Selector relative to the item; `None` means the item itself.
    #[serde(default)]
    pub selector: Option<String>,
    /// Attribute holding the (possibly relative) URL.
    #[serde(rename = "method", alias = "attr")]
    pub attr: String,
}

/// Declarative scraping rules for one external site.
///
/// Field names follow the on-disk catalog format, which is a fixed
/// contract shared with the frontend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteDescriptor {
    pub id: String,
    pub name: String,
    /// URL with a literal `{query}` placeholder.
    pub search_url_template: String,
    #[serde(default)]
    pub js_required: bool,
    /// Element to wait for before reading a browser-rendered page.
    #[serde(default)]
    pub wait_for_selector: Option<String>,
    pub result_item_selector: String,
    #[serde(rename = "title_from_item", alias = "title_rule")]
    pub title_rule: TitleRule,
    #[serde(rename = "link_from_item", alias = "link_rule")]
    pub link_rule: LinkRule,
}

/// Title and absolute link of the matched item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultLink {
    pub title: String,
    pub link: String,
}

/// A validated match from one site. The unit of streaming and caching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub site_id: String,
    pub site_name: String,
    pub result: ResultLink,
    pub search_link: String,
}

/// A [`SearchResult`] in its JSON wire form.
///
/// Live results are encoded once and the same text is both streamed and
/// cached; cached results are replayed verbatim without re-validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedResult(String);

impl SerializedResult {
    pub fn encode(result: &SearchResult) -> Result<Self, AppError> {
        Ok(Self(serde_json::to_string(result)?))
    }

    /// Wrap a payload read back from the cache.
    pub fn from_cached(payload: String) -> Self {
        Self(payload)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn decode(&self) -> Result<SearchResult, AppError> {
        Ok(serde_json::from_str(&self.0)?)
    }
}

impl fmt::Display for SerializedResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One event on the output stream.
///
/// A stream starts with exactly one `Searching` or `Cached`, carries any
/// number of `Result`s, and ends with exactly one `Completed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Searching,
    Cached,
    Result(SerializedResult),
    Completed,
}

impl StreamEvent {
    /// The JSON payload carried in the event's `data:` line.
    pub fn to_json(&self) -> String {
        match self {
            StreamEvent::Searching => status_json("searching"),
            StreamEvent::Cached => status_json("cached"),
            StreamEvent::Completed => status_json("completed"),
            StreamEvent::Result(payload) => payload.as_str().to_string(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Completed)
    }
}

fn status_json(status: &str) -> String {
    serde_json::json!({ "status": status }).to_string()
}

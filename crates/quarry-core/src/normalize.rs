//! Title cleanup and query-term matching.
//!
//! Both functions are pure text transforms shared by every extractor.

use std::sync::OnceLock;

use regex::Regex;

static DOWNLOAD_PHRASE: OnceLock<Regex> = OnceLock::new();
static DOWNLOAD_WORD: OnceLock<Regex> = OnceLock::new();
static NON_WORD: OnceLock<Regex> = OnceLock::new();

fn download_phrase() -> &'static Regex {
    DOWNLOAD_PHRASE
        .get_or_init(|| Regex::new(r"(?i)free download|download free").expect("valid regex"))
}

fn download_word() -> &'static Regex {
    DOWNLOAD_WORD.get_or_init(|| Regex::new(r"(?i)\bdownload\b").expect("valid regex"))
}

/// Strip vendor noise from a scraped title.
///
/// 1. Drop the literal `"METAL "` prefix one vendor adds (case-sensitive).
/// 2. Drop `"free download"` / `"download free"` (case-insensitive).
/// 3. Drop the whole word `"download"` unless it starts the string.
/// 4. Collapse runs of whitespace.
pub fn clean_title(title: &str) -> String {
    let title = if title.contains("METAL") {
        title.replace("METAL ", "").trim().to_string()
    } else {
        title.to_string()
    };

    let title = download_phrase().replace_all(&title, "");

    let mut cleaned = String::with_capacity(title.len());
    let mut last = 0;
    for m in download_word().find_iter(&title) {
        if m.start() == 0 {
            continue;
        }
        cleaned.push_str(&title[last..m.start()]);
        last = m.end();
    }
    cleaned.push_str(&title[last..]);

    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn non_word() -> &'static Regex {
    NON_WORD.get_or_init(|| Regex::new(r"\W").expect("valid regex"))
}

/// Lower-cased Unicode word characters only (`\w`, which keeps
/// combining marks and connector punctuation).
fn word_chars(text: &str) -> String {
    non_word().replace_all(&text.to_lowercase(), "").into_owned()
}

/// True if `text` contains every term as a substring, ignoring case,
/// whitespace and punctuation on both sides.
///
/// Matching is containment, not word-boundary: a short term can match
/// inside an unrelated word.
pub fn contains_all_terms(text: &str, terms: &[&str]) -> bool {
    if text.is_empty() || terms.is_empty() {
        return false;
    }
    let haystack = word_chars(text);
    terms.iter().all(|term| haystack.contains(&word_chars(term)))
}

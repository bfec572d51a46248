// src/ingest/mod.rs
pub mod rss;
pub mod types;

use once_cell::sync::OnceCell;
use regex::Regex;

pub use types::{FeedItem, FeedSource};

/// Normalize an item body for translation: decode entities, drop tags, fold whitespace.
pub fn normalize_content(s: &str) -> String {
    // 1) HTML entity decode
    let decoded = html_escape::decode_html_entities(s);

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?s)<[^>]*>").expect("valid tag regex"));
    let stripped = re_tags.replace_all(&decoded, " ");

    // 3) Collapse whitespace (nbsp included, \s is unicode-aware)
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace regex"));
    re_ws.replace_all(&stripped, " ").trim().to_string()
}

/// Well-formed absolute http(s) URL with a host.
pub fn is_valid_link(link: &str) -> bool {
    match url::Url::parse(link.trim()) {
        Ok(u) => matches!(u.scheme(), "http" | "https") && u.host_str().is_some_and(|h| !h.is_empty()),
        Err(_) => false,
    }
}

//! Unsubscribe link detection

use regex::Regex;
use std::sync::LazyLock;

/// Phrases marking an anchor as an unsubscribe link (matched lower-cased)
pub const UNSUBSCRIBE_KEYWORDS: &[&str] = &[
    "unsubscribe",
    "opt-out",
    "opt out",
    "stop receiving",
    "manage preferences",
    "email preferences",
    "update preferences",
    "subscription preferences",
    // Traditional Chinese
    "取消訂閱",
    "退訂",
    // Simplified Chinese
    "取消订阅",
    // Japanese
    "配信停止",
    "購読解除",
];

static ANCHOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\s+[^>]*href=["']([^"']+)["'][^>]*>(.*?)</a>"#)
        .expect("anchor pattern is valid")
});

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"));

static HEADER_ENTRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<([^>]+)>").expect("header entry pattern is valid"));

/// Http(s) candidates outrank mailto candidates; order is kept within a tier
#[derive(Default)]
struct Candidates {
    web: Option<String>,
    mailto: Option<String>,
}

impl Candidates {
    fn offer(&mut self, url: &str) {
        let url = url.trim();
        let lower = url.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            self.web.get_or_insert_with(|| url.to_string());
        } else if lower.starts_with("mailto:") {
            self.mailto.get_or_insert_with(|| url.to_string());
        }
    }

    fn best(self) -> Option<String> {
        self.web.or(self.mailto)
    }
}

fn contains_keyword(haystack: &str) -> bool {
    UNSUBSCRIBE_KEYWORDS.iter().any(|k| haystack.contains(k))
}

/// Find an unsubscribe link among the anchors of an HTML document
///
/// An anchor qualifies when its href or its tag-stripped text contains one
/// of [`UNSUBSCRIBE_KEYWORDS`]. The first qualifying http(s) link wins; a
/// `mailto:` link is returned only when no http(s) link qualifies.
pub fn extract_unsubscribe_url_from_html(html: &str) -> Option<String> {
    if html.is_empty() {
        return None;
    }

    let mut candidates = Candidates::default();
    for caps in ANCHOR_RE.captures_iter(html) {
        let href = &caps[1];
        let text = TAG_RE.replace_all(&caps[2], "").to_lowercase();

        if contains_keyword(&text) || contains_keyword(&href.to_lowercase()) {
            candidates.offer(href);
        }
    }

    candidates.best()
}

/// Pick a link from a `List-Unsubscribe` header value
///
/// Accepts the RFC 2369 form `<https://...>, <mailto:...>` as well as bare
/// comma-separated URLs.
pub fn extract_unsubscribe_url_from_header(value: &str) -> Option<String> {
    let mut candidates = Candidates::default();

    let mut bracketed = false;
    for caps in HEADER_ENTRY_RE.captures_iter(value) {
        bracketed = true;
        candidates.offer(&caps[1]);
    }
    if !bracketed {
        value.split(',').for_each(|entry| candidates.offer(entry));
    }

    candidates.best()
}

/// Resolve an unsubscribe link, preferring the header over the HTML body
pub fn extract_unsubscribe_url(header: Option<&str>, html: Option<&str>) -> Option<String> {
    header
        .and_then(extract_unsubscribe_url_from_header)
        .or_else(|| html.and_then(extract_unsubscribe_url_from_html))
}

//! Link harvesting from HTML pages.

use std::collections::HashSet;

use scraper::{Html, Selector};
use url::Url;

/// A harvested link with text and href.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Link {
    /// Link text, whitespace collapsed
    pub text: String,
    /// Resolved href URL
    pub href: String,
}

/// Harvest `<a href>` links from `html` in document order.
///
/// Relative hrefs are resolved against `base`; duplicates (by resolved
/// href) and hrefs that do not resolve are skipped.
pub fn harvest_links(html: &str, base: &Url) -> Vec<Link> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };

        let Ok(resolved) = base.join(href.trim()) else {
            continue;
        };
        let resolved = resolved.to_string();

        if !seen.insert(resolved.clone()) {
            continue;
        }

        let text = element.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ");
        let text = if text.is_empty() { "[link]".to_string() } else { text };

        links.push(Link { text, href: resolved });
    }

    links
}

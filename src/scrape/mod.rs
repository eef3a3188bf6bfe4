pub mod clinics;
pub mod doctors;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::ElementRef;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Visible text of an element: each text node trimmed, empty nodes dropped,
/// runs of whitespace collapsed.
pub fn element_text(el: ElementRef<'_>) -> String {
    let joined = el
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    WHITESPACE.replace_all(&joined, " ").into_owned()
}

pub struct ScrapeStats {
    pub pages: usize,
    pub records: usize,
}

//! Keyword blocking
//!
//! A URL is blocked when blocking is enabled and its lowercased text contains
//! any non-empty keyword after trimming and lowercasing the keyword.

use focus_api::UrlVerdict;

fn normalized(keyword: &str) -> Option<String> {
    let keyword = keyword.trim().to_lowercase();
    (!keyword.is_empty()).then_some(keyword)
}

/// The first keyword that blocks `url`, as stored
pub fn blocked_keyword<'a>(url: &str, keywords: &'a [String], enabled: bool) -> Option<&'a str> {
    if !enabled || keywords.is_empty() {
        return None;
    }

    let url = url.to_lowercase();
    keywords
        .iter()
        .find(|keyword| normalized(keyword).is_some_and(|k| url.contains(&k)))
        .map(String::as_str)
}

pub fn is_url_blocked(url: &str, keywords: &[String], enabled: bool) -> bool {
    blocked_keyword(url, keywords, enabled).is_some()
}

/// Verdict shown on the block page
pub fn check_url(url: &str, keywords: &[String], enabled: bool) -> UrlVerdict {
    let keyword = blocked_keyword(url, keywords, enabled).map(str::to_string);
    UrlVerdict {
        url: url.to_string(),
        blocked: keyword.is_some(),
        keyword,
    }
}

/// The list with `raw` added, or `None` if it is blank or already present
pub fn with_keyword(keywords: &[String], raw: &str) -> Option<Vec<String>> {
    let keyword = raw.trim();
    if keyword.is_empty() || keywords.iter().any(|k| k == keyword) {
        return None;
    }

    let mut next = keywords.to_vec();
    next.push(keyword.to_string());
    Some(next)
}

/// The list with `keyword` removed, or `None` if it was not present
pub fn without_keyword(keywords: &[String], keyword: &str) -> Option<Vec<String>> {
    let next: Vec<String> = keywords.iter().filter(|k| *k != keyword).cloned().collect();
    (next.len() != keywords.len()).then_some(next)
}

//! Title, author and publication date from common page metadata.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::html::{Document, Limits, NodeId, text};

/// Separators sites put between an article title and the site name.
const TITLE_SEPARATORS: &[&str] = &[" | ", " - ", " \u{2013} ", " \u{2014} ", " :: ", " · "];

const AUTHOR_META: &[&str] = &["author", "article:author", "dc.creator", "parsely-author"];
const DATE_META: &[&str] = &[
    "article:published_time",
    "datepublished",
    "date",
    "dc.date",
    "pubdate",
    "og:published_time",
];

/// Longest plausible byline.
const MAX_AUTHOR_CHARS: usize = 100;

/// Page title: the `<title>` (minus a site-name suffix when a heading
/// confirms which part is the article title), then `og:title`, then the
/// first `<h1>`.
pub fn title(doc: &Document) -> Option<String> {
    let headings = heading_texts(doc);
    if let Some(page_title) = doc.title() {
        return Some(strip_site_name(&page_title, &headings));
    }
    doc.meta("og:title")
        .or_else(|| doc.meta("twitter:title"))
        .or_else(|| headings.into_iter().next())
}

fn heading_texts(doc: &Document) -> Vec<String> {
    let dom = doc.dom();
    dom.find_all(|d, id| d.is_tag(id, "h1"))
        .into_iter()
        .map(|id| text::clean_text_of(dom, id, Limits::default()))
        .filter(|t| !t.is_empty())
        .collect()
}

fn strip_site_name(page_title: &str, headings: &[String]) -> String {
    if headings.iter().any(|h| h.eq_ignore_ascii_case(page_title)) {
        return page_title.to_string();
    }
    for sep in TITLE_SEPARATORS {
        if !page_title.contains(sep) {
            continue;
        }
        if let Some(part) = page_title
            .split(sep)
            .map(str::trim)
            .find(|part| headings.iter().any(|h| h.eq_ignore_ascii_case(part)))
        {
            return part.to_string();
        }
    }
    page_title.to_string()
}

/// Author from meta tags, `itemprop="author"`, `rel="author"` links or
/// byline-class elements, with any leading "By" removed.
pub fn author(doc: &Document) -> Option<String> {
    let from_meta = AUTHOR_META
        .iter()
        .filter_map(|key| doc.meta(key))
        .find(|value| !value.starts_with("http"));
    from_meta
        .or_else(|| element_author(doc))
        .map(|a| clean_author(&a))
        .filter(|a| !a.is_empty() && a.chars().count() <= MAX_AUTHOR_CHARS)
}

fn element_author(doc: &Document) -> Option<String> {
    let dom = doc.dom();
    let found = dom.find(|d, id| {
        d.attr(id, "itemprop") == Some("author")
            || d.attr(id, "rel") == Some("author")
            || d.classes(id).iter().any(|c| {
                let c = c.to_ascii_lowercase();
                c == "byline" || c == "author" || c.ends_with("-byline") || c.ends_with("-author")
            })
    })?;
    // itemprop may sit on a container whose name is nested.
    let name: NodeId = dom
        .find_all(|d, id| d.attr(id, "itemprop") == Some("name"))
        .into_iter()
        .find(|&id| is_within(doc, id, found))
        .unwrap_or(found);
    let text = dom
        .attr(name, "content")
        .map(text::collapse_whitespace)
        .unwrap_or_else(|| text::clean_text_of(dom, name, Limits::default()));
    (!text.is_empty()).then_some(text)
}

fn is_within(doc: &Document, node: NodeId, ancestor: NodeId) -> bool {
    let mut current = doc.dom().parent(node);
    while let Some(id) = current {
        if id == ancestor {
            return true;
        }
        current = doc.dom().parent(id);
    }
    false
}

fn clean_author(author: &str) -> String {
    let author = text::collapse_whitespace(author);
    let lower = author.to_lowercase();
    for prefix in ["by ", "por "] {
        if lower.starts_with(prefix)
            && let Some(rest) = author.get(prefix.len()..)
        {
            return rest.trim().to_string();
        }
    }
    author
}

/// Publication date from meta tags, `itemprop="datePublished"` or the first
/// `<time datetime>`.
pub fn published(doc: &Document) -> Option<DateTime<Utc>> {
    let dom = doc.dom();
    DATE_META
        .iter()
        .filter_map(|key| doc.meta(key))
        .find_map(|v| parse_date(&v))
        .or_else(|| {
            dom.find_all(|d, id| {
                d.attr(id, "itemprop") == Some("datePublished") || d.is_tag(id, "time")
            })
            .into_iter()
            .filter_map(|id| dom.attr(id, "datetime").or_else(|| dom.attr(id, "content")))
            .find_map(parse_date)
        })
}

/// Parse RFC 3339 timestamps, bare `YYYY-MM-DDTHH:MM:SS` and plain dates.
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.and_utc());
    }
    let date = NaiveDate::parse_from_str(value.get(..10)?, "%Y-%m-%d").ok()?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc())
}

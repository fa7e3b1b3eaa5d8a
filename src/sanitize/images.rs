//! Image reference resolution.

use url::Url;

use crate::html::{Dom, NodeId, text};

/// Lazy-loading attributes carrying the real image address.
const LAZY_ATTRS: &[&str] = &["data-src", "data-original", "data-lazy-src"];

/// Absolute source of an `<img>`, or `None` when it is empty or cannot be
/// resolved against `base`.
///
/// `data:` URIs pass through untouched. A `data:` placeholder in `src` is
/// ignored when a lazy-loading attribute names the real image.
pub fn image_source(dom: &Dom, id: NodeId, base: &Url) -> Option<String> {
    let lazy = LAZY_ATTRS
        .iter()
        .filter_map(|attr| dom.attr(id, attr))
        .map(str::trim)
        .find(|v| !v.is_empty());

    let src = dom
        .attr(id, "src")
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .filter(|v| !(lazy.is_some() && is_data_uri(v)));

    let candidate = src
        .or(lazy)
        .or_else(|| dom.attr(id, "srcset").and_then(first_srcset_candidate))?;
    resolve(candidate, base)
}

/// The URL of the first `srcset` candidate.
pub fn first_srcset_candidate(srcset: &str) -> Option<&str> {
    srcset
        .split(',')
        .filter_map(|c| c.split_whitespace().next())
        .next()
}

/// Resolve `reference` against `base`. Only web and file URLs survive.
pub fn resolve(reference: &str, base: &Url) -> Option<String> {
    let reference = reference.trim();
    if reference.is_empty() {
        return None;
    }
    if is_data_uri(reference) {
        return Some(reference.to_string());
    }
    let url = base.join(reference).ok()?;
    matches!(url.scheme(), "http" | "https" | "file").then(|| url.to_string())
}

fn is_data_uri(s: &str) -> bool {
    s.get(..5).is_some_and(|p| p.eq_ignore_ascii_case("data:"))
}

/// Alternative text from `alt`, falling back to `title`.
pub fn alt_text(dom: &Dom, id: NodeId) -> String {
    dom.attr(id, "alt")
        .or_else(|| dom.attr(id, "title"))
        .map(text::collapse_whitespace)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::Document;

    fn base() -> Url {
        Url::parse("https://example.com/a/b").unwrap()
    }

    fn img(html: &str) -> Option<String> {
        let doc = Document::parse(html);
        let id = doc.dom().find_tag("img").unwrap();
        image_source(doc.dom(), id, &base())
    }

    #[test]
    fn test_relative_resolution() {
        assert_eq!(
            resolve("../img/x.png", &base()).as_deref(),
            Some("https://example.com/img/x.png")
        );
        assert_eq!(
            resolve("//cdn.example.net/y.jpg", &base()).as_deref(),
            Some("https://cdn.example.net/y.jpg")
        );
    }

    #[test]
    fn test_rejects_unusable_sources() {
        assert_eq!(resolve("   ", &base()), None);
        assert_eq!(resolve("javascript:void(0)", &base()), None);
        assert_eq!(img("<img alt='nothing'>"), None);
    }

    #[test]
    fn test_data_uri_passes_through() {
        assert_eq!(
            resolve("data:image/png;base64,AAAA", &base()).as_deref(),
            Some("data:image/png;base64,AAAA")
        );
    }

    #[test]
    fn test_lazy_loading_attributes() {
        assert_eq!(
            img("<img src='data:image/gif;base64,R0lGOD' data-src='/real.jpg'>").as_deref(),
            Some("https://example.com/real.jpg")
        );
        assert_eq!(
            img("<img data-original='photo.png'>").as_deref(),
            Some("https://example.com/a/photo.png")
        );
        assert_eq!(
            img("<img srcset='small.jpg 480w, large.jpg 1080w'>").as_deref(),
            Some("https://example.com/a/small.jpg")
        );
    }

    #[test]
    fn test_alt_text() {
        let doc = Document::parse("<img src='x.png' title=' A   caption '>");
        let id = doc.dom().find_tag("img").unwrap();
        assert_eq!(alt_text(doc.dom(), id), "A caption");
    }
}

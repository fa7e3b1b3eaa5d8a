//! HTML parsing into an arena element tree.
//!
//! # Example
//!
//! ```
//! use kindling::html::{Document, Selector};
//!
//! let doc = Document::parse("<div class='article-content'><p>Hello</p></div>");
//! let sel = Selector::parse("div.article-content").unwrap();
//! assert_eq!(sel.select(doc.dom()).len(), 1);
//! ```

mod arena;
mod select;
mod sink;
pub mod text;

pub use arena::{Attribute, Children, Dom, Limits, Node, NodeData, NodeId, Visit, WalkStats};
pub use select::{ElementRef, Selector};

use html5ever::driver::ParseOpts;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;

use sink::DomSink;

/// A parsed HTML document.
#[derive(Debug, Clone, Default)]
pub struct Document {
    dom: Dom,
}

impl Document {
    /// Parse an HTML document (or fragment) leniently, like a browser.
    pub fn parse(html: &str) -> Self {
        let sink = parse_document(DomSink::new(), ParseOpts::default()).one(html);
        Self {
            dom: sink.into_dom(),
        }
    }

    /// Wrap an already-built tree.
    pub fn from_dom(dom: Dom) -> Self {
        Self { dom }
    }

    pub fn dom(&self) -> &Dom {
        &self.dom
    }

    pub fn into_dom(self) -> Dom {
        self.dom
    }

    /// The `<body>` element, or the document node when there is none.
    pub fn body(&self) -> NodeId {
        self.dom.find_tag("body").unwrap_or_else(|| self.dom.root())
    }

    /// Content of the first `<meta>` whose `name`, `property` or `itemprop`
    /// equals `key` (case-insensitive).
    pub fn meta(&self, key: &str) -> Option<String> {
        let dom = &self.dom;
        let id = dom.find(|d, id| {
            d.is_tag(id, "meta")
                && ["name", "property", "itemprop"].iter().any(|attr| {
                    d.attr(id, attr)
                        .is_some_and(|v| v.trim().eq_ignore_ascii_case(key))
                })
        })?;
        let content = text::collapse_whitespace(dom.attr(id, "content")?);
        (!content.is_empty()).then_some(content)
    }

    /// Collapsed text of the `<title>` element.
    pub fn title(&self) -> Option<String> {
        let id = self.dom.find_tag("title")?;
        let title = self
            .dom
            .children(id)
            .filter_map(|c| self.dom.text(c))
            .collect::<String>();
        let title = text::collapse_whitespace(&title);
        (!title.is_empty()).then_some(title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_builds_document_structure() {
        let doc = Document::parse("<html><body><p>Hello</p></body></html>");
        let p = doc.dom().find_tag("p").unwrap();
        let text = doc.dom().children(p).next().unwrap();
        assert_eq!(doc.dom().text(text), Some("Hello"));
        assert!(doc.dom().is_tag(doc.body(), "body"));
    }

    #[test]
    fn test_title_and_meta() {
        let doc = Document::parse(
            r#"<html><head><title>  A   Title </title>
            <meta property="og:title" content="OG Title">
            <meta name="Author" content="Jane Doe"></head><body></body></html>"#,
        );
        assert_eq!(doc.title().as_deref(), Some("A Title"));
        assert_eq!(doc.meta("og:title").as_deref(), Some("OG Title"));
        assert_eq!(doc.meta("author").as_deref(), Some("Jane Doe"));
        assert_eq!(doc.meta("description"), None);
    }

    #[test]
    fn test_malformed_markup_is_tolerated() {
        let doc = Document::parse("<div><p>unclosed <b>bold <i>both</div></p>");
        assert!(doc.dom().find_tag("i").is_some());
    }
}

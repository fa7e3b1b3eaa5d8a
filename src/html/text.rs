//! Visible-text helpers shared by the scorer, strategies and sanitizer.

use super::arena::{Dom, Limits, NodeId, Visit};

/// Elements whose content is never visible text.
pub const INVISIBLE_TAGS: &[&str] = &[
    "head", "script", "style", "noscript", "template", "svg", "math", "canvas", "iframe",
    "object", "embed", "select", "option", "textarea",
];

/// Elements that start a new line of text.
pub const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "dd", "details", "dialog", "div", "dl",
    "dt", "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5",
    "h6", "header", "hr", "li", "main", "nav", "ol", "p", "pre", "section", "summary", "table",
    "tbody", "td", "tfoot", "th", "thead", "tr", "ul",
];

pub fn is_invisible(tag: &str) -> bool {
    INVISIBLE_TAGS.contains(&tag)
}

pub fn is_block(tag: &str) -> bool {
    BLOCK_TAGS.contains(&tag)
}

/// Heading level for `h1`..`h6`.
pub fn heading_level(tag: &str) -> Option<u8> {
    match tag {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

/// Visible text under `root`, with a space wherever a block or `<br>` breaks
/// the flow. Not whitespace-collapsed.
pub fn text_of(dom: &Dom, root: NodeId, limits: Limits) -> String {
    let mut out = String::new();
    dom.walk(root, limits, |id, _| {
        if let Some(text) = dom.text(id) {
            let after_block = dom
                .get(id)
                .and_then(|n| dom.tag(n.prev_sibling))
                .is_some_and(is_block);
            if after_block {
                out.push(' ');
            }
            out.push_str(text);
            return Visit::Descend;
        }
        match dom.tag(id) {
            Some(tag) if is_invisible(tag) => Visit::Skip,
            Some("br") => {
                out.push(' ');
                Visit::Skip
            }
            Some(tag) if is_block(tag) => {
                out.push(' ');
                Visit::Descend
            }
            _ => Visit::Descend,
        }
    });
    out
}

/// Whether `c` may appear in an XML 1.0 document.
pub fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}')
}

/// Collapse every run of whitespace (including no-break spaces) to a single
/// space, trim the ends, and drop characters XML cannot carry.
pub fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for word in text.split(char::is_whitespace).filter(|w| !w.is_empty()) {
        let start = out.len();
        if start > 0 {
            out.push(' ');
        }
        out.extend(word.chars().filter(|&c| is_xml_char(c)));
        if out.len() == start + usize::from(start > 0) {
            out.truncate(start);
        }
    }
    out
}

/// Collapsed visible text of a subtree.
pub fn clean_text_of(dom: &Dom, root: NodeId, limits: Limits) -> String {
    collapse_whitespace(&text_of(dom, root, limits))
}

/// Escape text for XML/XHTML output.
pub fn escape_xml(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#39;"),
            c if !is_xml_char(c) => {}
            _ => result.push(c),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::Document;

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a \n\t b\u{a0}c  "), "a b c");
        assert_eq!(collapse_whitespace(""), "");
        assert_eq!(collapse_whitespace("   "), "");
    }

    #[test]
    fn test_text_of_separates_blocks() {
        let doc = Document::parse("<ul><li>one</li><li>two</li></ul><p>a<br>b</p>");
        let text = clean_text_of(doc.dom(), doc.dom().root(), Limits::default());
        assert_eq!(text, "one two a b");
    }

    #[test]
    fn test_text_of_skips_scripts() {
        let doc = Document::parse("<p>shown<script>var hidden = 1;</script></p>");
        let text = clean_text_of(doc.dom(), doc.dom().root(), Limits::default());
        assert_eq!(text, "shown");
    }

    #[test]
    fn test_text_after_block_sibling() {
        let doc = Document::parse("<div><p>first</p>tail</div>");
        let text = clean_text_of(doc.dom(), doc.dom().root(), Limits::default());
        assert_eq!(text, "first tail");
    }

    #[test]
    fn test_non_xml_chars_dropped() {
        assert_eq!(collapse_whitespace("T\u{1}x"), "Tx");
        assert_eq!(collapse_whitespace("a \u{8} b\u{FFFE}\u{FFFF}"), "a b");
        assert_eq!(collapse_whitespace("\u{1F}"), "");
        assert_eq!(escape_xml("x\u{1}\u{B}y\u{FFFF}"), "xy");
        assert_eq!(escape_xml("tab\tok \u{E000} \u{1F600}"), "tab\tok \u{E000} \u{1F600}");
        assert!(!is_xml_char('\u{0}'));
        assert!(is_xml_char('\u{D7FF}'));
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a & <b> \"c\""), "a &amp; &lt;b&gt; &quot;c&quot;");
    }
}

//! Canonical article content.

use chrono::{DateTime, Utc};
use url::Url;

use crate::html::text::escape_xml;

/// A format-agnostic unit of article content.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
#[cfg_attr(feature = "cli", serde(tag = "type", rename_all = "snake_case"))]
pub enum ContentBlock {
    Heading {
        /// Contiguous level, 1 being the article's top level.
        level: u8,
        text: String,
    },
    Paragraph {
        text: String,
    },
    Image {
        /// Absolute URL (or `data:` URI).
        src: String,
        alt: String,
    },
    List {
        ordered: bool,
        items: Vec<String>,
    },
    Quote {
        text: String,
    },
}

impl ContentBlock {
    /// Visible text length in characters. Images count their alt text.
    pub fn text_len(&self) -> usize {
        match self {
            ContentBlock::Heading { text, .. }
            | ContentBlock::Paragraph { text }
            | ContentBlock::Quote { text } => text.chars().count(),
            ContentBlock::Image { alt, .. } => alt.chars().count(),
            ContentBlock::List { items, .. } => items.iter().map(|i| i.chars().count()).sum(),
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, ContentBlock::Image { .. })
    }

    /// True when the block carries nothing worth keeping.
    pub fn is_empty(&self) -> bool {
        match self {
            ContentBlock::Image { src, .. } => src.is_empty(),
            ContentBlock::List { items, .. } => items.iter().all(|i| i.is_empty()),
            _ => self.text_len() == 0,
        }
    }

    /// Plain-text rendering used for printing and hashing.
    pub fn plain_text(&self) -> String {
        match self {
            ContentBlock::Heading { text, .. } | ContentBlock::Paragraph { text } => text.clone(),
            ContentBlock::Quote { text } => format!("> {text}"),
            ContentBlock::Image { src, alt } if alt.is_empty() => format!("[image: {src}]"),
            ContentBlock::Image { alt, .. } => format!("[image: {alt}]"),
            ContentBlock::List { ordered, items } => items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    if *ordered {
                        format!("{}. {item}", i + 1)
                    } else {
                        format!("- {item}")
                    }
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// Plain HTML for this block, with headings at their own level.
    pub fn to_html(&self) -> String {
        self.to_html_shifted(0)
    }

    /// Plain HTML with heading levels pushed down by `shift` (capped at h6).
    pub(crate) fn to_html_shifted(&self, shift: u8) -> String {
        match self {
            ContentBlock::Heading { level, text } => {
                let level = level.saturating_add(shift).clamp(1, 6);
                format!("<h{level}>{}</h{level}>", escape_xml(text))
            }
            ContentBlock::Paragraph { text } => format!("<p>{}</p>", escape_xml(text)),
            ContentBlock::Quote { text } => {
                format!("<blockquote><p>{}</p></blockquote>", escape_xml(text))
            }
            ContentBlock::Image { src, alt } => format!(
                "<div class=\"figure\"><img src=\"{}\" alt=\"{}\"/></div>",
                escape_xml(src),
                escape_xml(alt)
            ),
            ContentBlock::List { ordered, items } => {
                let tag = if *ordered { "ol" } else { "ul" };
                let mut html = format!("<{tag}>");
                for item in items {
                    html.push_str("<li>");
                    html.push_str(&escape_xml(item));
                    html.push_str("</li>");
                }
                html.push_str(&format!("</{tag}>"));
                html
            }
        }
    }
}

/// A sanitized article, ready for assembly.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct ArticleDocument {
    #[cfg_attr(feature = "cli", serde(skip_serializing_if = "Option::is_none"))]
    pub title: Option<String>,
    #[cfg_attr(feature = "cli", serde(skip_serializing_if = "Option::is_none"))]
    pub author: Option<String>,
    #[cfg_attr(feature = "cli", serde(skip_serializing_if = "Option::is_none"))]
    pub source_url: Option<Url>,
    #[cfg_attr(feature = "cli", serde(skip_serializing_if = "Option::is_none"))]
    pub published: Option<DateTime<Utc>>,
    pub blocks: Vec<ContentBlock>,
}

impl ArticleDocument {
    /// True when at least one block carries content.
    pub fn has_content(&self) -> bool {
        self.blocks.iter().any(|b| !b.is_empty())
    }

    pub fn word_count(&self) -> usize {
        self.blocks
            .iter()
            .filter(|b| !b.is_image())
            .map(|b| b.plain_text().split_whitespace().count())
            .sum()
    }

    /// Absolute sources of every image block, in order.
    pub fn image_sources(&self) -> impl Iterator<Item = &str> {
        self.blocks.iter().filter_map(|b| match b {
            ContentBlock::Image { src, .. } => Some(src.as_str()),
            _ => None,
        })
    }

    /// Render the blocks as a plain HTML document.
    ///
    /// Feeding this back through the sanitizer reproduces the same blocks.
    pub fn to_html(&self) -> String {
        let mut html = String::from("<html><head>");
        if let Some(title) = &self.title {
            html.push_str("<title>");
            html.push_str(&escape_xml(title));
            html.push_str("</title>");
        }
        html.push_str("</head><body><article>");
        for block in &self.blocks {
            html.push_str(&block.to_html());
            html.push('\n');
        }
        html.push_str("</article></body></html>");
        html
    }

    /// Plain-text rendering: title, byline and blocks separated by blank lines.
    pub fn to_text(&self) -> String {
        let mut parts = Vec::new();
        if let Some(title) = &self.title {
            parts.push(title.clone());
        }
        if let Some(author) = &self.author {
            parts.push(format!("By {author}"));
        }
        parts.extend(self.blocks.iter().map(ContentBlock::plain_text));
        parts.join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paragraph(text: &str) -> ContentBlock {
        ContentBlock::Paragraph {
            text: text.to_string(),
        }
    }

    #[test]
    fn test_block_lengths() {
        assert_eq!(paragraph("héllo").text_len(), 5);
        let list = ContentBlock::List {
            ordered: false,
            items: vec!["ab".into(), "cde".into()],
        };
        assert_eq!(list.text_len(), 5);
        assert!(paragraph("").is_empty());
    }

    #[test]
    fn test_heading_shift_is_capped() {
        let h = ContentBlock::Heading {
            level: 6,
            text: "Deep".into(),
        };
        assert_eq!(h.to_html_shifted(1), "<h6>Deep</h6>");
        let h = ContentBlock::Heading {
            level: 1,
            text: "Top".into(),
        };
        assert_eq!(h.to_html_shifted(1), "<h2>Top</h2>");
    }

    #[test]
    fn test_to_html_escapes() {
        assert_eq!(paragraph("a < b & c").to_html(), "<p>a &lt; b &amp; c</p>");
    }

    #[test]
    fn test_to_text() {
        let doc = ArticleDocument {
            title: Some("Title".into()),
            author: Some("Ana".into()),
            blocks: vec![
                paragraph("Body text."),
                ContentBlock::List {
                    ordered: true,
                    items: vec!["one".into(), "two".into()],
                },
            ],
            ..Default::default()
        };
        assert_eq!(doc.to_text(), "Title\n\nBy Ana\n\nBody text.\n\n1. one\n2. two");
        assert_eq!(doc.word_count(), 6);
    }
}

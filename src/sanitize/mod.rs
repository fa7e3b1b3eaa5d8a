//! Content sanitizer: turns a candidate body into canonical content blocks.
//!
//! Cleaning runs again here whatever the winning strategy already removed,
//! so a permissive external extractor cannot smuggle chrome into the book.

mod images;
mod linearize;

pub use images::{first_srcset_candidate, resolve as resolve_image};

use std::collections::BTreeSet;

use tracing::{debug, warn};
use url::Url;

use crate::article::{ArticleDocument, ContentBlock};
use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::extract::{ExtractionCandidate, is_boilerplate, subtree_stats};
use crate::html::{Document, Dom, Limits, NodeId, text};

use linearize::Linearizer;

/// Elements that never hold article content.
const REMOVED_TAGS: &[&str] = &[
    "head", "script", "style", "noscript", "template", "link", "meta", "form", "input",
    "button", "select", "textarea", "label", "iframe", "embed", "object", "svg", "canvas",
    "nav", "aside", "footer", "menu", "dialog",
];

/// Share of link text above which a `<header>` counts as navigation.
const HEADER_LINK_DENSITY: f32 = 0.5;

/// Cleans candidate bodies into [`ArticleDocument`]s.
#[derive(Debug, Clone, Copy)]
pub struct Sanitizer {
    limits: Limits,
    min_block_chars: usize,
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new(&PipelineConfig::default())
    }
}

impl Sanitizer {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            limits: config.limits(),
            min_block_chars: config.min_block_chars,
        }
    }

    /// Clean a candidate into an article.
    ///
    /// Fails with [`Error::EmptyContent`] when no usable block survives.
    pub fn sanitize(&self, candidate: ExtractionCandidate, base_url: &Url) -> Result<ArticleDocument> {
        let ExtractionCandidate {
            title,
            author,
            published,
            body,
            ..
        } = candidate;

        let title = title
            .map(|t| text::collapse_whitespace(&t))
            .filter(|t| !t.is_empty());
        let blocks = self.blocks(&body, body.root(), base_url, title.as_deref());
        if blocks.is_empty() {
            return Err(Error::EmptyContent);
        }
        debug!(blocks = blocks.len(), "sanitized article");

        Ok(ArticleDocument {
            title,
            author: author
                .map(|a| text::collapse_whitespace(&a))
                .filter(|a| !a.is_empty()),
            source_url: matches!(base_url.scheme(), "http" | "https").then(|| base_url.clone()),
            published,
            blocks,
        })
    }

    /// Run an already sanitized article through the sanitizer again.
    pub fn resanitize(&self, article: &ArticleDocument, base_url: &Url) -> Result<ArticleDocument> {
        let doc = Document::parse(&article.to_html());
        let blocks = self.blocks(doc.dom(), doc.dom().root(), base_url, article.title.as_deref());
        if blocks.is_empty() {
            return Err(Error::EmptyContent);
        }
        Ok(ArticleDocument {
            blocks,
            ..article.clone()
        })
    }

    /// Canonical blocks for the subtree at `root`, in source order.
    pub fn blocks(
        &self,
        dom: &Dom,
        root: NodeId,
        base_url: &Url,
        title: Option<&str>,
    ) -> Vec<ContentBlock> {
        let limits = self.limits;
        let (mut blocks, truncated) =
            Linearizer::new(dom, base_url, limits, |d, id| is_non_content(d, id, limits)).run(root);
        if truncated {
            warn!(
                max_depth = limits.max_depth,
                max_nodes = limits.max_nodes,
                "body truncated by traversal limits"
            );
        }

        let min = self.min_block_chars;
        let before = blocks.len();
        blocks.retain(|b| b.is_image() || b.text_len() >= min);
        if let Some(title) = title {
            let leading = blocks
                .iter()
                .take_while(|b| {
                    matches!(b, ContentBlock::Heading { text, .. } if text.to_lowercase() == title.to_lowercase())
                })
                .count();
            blocks.drain(..leading);
        }
        if blocks.len() < before {
            debug!(dropped = before - blocks.len(), "dropped short or duplicate blocks");
        }

        normalize_headings(&mut blocks);
        blocks
    }
}

/// Whether an element is chrome, hidden, or advertising.
pub fn is_non_content(dom: &Dom, id: NodeId, limits: Limits) -> bool {
    let Some(tag) = dom.tag(id) else {
        return false;
    };
    if REMOVED_TAGS.contains(&tag) || is_hidden(dom, id) {
        return true;
    }
    if tag == "header" && subtree_stats(dom, id, limits).link_density() > HEADER_LINK_DENSITY {
        return true;
    }
    is_boilerplate(dom, id, limits)
}

fn is_hidden(dom: &Dom, id: NodeId) -> bool {
    if dom.attr(id, "hidden").is_some() || dom.attr(id, "aria-hidden") == Some("true") {
        return true;
    }
    dom.attr(id, "style").is_some_and(|style| {
        let style: String = style
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        style.contains("display:none") || style.contains("visibility:hidden")
    })
}

/// Renumber heading levels so the levels in use run 1..N.
pub fn normalize_headings(blocks: &mut [ContentBlock]) {
    let levels: BTreeSet<u8> = blocks
        .iter()
        .filter_map(|b| match b {
            ContentBlock::Heading { level, .. } => Some(*level),
            _ => None,
        })
        .collect();
    for block in blocks {
        if let ContentBlock::Heading { level, .. } = block
            && let Some(rank) = levels.iter().position(|l| l == level)
        {
            *level = rank as u8 + 1;
        }
    }
}

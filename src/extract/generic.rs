//! The density heuristic: pick the best-scoring container on any page.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::scorer::{BlockScorer, ScoredNode};
use super::{ExtractionCandidate, Strategy, StrategyError, StrategyKind, metadata};
use crate::html::{Document, Dom, Limits, NodeId, text};
use crate::source::{RawDocument, Source};

/// Elements that can hold an article body.
const CONTAINER_TAGS: &[&str] = &[
    "article", "main", "section", "div", "body", "td", "blockquote", "p", "pre", "font",
    "center",
];

/// Containers a winning block may widen to.
const WIDEN_TAGS: &[&str] = &["article", "main", "section", "div", "td"];

/// Share of the winner's score an enclosing container must keep to replace it.
const WIDEN_SCORE_RATIO: f32 = 0.5;

/// Lowest confidence reported for an accepted body.
const MIN_CONFIDENCE: f32 = 0.01;

/// Works on any page: scores every container and keeps the best one.
#[derive(Debug, Clone, Copy)]
pub struct GenericStrategy {
    scorer: BlockScorer,
    min_content_chars: usize,
}

impl GenericStrategy {
    pub fn new(limits: Limits, min_content_chars: usize) -> Self {
        Self {
            scorer: BlockScorer::new(limits),
            min_content_chars,
        }
    }
}

impl Strategy for GenericStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Generic
    }

    fn extract(
        &self,
        _source: &Source,
        doc: &Document,
        _raw: &RawDocument,
    ) -> Result<Option<ExtractionCandidate>, StrategyError> {
        let dom = doc.dom();
        let scored = self.scorer.score_all(dom, doc.body());

        let mut best: Option<&ScoredNode> = None;
        for node in &scored {
            let eligible = !node.boilerplate
                && dom.tag(node.node).is_some_and(|t| CONTAINER_TAGS.contains(&t))
                && node.stats.content_chars() >= self.min_content_chars;
            if eligible && best.is_none_or(|b| node.score > b.score) {
                best = Some(node);
            }
        }
        let Some(best) = best else {
            debug!(elements = scored.len(), "no container with enough content");
            return Ok(None);
        };
        let chosen = widen(dom, &scored, best);
        debug!(
            tag = dom.tag(chosen.node).unwrap_or_default(),
            score = best.score,
            widened = chosen.node != best.node,
            chars = chosen.stats.content_chars(),
            "generic heuristic picked container"
        );

        let boilerplate: HashSet<NodeId> = scored
            .iter()
            .filter(|s| s.boilerplate)
            .map(|s| s.node)
            .collect();
        let limits = self.scorer.limits();
        let (body, _) = dom.clone_subtree(chosen.node, limits, |d, id| {
            d.tag(id).is_some_and(text::is_invisible) || boilerplate.contains(&id)
        });

        let mut candidate = ExtractionCandidate::new(
            body,
            best.score.max(MIN_CONFIDENCE),
            StrategyKind::Generic,
        );
        candidate.title = metadata::title(doc);
        candidate.author = metadata::author(doc);
        candidate.published = metadata::published(doc);
        Ok(Some(candidate))
    }
}

/// Climb from the best block to the widest enclosing container that still
/// scores close to it, so sibling images, lists and headings come along.
fn widen<'a>(dom: &Dom, scored: &'a [ScoredNode], best: &'a ScoredNode) -> &'a ScoredNode {
    let by_id: HashMap<NodeId, &ScoredNode> = scored.iter().map(|s| (s.node, s)).collect();
    let floor = best.score * WIDEN_SCORE_RATIO;
    let mut chosen = best;
    while let Some(parent) = dom.parent(chosen.node).and_then(|p| by_id.get(&p).copied()) {
        let fits = !parent.boilerplate
            && dom.tag(parent.node).is_some_and(|t| WIDEN_TAGS.contains(&t))
            && parent.score >= floor
            && parent.stats.content_chars() >= chosen.stats.content_chars();
        if !fits {
            break;
        }
        chosen = parent;
    }
    chosen
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(html: &str) -> Option<ExtractionCandidate> {
        let raw = RawDocument::parse(html, "https://example.com/a/b").unwrap();
        let doc = Document::parse(&raw.html);
        let source = Source::web("https://example.com/a/b").unwrap();
        GenericStrategy::new(Limits::default(), 25)
            .extract(&source, &doc, &raw)
            .unwrap()
    }

    fn body_text(candidate: &ExtractionCandidate) -> String {
        text::clean_text_of(&candidate.body, candidate.body.root(), Limits::default())
    }

    #[test]
    fn test_picks_article_over_chrome() {
        let candidate = run(
            "<html><head><title>Storm hits coast | Gazette</title></head><body>\
             <nav><a href='/'>Home</a> <a href='/world'>World</a></nav>\
             <div class='content'><h1>Storm hits coast</h1>\
             <p>A powerful storm made landfall early on Monday, bringing heavy rain.</p>\
             <p>Thousands of homes lost power as winds reached record speeds overnight.</p>\
             <div class='share-buttons'><a href='#'>Share on social media</a></div></div>\
             <footer>Copyright 2024 The Gazette. All rights reserved.</footer></body></html>",
        )
        .unwrap();
        assert!(candidate.confidence > 0.0);
        assert_eq!(candidate.title.as_deref(), Some("Storm hits coast"));
        let text = body_text(&candidate);
        assert!(text.contains("powerful storm"));
        assert!(text.contains("record speeds"));
        assert!(!text.contains("Copyright"));
        assert!(!text.contains("Share on"));
        assert!(!text.contains("Home"));
    }

    #[test]
    fn test_single_paragraph_has_positive_confidence() {
        let candidate = run("<p>Just one paragraph that is long enough to count.</p>").unwrap();
        assert!(candidate.confidence > 0.0);
    }

    #[test]
    fn test_navigation_and_footer_only_yields_nothing() {
        let candidate = run(
            "<body><nav><ul><li><a href='/'>Home</a></li><li><a href='/about'>About us</a></li></ul></nav>\
             <footer><p>Copyright 2024 Example Inc. All rights reserved worldwide.</p></footer></body>",
        );
        assert!(candidate.is_none());
    }

    #[test]
    fn test_lone_paragraph_widens_to_its_article() {
        let candidate = run(
            "<article><p>The chart below shows the numbers for the whole of last year.</p>\
             <img src='page_files/chart.png' alt='Chart'></article>",
        )
        .unwrap();
        assert!(candidate.body.find_tag("p").is_some());
        assert!(candidate.body.find_tag("img").is_some());
    }

    #[test]
    fn test_short_article_keeps_image_and_list() {
        let candidate = run(
            "<body><article><h2>Results</h2>\
             <p>The chart below shows the numbers for the whole of last year.</p>\
             <img src='page_files/chart.png' alt='Chart'>\
             <ul><li>Revenue grew</li><li>Costs fell</li></ul></article></body>",
        )
        .unwrap();
        assert!(candidate.body.find_tag("h2").is_some());
        assert!(candidate.body.find_tag("img").is_some());
        assert!(candidate.body.find_tag("ul").is_some());
        assert!(body_text(&candidate).contains("Costs fell"));
    }

    #[test]
    fn test_article_inside_negative_class_wrapper() {
        for wrapper in [
            "layout has-sidebar",
            "post-content social-share-enabled",
            "layout with-comments",
        ] {
            let candidate = run(&format!(
                "<body><div class='{wrapper}'><article>\
                 <p>The council met on Tuesday to discuss the new budget for the coming year.</p>\
                 <p>Members debated for several hours before reaching a compromise on roads.</p>\
                 <p>The final vote is expected next month after a public consultation.</p>\
                 </article><div class='sidebar'><a href='/a'>Popular one</a> \
                 <a href='/b'>Popular two</a></div></div></body>"
            ))
            .unwrap_or_else(|| panic!("nothing extracted inside {wrapper:?}"));
            assert!(candidate.confidence > 0.0);
            let text = body_text(&candidate);
            assert!(text.contains("council met"), "{wrapper}: {text}");
            assert!(text.contains("public consultation"), "{wrapper}: {text}");
            assert!(!text.contains("Popular"), "{wrapper}: {text}");
        }
    }

    #[test]
    fn test_short_text_yields_nothing() {
        assert!(run("<p>Too short.</p>").is_none());
    }
}

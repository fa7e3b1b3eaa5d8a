//! Density-based content scoring.
//!
//! Every element gets [`BlockStats`] aggregated bottom-up in one bounded walk,
//! then a score in `[0, 1]` from text density, link density and tag
//! semantics. Results are plain [`ScoredNode`] records; the tree is not
//! touched.

use crate::html::{Dom, Limits, NodeId, Visit, text};

/// Elements whose subtree is boilerplate.
pub(crate) const LOW_VALUE_TAGS: &[&str] = &[
    "nav", "footer", "aside", "form", "script", "style", "button", "menu", "dialog",
];

/// Class/id words that suggest article content.
const POSITIVE_WORDS: &[&str] = &[
    "article", "body", "content", "entry", "main", "page", "post", "prose", "story", "text",
    "blog",
];

/// Class/id words that suggest chrome or advertising.
pub(crate) const NEGATIVE_WORDS: &[&str] = &[
    "ad", "ads", "adsbygoogle", "advert", "advertisement", "banner", "breadcrumb",
    "breadcrumbs", "comment", "comments", "cookie", "footer", "masthead", "menu", "nav",
    "navbar", "newsletter", "outbrain", "popup", "promo", "related", "share", "sharing",
    "sidebar", "social", "sponsor", "sponsored", "subscribe", "taboola", "widget",
];

/// Paragraphs and link density at which a wrapper with a negative class/id
/// word still reads as running text.
const CONTENT_PARAGRAPHS: usize = 2;
const CONTENT_LINK_DENSITY: f32 = 0.3;
/// Score factor for content under a negative class/id word.
const NEGATIVE_WEIGHT: f32 = 0.7;

/// Counters aggregated over a subtree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockStats {
    /// Visible characters, whitespace collapsed.
    pub text_chars: usize,
    /// Visible characters inside links.
    pub link_chars: usize,
    /// Visible characters inside low-value landmarks.
    pub boilerplate_chars: usize,
    /// Estimated characters of markup (tags and attributes).
    pub markup_chars: usize,
    /// Paragraph-like descendants, self included.
    pub paragraphs: usize,
    pub headings: usize,
    pub images: usize,
    /// Part of the subtree was cut off by a traversal limit.
    pub truncated: bool,
}

impl BlockStats {
    /// Visible characters outside boilerplate landmarks.
    pub fn content_chars(&self) -> usize {
        self.text_chars.saturating_sub(self.boilerplate_chars)
    }

    pub fn link_density(&self) -> f32 {
        if self.text_chars == 0 {
            0.0
        } else {
            self.link_chars as f32 / self.text_chars as f32
        }
    }

    fn absorb(&mut self, child: &BlockStats) {
        self.text_chars += child.text_chars;
        self.link_chars += child.link_chars;
        self.boilerplate_chars += child.boilerplate_chars;
        self.markup_chars += child.markup_chars;
        self.paragraphs += child.paragraphs;
        self.headings += child.headings;
        self.images += child.images;
        self.truncated |= child.truncated;
    }
}

/// A scored element.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredNode {
    pub node: NodeId,
    /// Depth below the scored root.
    pub depth: usize,
    pub score: f32,
    /// The node is a low-value landmark, sits inside one, or is a
    /// link-heavy block with an ad-pattern class.
    pub boilerplate: bool,
    pub stats: BlockStats,
}

/// Scores element subtrees by how much they look like article content.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockScorer {
    limits: Limits,
}

struct Record {
    node: NodeId,
    depth: usize,
    parent: Option<usize>,
    in_link: bool,
    /// Inside a low-value landmark.
    landmark: bool,
    /// Own class/id carries a negative word.
    negative: bool,
    stats: BlockStats,
}

impl BlockScorer {
    pub fn new(limits: Limits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    /// Score of the subtree at `node`. Zero for non-elements without content.
    pub fn score(&self, dom: &Dom, node: NodeId) -> f32 {
        self.score_all(dom, node)
            .first()
            .map_or(0.0, |scored| scored.score)
    }

    /// Score `root` and every element below it, in document order.
    pub fn score_all(&self, dom: &Dom, root: NodeId) -> Vec<ScoredNode> {
        let limits = self.limits;
        let mut records: Vec<Record> = Vec::new();
        // Record index of the open element at each depth.
        let mut path: Vec<usize> = Vec::new();

        let walk = dom.walk(root, limits, |id, depth| {
            path.truncate(depth);
            let parent = path.last().copied();

            if let Some(content) = dom.text(id) {
                let chars = visible_chars(content);
                if let Some(p) = parent {
                    let rec = &mut records[p];
                    rec.stats.text_chars += chars;
                    if rec.in_link {
                        rec.stats.link_chars += chars;
                    }
                    if rec.landmark {
                        rec.stats.boilerplate_chars += chars;
                    }
                }
                return Visit::Skip;
            }

            let tag = dom.tag(id);
            if tag.is_some_and(text::is_invisible) {
                return Visit::Skip;
            }
            if tag.is_none() && depth > 0 {
                // Comments and doctypes.
                return Visit::Skip;
            }

            let (parent_link, parent_landmark) =
                parent.map_or((false, false), |p| (records[p].in_link, records[p].landmark));
            let mut stats = BlockStats::default();
            if let Some(tag) = tag {
                stats.markup_chars = markup_estimate(dom, id, tag);
                if matches!(tag, "p" | "pre" | "blockquote") {
                    stats.paragraphs = 1;
                }
                if text::heading_level(tag).is_some() {
                    stats.headings = 1;
                }
                if tag == "img" {
                    stats.images = 1;
                }
            }
            let has_children = dom.get(id).is_some_and(|n| n.first_child.is_some());
            stats.truncated = has_children && depth >= limits.max_depth;

            records.push(Record {
                node: id,
                depth,
                parent,
                in_link: parent_link || tag == Some("a"),
                landmark: parent_landmark || is_landmark(dom, id),
                negative: has_negative_class(dom, id),
                stats,
            });
            path.push(records.len() - 1);
            Visit::Descend
        });

        // Children always follow their parent, so a reverse sweep aggregates
        // every subtree before its parent reads it.
        for i in (0..records.len()).rev() {
            if walk.truncated && i == 0 {
                records[0].stats.truncated = true;
            }
            if let Some(p) = records[i].parent {
                let child = records[i].stats;
                records[p].stats.absorb(&child);
            }
        }

        // Class-derived flags need the aggregated stats; parents come first.
        let mut boilerplate = vec![false; records.len()];
        for (i, rec) in records.iter().enumerate() {
            let inherited = rec.parent.is_some_and(|p| boilerplate[p])
                && !matches!(dom.tag(rec.node), Some("article" | "main"));
            boilerplate[i] =
                rec.landmark || inherited || (rec.negative && !reads_as_content(&rec.stats));
        }

        records
            .into_iter()
            .zip(boilerplate)
            .map(|(rec, boilerplate)| ScoredNode {
                node: rec.node,
                depth: rec.depth,
                score: score_stats(dom, rec.node, &rec.stats, boilerplate, rec.negative),
                boilerplate,
                stats: rec.stats,
            })
            .collect()
    }
}

/// Characters a text node contributes once whitespace is collapsed.
fn visible_chars(content: &str) -> usize {
    let mut count = 0;
    let mut in_space = true;
    for c in content.chars() {
        if c.is_whitespace() {
            if !in_space {
                count += 1;
                in_space = true;
            }
        } else {
            count += 1;
            in_space = false;
        }
    }
    if in_space && count > 0 { count - 1 } else { count }
}

fn markup_estimate(dom: &Dom, id: NodeId, tag: &str) -> usize {
    // Image attributes are mostly URLs; they are content, not chrome.
    if matches!(tag, "img" | "picture" | "source") {
        return 2 * tag.len() + 5;
    }
    let attrs: usize = dom
        .attrs(id)
        .iter()
        .map(|a| a.name.local.len() + a.value.len() + 4)
        .sum();
    2 * tag.len() + 5 + attrs
}

/// Split class and id values into lower-case words.
pub(crate) fn class_words(dom: &Dom, id: NodeId) -> impl Iterator<Item = String> + '_ {
    dom.classes(id)
        .iter()
        .map(String::as_str)
        .chain(dom.element_id(id))
        .flat_map(|value| value.split(|c: char| !c.is_ascii_alphanumeric()))
        .filter(|word| !word.is_empty())
        .map(str::to_ascii_lowercase)
}

/// Low-value landmark tag or navigation-like role.
pub(crate) fn is_landmark(dom: &Dom, id: NodeId) -> bool {
    let Some(tag) = dom.tag(id) else {
        return false;
    };
    LOW_VALUE_TAGS.contains(&tag)
        || matches!(
            dom.attr(id, "role"),
            Some("navigation" | "banner" | "contentinfo" | "complementary")
        )
}

/// Ad-pattern class/id word with no content word beside it.
fn has_negative_class(dom: &Dom, id: NodeId) -> bool {
    if matches!(dom.tag(id), None | Some("body" | "html" | "article" | "main")) {
        return false;
    }
    let mut negative = false;
    for word in class_words(dom, id) {
        if POSITIVE_WORDS.contains(&word.as_str()) {
            return false;
        }
        negative |= NEGATIVE_WORDS.contains(&word.as_str());
    }
    negative
}

fn reads_as_content(stats: &BlockStats) -> bool {
    stats.paragraphs >= CONTENT_PARAGRAPHS && stats.link_density() < CONTENT_LINK_DENSITY
}

/// Whether an element is chrome, judged from the element and its subtree.
///
/// Landmarks always are. A negative class/id word only counts when the
/// subtree does not read as running text, so `has-sidebar` layout wrappers
/// keep their article.
pub(crate) fn is_boilerplate(dom: &Dom, id: NodeId, limits: Limits) -> bool {
    if is_landmark(dom, id) {
        return true;
    }
    has_negative_class(dom, id) && !reads_as_content(&subtree_stats(dom, id, limits))
}

/// Text, link and paragraph counts of one subtree, from a single walk.
pub(crate) fn subtree_stats(dom: &Dom, root: NodeId, limits: Limits) -> BlockStats {
    let mut stats = BlockStats::default();
    // Whether the open element at each depth is a link or inside one.
    let mut links: Vec<bool> = Vec::new();
    let walk = dom.walk(root, limits, |id, depth| {
        links.truncate(depth);
        let in_link = links.last().copied().unwrap_or(false);
        if let Some(content) = dom.text(id) {
            let chars = visible_chars(content);
            stats.text_chars += chars;
            if in_link {
                stats.link_chars += chars;
            }
            return Visit::Skip;
        }
        let Some(tag) = dom.tag(id) else {
            return Visit::Skip;
        };
        if text::is_invisible(tag) {
            return Visit::Skip;
        }
        if matches!(tag, "p" | "pre" | "blockquote") {
            stats.paragraphs += 1;
        }
        links.push(in_link || tag == "a");
        Visit::Descend
    });
    stats.truncated = walk.truncated;
    stats
}

fn tag_weight(tag: Option<&str>) -> f32 {
    match tag {
        Some("article" | "main") => 1.25,
        Some("section") => 1.05,
        Some("div" | "td") => 1.0,
        Some("body" | "blockquote") => 0.9,
        Some("p" | "pre") => 0.85,
        Some("ul" | "ol" | "table") => 0.6,
        Some("header") => 0.5,
        Some(_) => 0.4,
        None => 0.8,
    }
}

fn score_stats(
    dom: &Dom,
    id: NodeId,
    stats: &BlockStats,
    boilerplate: bool,
    negative: bool,
) -> f32 {
    if stats.text_chars == 0 {
        return 0.0;
    }
    let text = stats.text_chars as f32;
    let density = text / (text + stats.markup_chars as f32);
    let link_penalty = 1.0 - stats.link_density();
    let length = text / (text + 200.0);
    let paragraphs = 0.7 + 0.3 * (stats.paragraphs.min(3) as f32 / 3.0);
    let boilerplate_share = stats.boilerplate_chars as f32 / text;

    let mut score = density
        * link_penalty
        * length
        * paragraphs
        * tag_weight(dom.tag(id))
        * (1.0 - 0.5 * boilerplate_share);

    if boilerplate {
        score *= 0.2;
    } else if negative {
        score *= NEGATIVE_WEIGHT;
    } else if class_words(dom, id).any(|w| POSITIVE_WORDS.contains(&w.as_str())) {
        score *= 1.2;
    }
    if stats.truncated {
        score *= 0.5;
    }
    score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::Document;

    fn scorer() -> BlockScorer {
        BlockScorer::new(Limits::default())
    }

    fn score_of(doc: &Document, tag: &str) -> f32 {
        let id = doc.dom().find_tag(tag).unwrap();
        scorer().score(doc.dom(), id)
    }

    const PARAGRAPHS: &str = "<p>The council met on Tuesday to discuss the new budget for the coming year.</p>\
         <p>Members debated for several hours before reaching a compromise on road repairs.</p>\
         <p>The final vote is expected next month after a round of public consultation.</p>";

    #[test]
    fn test_visible_chars() {
        assert_eq!(visible_chars("  hello   world  "), 11);
        assert_eq!(visible_chars("   "), 0);
        assert_eq!(visible_chars("a"), 1);
    }

    #[test]
    fn test_scores_are_bounded() {
        let doc = Document::parse(&format!("<article>{PARAGRAPHS}</article>"));
        for scored in scorer().score_all(doc.dom(), doc.dom().root()) {
            assert!((0.0..=1.0).contains(&scored.score));
        }
    }

    #[test]
    fn test_article_beats_navigation() {
        let doc = Document::parse(&format!(
            "<body><nav><a href='/'>Home</a> <a href='/news'>News</a> <a href='/sport'>Sport</a></nav>\
             <article>{PARAGRAPHS}</article></body>"
        ));
        assert!(score_of(&doc, "article") > score_of(&doc, "nav"));
        assert!(score_of(&doc, "article") > 0.3);
    }

    #[test]
    fn test_link_density_penalizes() {
        let plain = Document::parse("<div>Some text that is not linked anywhere at all.</div>");
        let linked = Document::parse(
            "<div><a href='/x'>Some text that is not linked anywhere at all.</a></div>",
        );
        assert!(score_of(&plain, "div") > score_of(&linked, "div"));
        assert_eq!(score_of(&linked, "div"), 0.0);
    }

    #[test]
    fn test_ad_class_penalized() {
        let doc = Document::parse(&format!(
            "<div class='ad-container'>{PARAGRAPHS}</div><div class='post-body'>{PARAGRAPHS}</div>"
        ));
        let divs = doc.dom().find_all(|d, id| d.is_tag(id, "div"));
        let ad = scorer().score(doc.dom(), divs[0]);
        let post = scorer().score(doc.dom(), divs[1]);
        assert!(post > ad);
    }

    fn with_class(dom: &Dom, class: &str) -> NodeId {
        dom.find(|d, id| d.classes(id).iter().any(|c| c == class)).unwrap()
    }

    #[test]
    fn test_negative_class_is_a_weight_on_running_text() {
        let doc = Document::parse(&format!(
            "<div class='layout has-sidebar'><article>{PARAGRAPHS}</article>\
             <div class='sidebar'><a href='/a'>Popular one</a> <a href='/b'>Popular two</a></div></div>"
        ));
        let dom = doc.dom();
        let scored = scorer().score_all(dom, dom.root());
        let flag = |id: NodeId| scored.iter().find(|s| s.node == id).unwrap().boilerplate;

        let wrapper = with_class(dom, "has-sidebar");
        let sidebar = with_class(dom, "sidebar");
        assert!(!flag(wrapper));
        assert!(!flag(dom.find_tag("article").unwrap()));
        assert!(flag(sidebar));
        assert!(score_of(&doc, "article") > 0.3);

        assert!(!is_boilerplate(dom, wrapper, Limits::default()));
        assert!(is_boilerplate(dom, sidebar, Limits::default()));
    }

    #[test]
    fn test_article_escapes_flagged_wrapper() {
        let doc = Document::parse(
            "<div class='comments'><a href='/1'>One reply</a> <a href='/2'>Two replies</a>\
             <article><p>The council met on Tuesday to discuss the new budget.</p></article></div>",
        );
        let dom = doc.dom();
        let scored = scorer().score_all(dom, dom.root());
        let find = |id: NodeId| scored.iter().find(|s| s.node == id).unwrap();

        assert!(find(with_class(dom, "comments")).boilerplate);
        let article = find(dom.find_tag("article").unwrap());
        assert!(!article.boilerplate);
        assert!(article.score > 0.0);
    }

    #[test]
    fn test_subtree_stats_counts_links() {
        let doc = Document::parse(
            "<header><a href='/'>Home</a> <a href='/news'>News</a> <span>Today</span></header>",
        );
        let header = doc.dom().find_tag("header").unwrap();
        let stats = subtree_stats(doc.dom(), header, Limits::default());
        assert_eq!(stats.link_chars, 8);
        assert!(stats.link_density() > 0.5);
    }

    #[test]
    fn test_stats_aggregate_bottom_up() {
        let doc = Document::parse(
            "<div><p>Hello <a href='#'>world</a></p><footer>Copyright</footer><img src='x.png'></div>",
        );
        let div = doc.dom().find_tag("div").unwrap();
        let scored = scorer().score_all(doc.dom(), div);
        let stats = scored[0].stats;
        assert_eq!(stats.link_chars, 5);
        assert_eq!(stats.boilerplate_chars, 9);
        assert_eq!(stats.paragraphs, 1);
        assert_eq!(stats.images, 1);
        assert!(scored.iter().any(|s| s.boilerplate && doc.dom().is_tag(s.node, "footer")));
    }

    #[test]
    fn test_deep_nesting_degrades_instead_of_failing() {
        let mut html = String::new();
        for _ in 0..500 {
            html.push_str("<div>");
        }
        html.push_str("deep text that will not be reached by the walk");
        let doc = Document::parse(&html);
        let limited = BlockScorer::new(Limits {
            max_depth: 16,
            max_nodes: 10_000,
        });
        let scored = limited.score_all(doc.dom(), doc.dom().root());
        assert!(scored[0].stats.truncated);
        assert!(scored.iter().all(|s| s.depth <= 16));
    }

    #[test]
    fn test_truncation_halves_score() {
        let doc = Document::parse(&format!("<article><section>{PARAGRAPHS}</section></article>"));
        let article = doc.dom().find_tag("article").unwrap();
        let full = scorer().score(doc.dom(), article);
        let cut = BlockScorer::new(Limits {
            max_depth: 2,
            max_nodes: 10_000,
        })
        .score(doc.dom(), article);
        assert!(cut < full);
    }
}

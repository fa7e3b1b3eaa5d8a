//! Flattening a cleaned body tree into content blocks.
//!
//! The walk keeps its own enter/exit stack so inline runs can be closed at
//! the end of their block container. It shares the depth and node budget of
//! every other traversal.

use url::Url;

use super::images;
use crate::article::ContentBlock;
use crate::html::{Dom, Limits, NodeId, Visit, text};

/// Elements whose content becomes a single block of their own.
enum Special {
    Heading(u8),
    List { ordered: bool },
    Quote,
    Table,
    Image,
    Break,
}

fn special(tag: &str) -> Option<Special> {
    if let Some(level) = text::heading_level(tag) {
        return Some(Special::Heading(level));
    }
    match tag {
        "ul" => Some(Special::List { ordered: false }),
        "ol" => Some(Special::List { ordered: true }),
        "blockquote" => Some(Special::Quote),
        "table" => Some(Special::Table),
        "img" => Some(Special::Image),
        "br" => Some(Special::Break),
        _ => None,
    }
}

enum Step {
    Enter(NodeId, usize),
    Exit,
}

pub(super) struct Linearizer<'a, F> {
    dom: &'a Dom,
    base: &'a Url,
    limits: Limits,
    removed: F,
    blocks: Vec<ContentBlock>,
    inline: String,
    /// Nodes visited so far, shared by the main walk and nested text walks.
    budget: usize,
    truncated: bool,
}

impl<'a, F> Linearizer<'a, F>
where
    F: Fn(&Dom, NodeId) -> bool,
{
    /// `removed` marks subtrees that are not article content.
    pub(super) fn new(dom: &'a Dom, base: &'a Url, limits: Limits, removed: F) -> Self {
        Self {
            dom,
            base,
            limits,
            removed,
            blocks: Vec::new(),
            inline: String::new(),
            budget: 0,
            truncated: false,
        }
    }

    pub(super) fn run(mut self, root: NodeId) -> (Vec<ContentBlock>, bool) {
        let mut stack = vec![Step::Enter(root, 0)];

        while let Some(step) = stack.pop() {
            let (id, depth) = match step {
                Step::Enter(id, depth) => (id, depth),
                Step::Exit => {
                    self.flush();
                    continue;
                }
            };
            if !self.spend() {
                break;
            }

            if let Some(content) = self.dom.text(id) {
                self.inline.push_str(content);
                continue;
            }
            let Some(tag) = self.dom.tag(id) else {
                if id == root {
                    self.push_children(&mut stack, id, depth);
                }
                continue;
            };
            if (self.removed)(self.dom, id) {
                continue;
            }

            match special(tag) {
                Some(Special::Break) => self.inline.push(' '),
                Some(Special::Image) => self.image(id),
                Some(Special::Heading(level)) => {
                    self.flush();
                    let text = self.text_of(id);
                    self.push(ContentBlock::Heading { level, text });
                }
                Some(Special::Quote) => {
                    self.flush();
                    let text = self.text_of(id);
                    self.push(ContentBlock::Quote { text });
                }
                Some(Special::List { ordered }) => {
                    self.flush();
                    self.list(id, ordered);
                }
                Some(Special::Table) => {
                    self.flush();
                    self.table(id);
                }
                None if text::is_block(tag) => {
                    self.flush();
                    stack.push(Step::Exit);
                    self.push_children(&mut stack, id, depth);
                }
                None => self.push_children(&mut stack, id, depth),
            }
        }

        self.flush();
        (self.blocks, self.truncated)
    }

    fn spend(&mut self) -> bool {
        if self.budget >= self.limits.max_nodes {
            self.truncated = true;
            return false;
        }
        self.budget += 1;
        true
    }

    fn push_children(&mut self, stack: &mut Vec<Step>, id: NodeId, depth: usize) {
        if self.dom.children(id).next().is_none() {
            return;
        }
        if depth >= self.limits.max_depth {
            self.truncated = true;
            return;
        }
        let mark = stack.len();
        stack.extend(self.dom.children(id).map(|c| Step::Enter(c, depth + 1)));
        stack[mark..].reverse();
    }

    fn flush(&mut self) {
        let text = text::collapse_whitespace(&self.inline);
        self.inline.clear();
        self.push(ContentBlock::Paragraph { text });
    }

    fn push(&mut self, block: ContentBlock) {
        if !block.is_empty() {
            self.blocks.push(block);
        }
    }

    fn image(&mut self, id: NodeId) {
        let Some(src) = images::image_source(self.dom, id, self.base) else {
            return;
        };
        self.flush();
        let alt = images::alt_text(self.dom, id);
        self.push(ContentBlock::Image { src, alt });
    }

    fn list(&mut self, id: NodeId, ordered: bool) {
        let dom = self.dom;
        let entries: Vec<NodeId> = dom
            .children(id)
            .filter(|&c| dom.is_tag(c, "li") && !(self.removed)(dom, c))
            .collect();
        let mut items = Vec::with_capacity(entries.len());
        for li in entries {
            let item = self.text_of(li);
            if !item.is_empty() {
                items.push(item);
            }
        }
        self.push(ContentBlock::List { ordered, items });
    }

    /// One paragraph per row, cells separated by ` | `.
    fn table(&mut self, id: NodeId) {
        let dom = self.dom;
        let mut rows = Vec::new();
        dom.walk(id, self.limits, |node, _| {
            if node != id && dom.is_tag(node, "table") {
                return Visit::Skip;
            }
            if dom.is_tag(node, "tr") {
                rows.push(node);
                return Visit::Skip;
            }
            Visit::Descend
        });

        for row in rows {
            let cells: Vec<NodeId> = dom
                .children(row)
                .filter(|&c| matches!(dom.tag(c), Some("td" | "th")))
                .collect();
            let mut texts = Vec::with_capacity(cells.len());
            for cell in cells {
                let text = self.text_of(cell);
                if !text.is_empty() {
                    texts.push(text);
                }
            }
            self.push(ContentBlock::Paragraph {
                text: texts.join(" | "),
            });
        }
    }

    /// Collapsed text of a subtree, leaving out removed elements.
    fn text_of(&mut self, root: NodeId) -> String {
        let dom = self.dom;
        let removed = &self.removed;
        let remaining = Limits {
            max_depth: self.limits.max_depth,
            max_nodes: self.limits.max_nodes.saturating_sub(self.budget),
        };
        let mut out = String::new();
        let stats = dom.walk(root, remaining, |id, _| {
            if let Some(content) = dom.text(id) {
                let after_block = dom
                    .get(id)
                    .and_then(|n| dom.tag(n.prev_sibling))
                    .is_some_and(text::is_block);
                if after_block {
                    out.push(' ');
                }
                out.push_str(content);
                return Visit::Skip;
            }
            match dom.tag(id) {
                Some(tag) if text::is_invisible(tag) || removed(dom, id) => {
                    Visit::Skip
                }
                Some("br") => {
                    out.push(' ');
                    Visit::Skip
                }
                Some(tag) if text::is_block(tag) => {
                    out.push(' ');
                    Visit::Descend
                }
                _ => Visit::Descend,
            }
        });
        self.budget += stats.visited;
        self.truncated |= stats.truncated;
        text::collapse_whitespace(&out)
    }
}

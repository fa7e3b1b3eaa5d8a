//! Arena-allocated element tree.
//!
//! All nodes live in one contiguous vector; parent/child/sibling links are
//! indices into it. Every traversal is iterative and bounded by [`Limits`],
//! so pathological nesting costs a truncated walk, never a blown stack.

use html5ever::{LocalName, QualName, ns};

/// Index of a node in a [`Dom`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Sentinel for "no node".
    pub const NONE: NodeId = NodeId(u32::MAX);

    pub fn is_some(&self) -> bool {
        self.0 != u32::MAX
    }

    pub fn is_none(&self) -> bool {
        self.0 == u32::MAX
    }
}

/// Payload of a node.
#[derive(Debug, Clone)]
pub enum NodeData {
    Document,
    Element {
        name: QualName,
        attrs: Vec<Attribute>,
        /// Pre-extracted `id` attribute.
        id: Option<String>,
        /// Pre-extracted `class` tokens.
        classes: Vec<String>,
    },
    Text(String),
    Comment,
    Doctype,
}

#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: QualName,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub data: NodeData,
    pub parent: NodeId,
    pub first_child: NodeId,
    pub last_child: NodeId,
    pub prev_sibling: NodeId,
    pub next_sibling: NodeId,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: NodeId::NONE,
            first_child: NodeId::NONE,
            last_child: NodeId::NONE,
            prev_sibling: NodeId::NONE,
            next_sibling: NodeId::NONE,
        }
    }
}

/// Traversal budget: how deep and how many nodes a walk may visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_depth: usize,
    pub max_nodes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_depth: 64,
            max_nodes: 50_000,
        }
    }
}

/// Visitor decision for [`Dom::walk`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Descend,
    Skip,
}

/// What a bounded walk covered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    pub visited: usize,
    /// Some nodes were not visited because a limit was hit.
    pub truncated: bool,
}

/// Arena-based element tree.
#[derive(Debug, Clone)]
pub struct Dom {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Dom {
    /// Create an empty tree holding only a document node.
    pub fn new() -> Self {
        let mut dom = Self {
            nodes: Vec::new(),
            root: NodeId::NONE,
        };
        dom.root = dom.alloc(Node::new(NodeData::Document));
        dom
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// The document node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        if id.is_none() {
            return None;
        }
        self.nodes.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        if id.is_none() {
            return None;
        }
        self.nodes.get_mut(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the tree holds nothing but the document node.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn create_element(&mut self, name: QualName, attrs: Vec<Attribute>) -> NodeId {
        let mut id = None;
        let mut classes = Vec::new();
        for attr in &attrs {
            match attr.name.local.as_ref() {
                "id" => id = Some(attr.value.clone()),
                "class" => {
                    classes = attr.value.split_whitespace().map(str::to_string).collect();
                }
                _ => {}
            }
        }
        self.alloc(Node::new(NodeData::Element {
            name,
            attrs,
            id,
            classes,
        }))
    }

    /// Convenience for building trees by hand: an HTML element with plain attributes.
    pub fn create_html_element(&mut self, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let attrs = attrs
            .iter()
            .map(|(name, value)| Attribute {
                name: QualName::new(None, ns!(), LocalName::from(*name)),
                value: (*value).to_string(),
            })
            .collect();
        self.create_element(
            QualName::new(None, ns!(html), LocalName::from(tag)),
            attrs,
        )
    }

    pub fn create_text(&mut self, text: String) -> NodeId {
        self.alloc(Node::new(NodeData::Text(text)))
    }

    pub fn create_comment(&mut self) -> NodeId {
        self.alloc(Node::new(NodeData::Comment))
    }

    pub fn create_doctype(&mut self) -> NodeId {
        self.alloc(Node::new(NodeData::Doctype))
    }

    /// Append `child` as the last child of `parent`.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        let last_child = self.get(parent).map_or(NodeId::NONE, |n| n.last_child);

        if let Some(node) = self.get_mut(child) {
            node.parent = parent;
            node.prev_sibling = last_child;
            node.next_sibling = NodeId::NONE;
        }
        if let Some(last) = self.get_mut(last_child) {
            last.next_sibling = child;
        }
        if let Some(p) = self.get_mut(parent) {
            if p.first_child.is_none() {
                p.first_child = child;
            }
            p.last_child = child;
        }
    }

    /// Insert `new_node` immediately before `sibling`.
    pub fn insert_before(&mut self, sibling: NodeId, new_node: NodeId) {
        let Some((parent, prev)) = self.get(sibling).map(|n| (n.parent, n.prev_sibling)) else {
            return;
        };

        if let Some(node) = self.get_mut(new_node) {
            node.parent = parent;
            node.prev_sibling = prev;
            node.next_sibling = sibling;
        }
        if let Some(sib) = self.get_mut(sibling) {
            sib.prev_sibling = new_node;
        }
        if prev.is_some() {
            if let Some(p) = self.get_mut(prev) {
                p.next_sibling = new_node;
            }
        } else if let Some(p) = self.get_mut(parent) {
            p.first_child = new_node;
        }
    }

    /// Append text, merging with a trailing text node when there is one.
    pub fn append_text(&mut self, parent: NodeId, text: &str) {
        let last_child = self.get(parent).map_or(NodeId::NONE, |n| n.last_child);
        if let Some(last) = self.get_mut(last_child)
            && let NodeData::Text(existing) = &mut last.data
        {
            existing.push_str(text);
            return;
        }
        let node = self.create_text(text.to_string());
        self.append(parent, node);
    }

    /// Unlink a node (and its subtree) from its parent.
    pub fn detach(&mut self, target: NodeId) {
        let Some((parent, prev, next)) = self
            .get(target)
            .map(|n| (n.parent, n.prev_sibling, n.next_sibling))
        else {
            return;
        };

        if prev.is_some() {
            if let Some(p) = self.get_mut(prev) {
                p.next_sibling = next;
            }
        } else if let Some(p) = self.get_mut(parent) {
            p.first_child = next;
        }

        if next.is_some() {
            if let Some(n) = self.get_mut(next) {
                n.prev_sibling = prev;
            }
        } else if let Some(p) = self.get_mut(parent) {
            p.last_child = prev;
        }

        if let Some(node) = self.get_mut(target) {
            node.parent = NodeId::NONE;
            node.prev_sibling = NodeId::NONE;
            node.next_sibling = NodeId::NONE;
        }
    }

    pub fn children(&self, parent: NodeId) -> Children<'_> {
        Children {
            dom: self,
            current: self.get(parent).map_or(NodeId::NONE, |n| n.first_child),
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).map(|n| n.parent).filter(NodeId::is_some)
    }

    /// Pre-order walk from `root` within `limits`.
    ///
    /// The visitor sees each node with its depth relative to `root` and may
    /// skip the node's subtree.
    pub fn walk<F>(&self, root: NodeId, limits: Limits, mut visit: F) -> WalkStats
    where
        F: FnMut(NodeId, usize) -> Visit,
    {
        let mut stats = WalkStats::default();
        let mut stack = vec![(root, 0usize)];

        while let Some((id, depth)) = stack.pop() {
            if stats.visited >= limits.max_nodes {
                stats.truncated = true;
                break;
            }
            stats.visited += 1;

            if visit(id, depth) == Visit::Skip {
                continue;
            }

            let first = self.get(id).map_or(NodeId::NONE, |n| n.first_child);
            if first.is_none() {
                continue;
            }
            if depth >= limits.max_depth {
                stats.truncated = true;
                continue;
            }

            let mark = stack.len();
            stack.extend(self.children(id).map(|c| (c, depth + 1)));
            stack[mark..].reverse();
        }

        stats
    }

    /// Deep-copy the subtree at `root` into a fresh tree.
    ///
    /// Subtrees for which `skip` returns true are left out. The copy is
    /// attached under the new tree's document node.
    pub fn clone_subtree<F>(&self, root: NodeId, limits: Limits, skip: F) -> (Dom, WalkStats)
    where
        F: Fn(&Dom, NodeId) -> bool,
    {
        self.clone_subtrees(&[root], limits, skip)
    }

    /// Copy several subtrees, in order, under one fresh document node.
    pub fn clone_subtrees<F>(&self, roots: &[NodeId], limits: Limits, skip: F) -> (Dom, WalkStats)
    where
        F: Fn(&Dom, NodeId) -> bool,
    {
        let mut out = Dom::new();
        let out_root = out.root();
        let stats = self
            .copy_into(&mut out, out_root, roots, limits, skip)
            .unwrap_or_default();
        (out, stats)
    }

    fn copy_into<F>(
        &self,
        out: &mut Dom,
        out_parent: NodeId,
        roots: &[NodeId],
        limits: Limits,
        skip: F,
    ) -> Option<WalkStats>
    where
        F: Fn(&Dom, NodeId) -> bool,
    {
        if roots.is_empty() {
            return None;
        }

        let mut stats = WalkStats::default();
        // (source node, destination parent, depth)
        let mut stack: Vec<(NodeId, NodeId, usize)> = roots
            .iter()
            .rev()
            .map(|&r| (r, out_parent, 0))
            .collect();

        while let Some((src, dest_parent, depth)) = stack.pop() {
            if stats.visited >= limits.max_nodes {
                stats.truncated = true;
                break;
            }
            let Some(node) = self.get(src) else { continue };
            if skip(self, src) {
                continue;
            }
            stats.visited += 1;

            let copy = match &node.data {
                NodeData::Document => dest_parent,
                NodeData::Element { name, attrs, .. } => {
                    let id = out.create_element(name.clone(), attrs.clone());
                    out.append(dest_parent, id);
                    id
                }
                NodeData::Text(text) => {
                    out.append_text(dest_parent, text);
                    continue;
                }
                NodeData::Comment | NodeData::Doctype => continue,
            };

            if node.first_child.is_none() {
                continue;
            }
            if depth >= limits.max_depth {
                stats.truncated = true;
                continue;
            }
            let mark = stack.len();
            stack.extend(self.children(src).map(|c| (c, copy, depth + 1)));
            stack[mark..].reverse();
        }

        Some(stats)
    }

    /// First node in document order matching `predicate`.
    pub fn find<F>(&self, predicate: F) -> Option<NodeId>
    where
        F: Fn(&Dom, NodeId) -> bool,
    {
        let mut found = None;
        self.walk(self.root, Limits::default(), |id, _| {
            if found.is_some() {
                return Visit::Skip;
            }
            if predicate(self, id) {
                found = Some(id);
                return Visit::Skip;
            }
            Visit::Descend
        });
        found
    }

    /// All nodes in document order matching `predicate`.
    pub fn find_all<F>(&self, predicate: F) -> Vec<NodeId>
    where
        F: Fn(&Dom, NodeId) -> bool,
    {
        let mut found = Vec::new();
        self.walk(self.root, Limits::default(), |id, _| {
            if predicate(self, id) {
                found.push(id);
            }
            Visit::Descend
        });
        found
    }

    /// First element with the given tag name.
    pub fn find_tag(&self, tag: &str) -> Option<NodeId> {
        self.find(|dom, id| dom.tag(id) == Some(tag))
    }
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over the children of a node.
pub struct Children<'a> {
    dom: &'a Dom,
    current: NodeId,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current.is_none() {
            return None;
        }
        let id = self.current;
        self.current = self.dom.get(id).map_or(NodeId::NONE, |n| n.next_sibling);
        Some(id)
    }
}

/// Element accessors.
impl Dom {
    /// Local tag name of an element.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Element { name, .. } => Some(name.local.as_ref()),
            _ => None,
        })
    }

    pub fn qual_name(&self, id: NodeId) -> Option<&QualName> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Element { name, .. } => Some(name),
            _ => None,
        })
    }

    pub fn attr(&self, id: NodeId, attr_name: &str) -> Option<&str> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|a| a.name.local.as_ref() == attr_name)
                .map(|a| a.value.as_str()),
            _ => None,
        })
    }

    pub fn attrs(&self, id: NodeId) -> &[Attribute] {
        self.get(id)
            .and_then(|n| match &n.data {
                NodeData::Element { attrs, .. } => Some(attrs.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    pub fn element_id(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Element { id, .. } => id.as_deref(),
            _ => None,
        })
    }

    pub fn classes(&self, id: NodeId) -> &[String] {
        self.get(id)
            .and_then(|n| match &n.data {
                NodeData::Element { classes, .. } => Some(classes.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.get(id)
            .is_some_and(|n| matches!(n.data, NodeData::Element { .. }))
    }

    /// Text of a text node.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Text(s) => Some(s.as_str()),
            _ => None,
        })
    }

    /// Element with the given tag, if `id` is one.
    pub fn is_tag(&self, id: NodeId, tag: &str) -> bool {
        self.tag(id) == Some(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Dom, NodeId, NodeId, NodeId) {
        let mut dom = Dom::new();
        let div = dom.create_html_element("div", &[("id", "main"), ("class", "post body")]);
        let p1 = dom.create_html_element("p", &[]);
        let p2 = dom.create_html_element("p", &[]);
        let root = dom.root();
        dom.append(root, div);
        dom.append(div, p1);
        dom.append(div, p2);
        dom.append_text(p1, "Hello, ");
        dom.append_text(p1, "World!");
        (dom, div, p1, p2)
    }

    #[test]
    fn test_append_and_accessors() {
        let (dom, div, p1, p2) = sample();
        assert_eq!(dom.tag(div), Some("div"));
        assert_eq!(dom.element_id(div), Some("main"));
        assert_eq!(dom.classes(div), ["post".to_string(), "body".to_string()]);
        assert_eq!(dom.children(div).collect::<Vec<_>>(), vec![p1, p2]);
        assert_eq!(dom.parent(p1), Some(div));
    }

    #[test]
    fn test_text_merging() {
        let (dom, _, p1, _) = sample();
        let children: Vec<_> = dom.children(p1).collect();
        assert_eq!(children.len(), 1);
        assert_eq!(dom.text(children[0]), Some("Hello, World!"));
    }

    #[test]
    fn test_detach_and_insert_before() {
        let (mut dom, div, p1, p2) = sample();
        dom.detach(p1);
        assert_eq!(dom.children(div).collect::<Vec<_>>(), vec![p2]);
        dom.insert_before(p2, p1);
        assert_eq!(dom.children(div).collect::<Vec<_>>(), vec![p1, p2]);
    }

    #[test]
    fn test_walk_depth_limit_truncates() {
        let mut dom = Dom::new();
        let mut parent = dom.root();
        for _ in 0..200 {
            let div = dom.create_html_element("div", &[]);
            dom.append(parent, div);
            parent = div;
        }
        let limits = Limits {
            max_depth: 10,
            max_nodes: 1_000,
        };
        let stats = dom.walk(dom.root(), limits, |_, _| Visit::Descend);
        assert!(stats.truncated);
        assert_eq!(stats.visited, 11);
    }

    #[test]
    fn test_walk_node_budget_truncates() {
        let mut dom = Dom::new();
        let root = dom.root();
        for _ in 0..100 {
            let p = dom.create_html_element("p", &[]);
            dom.append(root, p);
        }
        let limits = Limits {
            max_depth: 10,
            max_nodes: 20,
        };
        let stats = dom.walk(root, limits, |_, _| Visit::Descend);
        assert!(stats.truncated);
        assert_eq!(stats.visited, 20);
    }

    #[test]
    fn test_clone_subtree_skips() {
        let (dom, div, _, p2) = sample();
        let (copy, stats) = dom.clone_subtree(div, Limits::default(), |_, id| id == p2);
        assert!(!stats.truncated);
        let copied_div = copy.find_tag("div").unwrap();
        assert_eq!(copy.children(copied_div).count(), 1);
        assert_eq!(copy.element_id(copied_div), Some("main"));
    }

    #[test]
    fn test_find_all_in_document_order() {
        let (dom, _, p1, p2) = sample();
        assert_eq!(dom.find_all(|d, id| d.is_tag(id, "p")), vec![p1, p2]);
    }
}

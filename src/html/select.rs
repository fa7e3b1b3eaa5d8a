//! CSS selector matching against [`Dom`] via the `selectors` crate.
//!
//! Domain rules name their content containers with ordinary CSS selectors
//! (`div.article-content`, `main > article`, ...).

use std::fmt;

use html5ever::{LocalName, Namespace};
use selectors::attr::{AttrSelectorOperation, CaseSensitivity, NamespaceConstraint};
use selectors::context::{MatchingContext, SelectorCaches};
use selectors::matching::ElementSelectorFlags;
use selectors::parser::SelectorParseErrorKind;
use selectors::{OpaqueElement, SelectorImpl};

use super::arena::{Dom, NodeData, NodeId};
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleSelectors;

#[derive(Debug, Clone, PartialEq, Eq, Default, Hash)]
pub struct Ident(pub String);

impl precomputed_hash::PrecomputedHash for Ident {
    fn precomputed_hash(&self) -> u32 {
        self.0
            .bytes()
            .fold(0u32, |h, b| h.wrapping_mul(31).wrapping_add(b as u32))
    }
}

impl AsRef<str> for Ident {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Ident {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Ident {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl cssparser::ToCss for Ident {
    fn to_css<W: fmt::Write>(&self, dest: &mut W) -> fmt::Result {
        dest.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Local(pub LocalName);

impl precomputed_hash::PrecomputedHash for Local {
    fn precomputed_hash(&self) -> u32 {
        self.0.precomputed_hash()
    }
}

impl cssparser::ToCss for Local {
    fn to_css<W: fmt::Write>(&self, dest: &mut W) -> fmt::Result {
        dest.write_str(self.0.as_ref())
    }
}

impl From<&str> for Local {
    fn from(s: &str) -> Self {
        Self(LocalName::from(s))
    }
}

impl From<String> for Local {
    fn from(s: String) -> Self {
        Self(LocalName::from(s))
    }
}

impl AsRef<str> for Local {
    fn as_ref(&self) -> &str {
        self.0.as_ref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Ns(pub Namespace);

impl precomputed_hash::PrecomputedHash for Ns {
    fn precomputed_hash(&self) -> u32 {
        self.0.precomputed_hash()
    }
}

impl cssparser::ToCss for Ns {
    fn to_css<W: fmt::Write>(&self, dest: &mut W) -> fmt::Result {
        dest.write_str(self.0.as_ref())
    }
}

impl From<&str> for Ns {
    fn from(s: &str) -> Self {
        Self(Namespace::from(s))
    }
}

impl From<String> for Ns {
    fn from(s: String) -> Self {
        Self(Namespace::from(s))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PseudoElement {}

impl cssparser::ToCss for PseudoElement {
    fn to_css<W: fmt::Write>(&self, _dest: &mut W) -> fmt::Result {
        match *self {}
    }
}

impl selectors::parser::PseudoElement for PseudoElement {
    type Impl = ArticleSelectors;

    fn accepts_state_pseudo_classes(&self) -> bool {
        false
    }

    fn valid_after_slotted(&self) -> bool {
        false
    }
}

/// Static documents have no user-action state; only `:link` would apply.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PseudoClass {
    Link,
}

impl selectors::parser::NonTSPseudoClass for PseudoClass {
    type Impl = ArticleSelectors;

    fn is_active_or_hover(&self) -> bool {
        false
    }

    fn is_user_action_state(&self) -> bool {
        false
    }
}

impl cssparser::ToCss for PseudoClass {
    fn to_css<W: fmt::Write>(&self, dest: &mut W) -> fmt::Result {
        match self {
            Self::Link => dest.write_str(":link"),
        }
    }
}

impl<'i> selectors::parser::Parser<'i> for ArticleSelectors {
    type Impl = ArticleSelectors;
    type Error = SelectorParseErrorKind<'i>;
}

impl SelectorImpl for ArticleSelectors {
    type ExtraMatchingData<'a> = ();
    type AttrValue = Ident;
    type Identifier = Ident;
    type LocalName = Local;
    type NamespaceUrl = Ns;
    type NamespacePrefix = Ident;
    type BorrowedLocalName = Local;
    type BorrowedNamespaceUrl = Ns;
    type NonTSPseudoClass = PseudoClass;
    type PseudoElement = PseudoElement;
}

/// An element of a [`Dom`] seen through the `selectors::Element` trait.
#[derive(Clone, Copy)]
pub struct ElementRef<'a> {
    pub dom: &'a Dom,
    pub id: NodeId,
}

impl<'a> ElementRef<'a> {
    pub fn new(dom: &'a Dom, id: NodeId) -> Self {
        Self { dom, id }
    }

    fn sibling_element(&self, step: fn(&super::arena::Node) -> NodeId) -> Option<Self> {
        let mut current = step(self.dom.get(self.id)?);
        while current.is_some() {
            if self.dom.is_element(current) {
                return Some(Self::new(self.dom, current));
            }
            current = step(self.dom.get(current)?);
        }
        None
    }

    fn is_anchor_with_href(&self) -> bool {
        self.dom.is_tag(self.id, "a") && self.dom.attr(self.id, "href").is_some()
    }
}

impl fmt::Debug for ElementRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementRef")
            .field("id", &self.id)
            .field("tag", &self.dom.tag(self.id))
            .finish()
    }
}

impl selectors::Element for ElementRef<'_> {
    type Impl = ArticleSelectors;

    fn opaque(&self) -> OpaqueElement {
        OpaqueElement::new(self)
    }

    fn parent_element(&self) -> Option<Self> {
        let parent = self.dom.parent(self.id)?;
        self.dom
            .is_element(parent)
            .then(|| Self::new(self.dom, parent))
    }

    fn parent_node_is_shadow_root(&self) -> bool {
        false
    }

    fn containing_shadow_host(&self) -> Option<Self> {
        None
    }

    fn is_pseudo_element(&self) -> bool {
        false
    }

    fn prev_sibling_element(&self) -> Option<Self> {
        self.sibling_element(|n| n.prev_sibling)
    }

    fn next_sibling_element(&self) -> Option<Self> {
        self.sibling_element(|n| n.next_sibling)
    }

    fn first_element_child(&self) -> Option<Self> {
        self.dom
            .children(self.id)
            .find(|&c| self.dom.is_element(c))
            .map(|c| Self::new(self.dom, c))
    }

    fn is_html_element_in_html_document(&self) -> bool {
        true
    }

    fn has_local_name(&self, name: &Local) -> bool {
        self.dom
            .qual_name(self.id)
            .is_some_and(|n| n.local == name.0)
    }

    fn has_namespace(&self, ns: &Ns) -> bool {
        self.dom.qual_name(self.id).is_some_and(|n| n.ns == ns.0)
    }

    fn is_same_type(&self, other: &Self) -> bool {
        self.dom.tag(self.id) == other.dom.tag(other.id)
    }

    fn attr_matches(
        &self,
        ns: &NamespaceConstraint<&Ns>,
        local_name: &Local,
        operation: &AttrSelectorOperation<&Ident>,
    ) -> bool {
        self.dom
            .attrs(self.id)
            .iter()
            .filter(|attr| match ns {
                NamespaceConstraint::Any => true,
                NamespaceConstraint::Specific(ns) => attr.name.ns == ns.0,
            })
            .find(|attr| attr.name.local == local_name.0)
            .is_some_and(|attr| operation.eval_str(&attr.value))
    }

    fn match_non_ts_pseudo_class(
        &self,
        pc: &PseudoClass,
        _context: &mut MatchingContext<'_, Self::Impl>,
    ) -> bool {
        match pc {
            PseudoClass::Link => self.is_anchor_with_href(),
        }
    }

    fn match_pseudo_element(
        &self,
        _pe: &PseudoElement,
        _context: &mut MatchingContext<'_, Self::Impl>,
    ) -> bool {
        false
    }

    fn is_link(&self) -> bool {
        self.is_anchor_with_href()
    }

    fn is_html_slot_element(&self) -> bool {
        false
    }

    fn has_id(&self, id: &Ident, case_sensitivity: CaseSensitivity) -> bool {
        self.dom
            .element_id(self.id)
            .is_some_and(|own| case_sensitivity.eq(own.as_bytes(), id.0.as_bytes()))
    }

    fn has_class(&self, name: &Ident, case_sensitivity: CaseSensitivity) -> bool {
        self.dom
            .classes(self.id)
            .iter()
            .any(|c| case_sensitivity.eq(c.as_bytes(), name.0.as_bytes()))
    }

    fn imported_part(&self, _name: &Ident) -> Option<Ident> {
        None
    }

    fn is_part(&self, _name: &Ident) -> bool {
        false
    }

    fn is_empty(&self) -> bool {
        self.dom.children(self.id).all(|child| {
            match self.dom.get(child).map(|n| &n.data) {
                Some(NodeData::Element { .. }) => false,
                Some(NodeData::Text(t)) => t.trim().is_empty(),
                _ => true,
            }
        })
    }

    fn is_root(&self) -> bool {
        self.dom
            .parent(self.id)
            .and_then(|p| self.dom.get(p))
            .is_some_and(|p| matches!(p.data, NodeData::Document))
    }

    fn apply_selector_flags(&self, _flags: ElementSelectorFlags) {}

    fn add_element_unique_hashes(&self, _filter: &mut selectors::bloom::BloomFilter) -> bool {
        false
    }

    fn has_custom_state(&self, _name: &Ident) -> bool {
        false
    }
}

/// A parsed, comma-separated selector list.
#[derive(Clone)]
pub struct Selector {
    source: String,
    list: Vec<selectors::parser::Selector<ArticleSelectors>>,
}

impl Selector {
    /// Parse a CSS selector list such as `div.article-content, main article`.
    pub fn parse(css: &str) -> Result<Self> {
        let mut input = cssparser::ParserInput::new(css);
        let mut parser = cssparser::Parser::new(&mut input);
        let list = selectors::parser::SelectorList::parse(
            &ArticleSelectors,
            &mut parser,
            selectors::parser::ParseRelative::No,
        )
        .map_err(|_| Error::InvalidSelector(css.to_string()))?;

        Ok(Self {
            source: css.to_string(),
            list: list.slice().to_vec(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether the element `id` matches any selector in the list.
    pub fn matches(&self, dom: &Dom, id: NodeId) -> bool {
        if !dom.is_element(id) {
            return false;
        }
        let element = ElementRef::new(dom, id);
        let mut caches = SelectorCaches::default();
        let mut context = MatchingContext::new(
            selectors::matching::MatchingMode::Normal,
            None,
            &mut caches,
            selectors::context::QuirksMode::NoQuirks,
            selectors::matching::NeedsSelectorFlags::No,
            selectors::matching::MatchingForInvalidation::No,
        );
        self.list.iter().any(|selector| {
            selectors::matching::matches_selector(selector, 0, None, &element, &mut context)
        })
    }

    /// Outermost matching elements in document order.
    ///
    /// A match nested inside an earlier match is not reported again.
    pub fn select(&self, dom: &Dom) -> Vec<NodeId> {
        let mut found = Vec::new();
        dom.walk(dom.root(), super::Limits::default(), |id, _| {
            if self.matches(dom, id) {
                found.push(id);
                super::Visit::Skip
            } else {
                super::Visit::Descend
            }
        });
        found
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Selector").field(&self.source).finish()
    }
}

impl PartialEq for Selector {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

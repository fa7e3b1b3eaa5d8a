//! Per-site extraction rules.
//!
//! Some sites wrap their articles in containers the generic heuristic
//! misjudges, or serve pages that cannot be extracted at all. A
//! [`DomainRule`] captures the site-specific knowledge as data; a
//! [`DomainRules`] map is built explicitly and handed to the chain.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use super::{ExtractionCandidate, Strategy, StrategyError, StrategyKind, metadata};
use crate::article::{ArticleDocument, ContentBlock};
use crate::error::{Error, Result};
use crate::html::{Document, Limits, Selector, text};
use crate::source::{RawDocument, Source, SourceKind, normalize_host};

/// Default confidence of a rule whose selectors matched.
pub const DEFAULT_RULE_CONFIDENCE: f32 = 0.9;

/// A site-specific override.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainRule {
    /// Host the rule applies to, subdomains included. Stored without `www.`.
    pub host: String,
    /// Containers holding the article body, tried in order.
    pub content_selectors: Vec<Selector>,
    /// Elements removed from the body before it is handed on.
    pub remove_selectors: Vec<Selector>,
    pub title_selector: Option<Selector>,
    /// Text markers from which the rest of the article is dropped.
    pub truncate_at: Vec<String>,
    /// Boilerplate snippets removed from block text.
    pub strip_text: Vec<String>,
    /// Refuse web sources for this host, with a message for the user.
    pub reject: Option<String>,
    pub confidence: f32,
}

impl DomainRule {
    pub fn new(host: &str) -> Self {
        Self {
            host: normalize_host(host),
            content_selectors: Vec::new(),
            remove_selectors: Vec::new(),
            title_selector: None,
            truncate_at: Vec::new(),
            strip_text: Vec::new(),
            reject: None,
            confidence: DEFAULT_RULE_CONFIDENCE,
        }
    }

    pub fn with_content_selector(mut self, css: &str) -> Result<Self> {
        self.content_selectors.push(Selector::parse(css)?);
        Ok(self)
    }

    pub fn with_remove_selector(mut self, css: &str) -> Result<Self> {
        self.remove_selectors.push(Selector::parse(css)?);
        Ok(self)
    }

    pub fn with_title_selector(mut self, css: &str) -> Result<Self> {
        self.title_selector = Some(Selector::parse(css)?);
        Ok(self)
    }

    pub fn with_truncate_at(mut self, marker: impl Into<String>) -> Self {
        self.truncate_at.push(marker.into());
        self
    }

    pub fn with_strip_text(mut self, snippet: impl Into<String>) -> Self {
        self.strip_text.push(snippet.into());
        self
    }

    pub fn rejecting(mut self, reason: impl Into<String>) -> Self {
        self.reject = Some(reason.into());
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// Exact host or any subdomain of it; `www.` is ignored.
    pub fn matches_host(&self, host: &str) -> bool {
        let host = normalize_host(host);
        host == self.host
            || host
                .strip_suffix(self.host.as_str())
                .is_some_and(|prefix| prefix.ends_with('.'))
    }

    /// Refuse the source before extraction when the rule says so.
    ///
    /// Saved pages are always accepted: the browser already ran whatever
    /// the live page needed.
    pub fn pre_validate(&self, source: &Source) -> Result<()> {
        match (&self.reject, source.kind()) {
            (Some(reason), SourceKind::Web) => Err(Error::Unsupported {
                host: self.host.clone(),
                reason: reason.clone(),
            }),
            _ => Ok(()),
        }
    }

    /// Apply truncation markers and snippet removal to sanitized blocks.
    pub fn post_process(&self, article: &mut ArticleDocument) {
        if let Some(cut) = self.truncation_point(&article.blocks) {
            let (index, keep) = cut;
            article.blocks.truncate(index);
            if let Some(block) = keep {
                article.blocks.push(block);
            }
        }

        if !self.strip_text.is_empty() {
            let strip = &self.strip_text;
            article.blocks.retain_mut(|block| {
                if block.is_image() {
                    return true;
                }
                if strip.iter().any(|s| is_fragment_of(block, s)) {
                    return false;
                }
                for snippet in strip {
                    remove_snippet(block, snippet);
                }
                !block.is_empty()
            });
        }
    }

    /// First block containing a truncation marker, plus what survives of
    /// that block's text before the marker.
    fn truncation_point(&self, blocks: &[ContentBlock]) -> Option<(usize, Option<ContentBlock>)> {
        if self.truncate_at.is_empty() {
            return None;
        }
        blocks.iter().enumerate().find_map(|(i, block)| {
            let text = block_text(block)?;
            let pos = self
                .truncate_at
                .iter()
                .filter_map(|marker| text.find(marker.as_str()))
                .min()?;
            let head = text[..pos].trim();
            let kept = (!head.is_empty()).then(|| with_text(block, head));
            Some((i, kept))
        })
    }
}

fn block_text(block: &ContentBlock) -> Option<&str> {
    match block {
        ContentBlock::Heading { text, .. }
        | ContentBlock::Paragraph { text }
        | ContentBlock::Quote { text } => Some(text),
        _ => None,
    }
}

fn with_text(block: &ContentBlock, new_text: &str) -> ContentBlock {
    let mut block = block.clone();
    match &mut block {
        ContentBlock::Heading { text, .. }
        | ContentBlock::Paragraph { text }
        | ContentBlock::Quote { text } => *text = new_text.to_string(),
        _ => {}
    }
    block
}

/// Paragraph-sized pieces of a split-up snippet.
const MIN_FRAGMENT_CHARS: usize = 40;

fn is_fragment_of(block: &ContentBlock, snippet: &str) -> bool {
    block_text(block).is_some_and(|t| t.chars().count() >= MIN_FRAGMENT_CHARS && snippet.contains(t))
}

fn remove_snippet(block: &mut ContentBlock, snippet: &str) {
    let strip = |s: &mut String| {
        if s.contains(snippet) {
            *s = text::collapse_whitespace(&s.replace(snippet, " "));
        }
    };
    match block {
        ContentBlock::Heading { text, .. }
        | ContentBlock::Paragraph { text }
        | ContentBlock::Quote { text } => strip(text),
        ContentBlock::List { items, .. } => {
            items.iter_mut().for_each(strip);
            items.retain(|i| !i.is_empty());
        }
        ContentBlock::Image { .. } => {}
    }
}

/// Explicitly constructed host → rule map.
#[derive(Debug, Clone, Default)]
pub struct DomainRules {
    rules: BTreeMap<String, DomainRule>,
}

impl DomainRules {
    /// An empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rules for sites known to need special handling.
    pub fn builtin() -> Result<Self> {
        let mut rules = Self::new();
        rules.insert(DomainRule::new("substack.com").rejecting(
            "Substack articles require JavaScript to render their content and cannot be \
             extracted automatically. Save the article as HTML from your browser and \
             convert the saved file instead.",
        ));
        rules.insert(
            DomainRule::new("cenital.com")
                .with_content_selector("div.article-content")?
                .with_remove_selector("script, style, nav, footer, header, aside, form")?
                .with_truncate_at("Otras lecturas")
                .with_strip_text(
                    "¿Por qué pagar por algo que puedo leer gratis? En Cenital entendemos al \
                     periodismo como un servicio público. Por eso nuestras notas siempre \
                     estarán accesibles para todos. Pero investigar es caro y la parte más \
                     ardua del trabajo periodístico no se ve. Por eso le pedimos a quienes \
                     puedan que se sumen a nuestro círculo de Mejores amigos y nos permitan \
                     seguir creciendo. Si te gusta lo que hacemos, sumate vos también. Sumate",
                ),
        );
        Ok(rules)
    }

    /// Add or replace the rule for its host.
    pub fn insert(&mut self, rule: DomainRule) -> Option<DomainRule> {
        self.rules.insert(rule.host.clone(), rule)
    }

    pub fn with_rule(mut self, rule: DomainRule) -> Self {
        self.insert(rule);
        self
    }

    /// Rule for `host`: exact match first, then the closest parent domain.
    pub fn lookup(&self, host: &str) -> Option<&DomainRule> {
        let host = normalize_host(host);
        let mut candidate = host.as_str();
        loop {
            if let Some(rule) = self.rules.get(candidate) {
                return Some(rule);
            }
            candidate = candidate.split_once('.')?.1;
        }
    }

    /// Rule for the host of a source, if it has one.
    pub fn for_source(&self, source: &Source) -> Option<&DomainRule> {
        self.lookup(&source.host()?)
    }

    /// Run the matching rule's pre-validation.
    pub fn pre_validate(&self, source: &Source) -> Result<()> {
        match self.for_source(source) {
            Some(rule) => rule.pre_validate(source),
            None => Ok(()),
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DomainRule> {
        self.rules.values()
    }
}

/// Strategy applying the rule registered for the source's host.
pub struct DomainStrategy {
    rules: Arc<DomainRules>,
    limits: Limits,
}

impl DomainStrategy {
    pub fn new(rules: Arc<DomainRules>, limits: Limits) -> Self {
        Self { rules, limits }
    }
}

impl Strategy for DomainStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::DomainSpecific
    }

    fn extract(
        &self,
        source: &Source,
        doc: &Document,
        _raw: &RawDocument,
    ) -> std::result::Result<Option<ExtractionCandidate>, StrategyError> {
        let Some(rule) = self.rules.for_source(source) else {
            return Ok(None);
        };
        if rule.content_selectors.is_empty() {
            return Ok(None);
        }

        let dom = doc.dom();
        let (selector, roots) = rule
            .content_selectors
            .iter()
            .map(|sel| (sel, sel.select(dom)))
            .find(|(_, roots)| !roots.is_empty())
            .ok_or_else(|| {
                let tried: Vec<&str> = rule.content_selectors.iter().map(Selector::as_str).collect();
                StrategyError::NoMatch(tried.join(", "))
            })?;
        debug!(host = %rule.host, selector = selector.as_str(), matches = roots.len(), "domain rule matched");

        let remove = &rule.remove_selectors;
        let (body, stats) = dom.clone_subtrees(&roots, self.limits, |d, id| {
            remove.iter().any(|sel| sel.matches(d, id))
        });
        let confidence = if stats.truncated {
            rule.confidence * 0.5
        } else {
            rule.confidence
        };

        let title = rule
            .title_selector
            .as_ref()
            .and_then(|sel| sel.select(dom).into_iter().next())
            .map(|id| text::clean_text_of(dom, id, self.limits))
            .filter(|t| !t.is_empty())
            .or_else(|| metadata::title(doc));

        let mut candidate = ExtractionCandidate::new(body, confidence, StrategyKind::DomainSpecific);
        candidate.title = title;
        candidate.author = metadata::author(doc);
        candidate.published = metadata::published(doc);
        Ok(Some(candidate))
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
    fn test_host_matching() {
        let rule = DomainRule::new("www.cenital.com");
        assert_eq!(rule.host, "cenital.com");
        assert!(rule.matches_host("cenital.com"));
        assert!(rule.matches_host("WWW.cenital.com"));
        assert!(rule.matches_host("news.cenital.com"));
        assert!(!rule.matches_host("notcenital.com"));
        assert!(!rule.matches_host("cenital.com.ar"));
    }

    #[test]
    fn test_lookup_walks_parent_domains() {
        let rules = DomainRules::builtin().unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules.lookup("someone.substack.com").unwrap().host, "substack.com");
        assert_eq!(rules.lookup("www.cenital.com").unwrap().host, "cenital.com");
        assert!(rules.lookup("example.com").is_none());
        assert!(rules.lookup("com").is_none());
    }

    #[test]
    fn test_substack_rejects_only_web_sources() {
        let rules = DomainRules::builtin().unwrap();
        let web = Source::web("https://someone.substack.com/p/post").unwrap();
        assert!(matches!(rules.pre_validate(&web), Err(Error::Unsupported { .. })));

        let saved = Source::file("post.html").with_origin(web.url().unwrap().clone());
        assert!(rules.pre_validate(&saved).is_ok());
    }

    #[test]
    fn test_truncate_at_marker() {
        let rule = DomainRule::new("example.com").with_truncate_at("Otras lecturas");
        let mut article = ArticleDocument {
            blocks: vec![
                paragraph("First paragraph."),
                paragraph("Closing words. Otras lecturas: more links"),
                paragraph("Unrelated teaser."),
            ],
            ..Default::default()
        };
        rule.post_process(&mut article);
        assert_eq!(
            article.blocks,
            vec![paragraph("First paragraph."), paragraph("Closing words.")]
        );
    }

    #[test]
    fn test_strip_text_drops_emptied_blocks() {
        let rule = DomainRule::new("example.com").with_strip_text("Subscribe today!");
        let mut article = ArticleDocument {
            blocks: vec![
                paragraph("Body. Subscribe today! More body."),
                paragraph("Subscribe today!"),
            ],
            ..Default::default()
        };
        rule.post_process(&mut article);
        assert_eq!(article.blocks, vec![paragraph("Body. More body.")]);
    }

    #[test]
    fn test_strip_text_removes_split_fragments() {
        let snippet = "Support our journalism. Investigation is expensive and slow. Join our members today.";
        let rule = DomainRule::new("example.com").with_strip_text(snippet);
        let mut article = ArticleDocument {
            blocks: vec![
                paragraph("The story itself."),
                paragraph("Support our journalism. Investigation is expensive and slow."),
                paragraph("Join our members today."),
            ],
            ..Default::default()
        };
        rule.post_process(&mut article);
        assert_eq!(article.blocks[0], paragraph("The story itself."));
        assert_eq!(article.blocks.len(), 2);
    }

    #[test]
    fn test_domain_strategy_uses_selectors() {
        let rules = Arc::new(DomainRules::builtin().unwrap());
        let strategy = DomainStrategy::new(rules, Limits::default());
        let raw = RawDocument::parse(
            "<title>Nota</title><body><div class='sidebar'>Menu</div>\
             <div class='article-content'><p>El texto de la nota.</p><aside>Publicidad</aside></div></body>",
            "https://cenital.com/nota",
        )
        .unwrap();
        let doc = Document::parse(&raw.html);
        let source = Source::web("https://www.cenital.com/nota").unwrap();

        let candidate = strategy.extract(&source, &doc, &raw).unwrap().unwrap();
        assert_eq!(candidate.strategy, StrategyKind::DomainSpecific);
        assert_eq!(candidate.confidence, DEFAULT_RULE_CONFIDENCE);
        assert_eq!(candidate.title.as_deref(), Some("Nota"));
        let text = text::clean_text_of(&candidate.body, candidate.body.root(), Limits::default());
        assert_eq!(text, "El texto de la nota.");
    }

    #[test]
    fn test_domain_strategy_reports_no_match() {
        let rules = Arc::new(DomainRules::builtin().unwrap());
        let strategy = DomainStrategy::new(rules, Limits::default());
        let raw = RawDocument::parse("<p>Other layout</p>", "https://cenital.com/x").unwrap();
        let doc = Document::parse(&raw.html);
        let source = Source::web("https://cenital.com/x").unwrap();
        assert!(matches!(
            strategy.extract(&source, &doc, &raw),
            Err(StrategyError::NoMatch(_))
        ));
    }
}

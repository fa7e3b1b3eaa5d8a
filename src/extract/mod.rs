//! Article extraction: scoring, strategies and the chain that picks a winner.
//!
//! A [`StrategyChain`] runs its strategies in priority order over one parsed
//! page. Each strategy may propose an [`ExtractionCandidate`] with a body tree
//! it owns; the chain keeps the most confident one.

mod chain;
mod domain;
mod generic;
pub mod metadata;
mod scorer;

pub use chain::StrategyChain;
pub use domain::{DomainRule, DomainRules, DomainStrategy};
pub use generic::GenericStrategy;
pub use scorer::{BlockScorer, BlockStats, ScoredNode};

pub(crate) use scorer::{is_boilerplate, subtree_stats};

use std::sync::Arc;

use chrono::{DateTime, Utc};
use url::Url;

use crate::html::{Document, Dom, Limits, text};
use crate::source::{RawDocument, Source};

/// Which kind of strategy produced a candidate. Declaration order is priority
/// order: earlier kinds win confidence ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
#[cfg_attr(feature = "cli", serde(rename_all = "snake_case"))]
pub enum StrategyKind {
    DomainSpecific,
    Generic,
    External,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::DomainSpecific => "domain",
            StrategyKind::Generic => "generic",
            StrategyKind::External => "external",
        }
    }
}

/// One strategy's proposal for the article.
#[derive(Debug, Clone)]
pub struct ExtractionCandidate {
    pub title: Option<String>,
    pub author: Option<String>,
    pub published: Option<DateTime<Utc>>,
    /// Owned copy of the article body.
    pub body: Dom,
    /// Strategy-defined confidence in `[0, 1]`.
    pub confidence: f32,
    pub strategy: StrategyKind,
}

impl ExtractionCandidate {
    pub fn new(body: Dom, confidence: f32, strategy: StrategyKind) -> Self {
        Self {
            title: None,
            author: None,
            published: None,
            body,
            confidence: clamp_confidence(confidence),
            strategy,
        }
    }

    /// Build a candidate from an HTML fragment. Handy for external extractors
    /// that return markup rather than a tree.
    pub fn from_html(html: &str, confidence: f32, strategy: StrategyKind) -> Self {
        Self::new(Document::parse(html).into_dom(), confidence, strategy)
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_published(mut self, published: DateTime<Utc>) -> Self {
        self.published = Some(published);
        self
    }

    /// Characters of collapsed visible text in the body.
    pub fn content_chars(&self, limits: Limits) -> usize {
        text::clean_text_of(&self.body, self.body.root(), limits)
            .chars()
            .count()
    }
}

fn clamp_confidence(confidence: f32) -> f32 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

/// Why a strategy gave up. Never escapes the chain.
#[derive(Debug, thiserror::Error)]
pub enum StrategyError {
    #[error("no element matched `{0}`")]
    NoMatch(String),

    #[error("{0}")]
    Failed(String),
}

/// One way of finding the article in a page.
pub trait Strategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Propose a candidate, or `Ok(None)` when the strategy does not apply.
    fn extract(
        &self,
        source: &Source,
        doc: &Document,
        raw: &RawDocument,
    ) -> Result<Option<ExtractionCandidate>, StrategyError>;
}

/// Optional third-party extraction capability, consulted last.
pub trait ExternalExtractor: Send + Sync {
    fn extract(&self, html: &str, base_url: &Url) -> Option<ExtractionCandidate>;
}

/// Adapts an [`ExternalExtractor`] to the [`Strategy`] interface.
pub struct ExternalStrategy {
    extractor: Arc<dyn ExternalExtractor>,
}

impl ExternalStrategy {
    pub fn new(extractor: Arc<dyn ExternalExtractor>) -> Self {
        Self { extractor }
    }
}

impl Strategy for ExternalStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::External
    }

    fn extract(
        &self,
        _source: &Source,
        _doc: &Document,
        raw: &RawDocument,
    ) -> Result<Option<ExtractionCandidate>, StrategyError> {
        Ok(self
            .extractor
            .extract(&raw.html, &raw.base_url)
            .map(|mut candidate| {
                candidate.strategy = StrategyKind::External;
                candidate.confidence = clamp_confidence(candidate.confidence);
                candidate
            }))
    }
}

//! The end-to-end conversion: raw page to article to e-book.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::article::ArticleDocument;
use crate::config::PipelineConfig;
use crate::ebook::{Assembler, EbookDocument};
use crate::error::{Error, Result};
use crate::extract::{DomainRules, ExternalExtractor, StrategyChain, StrategyKind};
use crate::fetch::{Fetcher, ImageSource, NoImages};
use crate::sanitize::Sanitizer;
use crate::source::{RawDocument, Source};

/// A sanitized article plus how it was found.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct ExtractedArticle {
    pub article: ArticleDocument,
    pub strategy: StrategyKind,
    pub confidence: f32,
}

/// Runs pre-validation, extraction, sanitization and assembly.
///
/// Holds no mutable state, so one pipeline can serve many threads.
///
/// # Example
///
/// ```
/// use kindling::{Pipeline, PipelineConfig, RawDocument, Source};
///
/// let pipeline = Pipeline::new(PipelineConfig::default());
/// let source = Source::web("https://example.com/post")?;
/// let raw = RawDocument::parse(
///     "<html><head><title>T</title></head><body><article>\
///      <p>Hello world, this is a sufficiently long paragraph of text.</p>\
///      </article></body></html>",
///     "https://example.com/post",
/// )?;
/// let ebook = pipeline.extract(&source, &raw)?;
/// assert_eq!(ebook.metadata.title, "T");
/// # Ok::<(), kindling::Error>(())
/// ```
#[derive(Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    rules: Arc<DomainRules>,
    external: Option<Arc<dyn ExternalExtractor>>,
    images: Arc<dyn ImageSource>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("rules", &self.rules.len())
            .field("external", &self.external.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl Pipeline {
    /// A pipeline with the built-in domain rules and no external extractor.
    pub fn new(config: PipelineConfig) -> Self {
        let rules = DomainRules::builtin().unwrap_or_else(|e| {
            warn!(error = %e, "built-in domain rules unavailable");
            DomainRules::new()
        });
        Self {
            config,
            rules: Arc::new(rules),
            external: None,
            images: Arc::new(NoImages),
        }
    }

    /// Replace the domain rules.
    pub fn with_rules(mut self, rules: DomainRules) -> Self {
        self.rules = Arc::new(rules);
        self
    }

    /// Consult `extractor` when the built-in strategies fall short.
    pub fn with_external(mut self, extractor: Arc<dyn ExternalExtractor>) -> Self {
        self.external = Some(extractor);
        self
    }

    pub fn with_images(mut self, images: Arc<dyn ImageSource>) -> Self {
        self.images = images;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn rules(&self) -> &DomainRules {
        &self.rules
    }

    fn chain(&self) -> StrategyChain {
        StrategyChain::new(&self.config, Arc::clone(&self.rules), self.external.clone())
    }

    /// Find and clean the article in `raw`.
    ///
    /// Nothing is retried: [`Error::ExtractionFailed`] and
    /// [`Error::EmptyContent`] go straight back to the caller.
    pub fn process(&self, source: &Source, raw: &RawDocument) -> Result<ExtractedArticle> {
        self.rules.pre_validate(source)?;

        let candidate = self.chain().extract(source, raw)?;
        let strategy = candidate.strategy;
        let confidence = candidate.confidence;

        let mut article = Sanitizer::new(&self.config).sanitize(candidate, &raw.base_url)?;
        if let Some(url) = source.url() {
            article.source_url = Some(url.clone());
        }
        if let Some(rule) = self.rules.for_source(source) {
            debug!(host = %rule.host, "applying domain post-processing");
            rule.post_process(&mut article);
        }
        if !article.has_content() {
            return Err(Error::EmptyContent);
        }

        info!(
            source = %source,
            strategy = strategy.as_str(),
            confidence,
            blocks = article.blocks.len(),
            words = article.word_count(),
            "extracted article"
        );
        Ok(ExtractedArticle {
            article,
            strategy,
            confidence,
        })
    }

    /// Assemble an already extracted article.
    pub fn assemble(&self, article: ArticleDocument) -> Result<EbookDocument> {
        Assembler::new(&self.config)
            .with_images(Arc::clone(&self.images))
            .assemble(article)
    }

    /// Extract `raw` and assemble the result into an e-book.
    pub fn extract(&self, source: &Source, raw: &RawDocument) -> Result<EbookDocument> {
        let extracted = self.process(source, raw)?;
        self.assemble(extracted.article)
    }

    /// Fetch `source` with `fetcher`, then [`extract`](Self::extract) it.
    pub fn convert(&self, source: &Source, fetcher: &dyn Fetcher) -> Result<EbookDocument> {
        self.rules.pre_validate(source)?;
        let raw = fetcher.fetch(source)?;
        self.extract(source, &raw)
    }
}

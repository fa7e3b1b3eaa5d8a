//! Ordered strategies with confidence-based selection.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::domain::{DomainRules, DomainStrategy};
use super::generic::GenericStrategy;
use super::{ExternalExtractor, ExternalStrategy, ExtractionCandidate, Strategy};
use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::html::{Document, Limits};
use crate::source::{RawDocument, Source};

/// Runs strategies in priority order and keeps the most confident candidate.
///
/// The chain stops as soon as the best candidate so far reaches the
/// acceptance threshold, so the external fallback only runs when the
/// built-in strategies came up short.
pub struct StrategyChain {
    strategies: Vec<Box<dyn Strategy>>,
    threshold: f32,
    min_content_chars: usize,
    limits: Limits,
}

impl StrategyChain {
    /// Domain rules, then the generic heuristic, then the external
    /// extractor if one is configured.
    pub fn new(
        config: &PipelineConfig,
        rules: Arc<DomainRules>,
        external: Option<Arc<dyn ExternalExtractor>>,
    ) -> Self {
        let limits = config.limits();
        let mut strategies: Vec<Box<dyn Strategy>> = vec![
            Box::new(DomainStrategy::new(rules, limits)),
            Box::new(GenericStrategy::new(limits, config.min_content_chars)),
        ];
        if let Some(external) = external {
            strategies.push(Box::new(ExternalStrategy::new(external)));
        }
        Self::from_strategies(strategies, config)
    }

    /// A chain over an arbitrary strategy list, in the given order.
    pub fn from_strategies(strategies: Vec<Box<dyn Strategy>>, config: &PipelineConfig) -> Self {
        Self {
            strategies,
            threshold: config.acceptance_threshold,
            min_content_chars: config.min_content_chars,
            limits: config.limits(),
        }
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Extract the article from `raw`.
    ///
    /// Fails with [`Error::ExtractionFailed`] only when no strategy produced
    /// a candidate with enough text. A strategy that errors or panics counts
    /// as having produced nothing.
    pub fn extract(&self, source: &Source, raw: &RawDocument) -> Result<ExtractionCandidate> {
        let doc = Document::parse(&raw.html);
        let mut best: Option<ExtractionCandidate> = None;

        for strategy in &self.strategies {
            if best
                .as_ref()
                .is_some_and(|b| b.confidence >= self.threshold)
            {
                break;
            }

            let kind = strategy.kind().as_str();
            let outcome = catch_unwind(AssertUnwindSafe(|| strategy.extract(source, &doc, raw)));
            let candidate = match outcome {
                Ok(Ok(Some(candidate))) => candidate,
                Ok(Ok(None)) => {
                    debug!(strategy = kind, "no candidate");
                    continue;
                }
                Ok(Err(err)) => {
                    debug!(strategy = kind, error = %err, "strategy failed, no candidate");
                    continue;
                }
                Err(_) => {
                    warn!(strategy = kind, "strategy panicked, no candidate");
                    continue;
                }
            };

            let chars = candidate.content_chars(self.limits);
            if chars < self.min_content_chars {
                debug!(strategy = kind, chars, "candidate too short, discarded");
                continue;
            }
            debug!(strategy = kind, confidence = candidate.confidence, chars, "candidate");

            // Strategies run in priority order: only a strictly higher
            // confidence displaces an earlier candidate.
            if best
                .as_ref()
                .is_none_or(|b| candidate.confidence > b.confidence)
            {
                best = Some(candidate);
            }
        }

        let best = best.ok_or(Error::ExtractionFailed)?;
        info!(
            strategy = best.strategy.as_str(),
            confidence = best.confidence,
            "selected extraction"
        );
        Ok(best)
    }
}

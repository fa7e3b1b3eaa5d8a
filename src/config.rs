//! Pipeline configuration.

use crate::html::Limits;

/// Default confidence a candidate needs before later strategies are skipped.
pub const DEFAULT_ACCEPTANCE_THRESHOLD: f32 = 0.35;

/// Tuning knobs for extraction, sanitization and assembly.
///
/// # Example
///
/// ```
/// use kindling::PipelineConfig;
///
/// let config = PipelineConfig::default()
///     .with_acceptance_threshold(0.5)
///     .with_language("es")
///     .with_split_chapters(true);
/// assert_eq!(config.language, "es");
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "cli", serde(default))]
pub struct PipelineConfig {
    /// Minimum confidence for a domain rule (or the generic heuristic) to
    /// win without consulting later strategies.
    pub acceptance_threshold: f32,
    /// Deepest element level any traversal descends to.
    pub max_depth: usize,
    /// Most nodes any single traversal visits.
    pub max_nodes: usize,
    /// Visible characters a candidate body needs to count as an article.
    pub min_content_chars: usize,
    /// Text blocks shorter than this are dropped by the sanitizer.
    pub min_block_chars: usize,
    /// Language tag written into the package metadata.
    pub language: String,
    /// Split into one chapter per top-level heading.
    pub split_chapters: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            acceptance_threshold: DEFAULT_ACCEPTANCE_THRESHOLD,
            max_depth: 64,
            max_nodes: 50_000,
            min_content_chars: 25,
            min_block_chars: 4,
            language: "en".to_string(),
            split_chapters: false,
        }
    }
}

impl PipelineConfig {
    pub fn with_acceptance_threshold(mut self, threshold: f32) -> Self {
        self.acceptance_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn with_limits(mut self, max_depth: usize, max_nodes: usize) -> Self {
        self.max_depth = max_depth;
        self.max_nodes = max_nodes;
        self
    }

    pub fn with_min_block_chars(mut self, chars: usize) -> Self {
        self.min_block_chars = chars;
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_split_chapters(mut self, split: bool) -> Self {
        self.split_chapters = split;
        self
    }

    /// Traversal budget derived from the depth and node limits.
    pub fn limits(&self) -> Limits {
        Limits {
            max_depth: self.max_depth,
            max_nodes: self.max_nodes,
        }
    }
}

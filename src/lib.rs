//! # kindling
//!
//! Turns web articles and saved HTML pages into clean EPUB e-books for
//! e-readers.
//!
//! ## Pipeline
//!
//! - A [`Fetcher`] supplies the raw page for a [`Source`]
//! - The [`StrategyChain`] tries site rules, then a content-density
//!   heuristic, then an optional [`ExternalExtractor`], keeping the most
//!   confident candidate
//! - The [`Sanitizer`] strips chrome and flattens the body into
//!   [`ContentBlock`]s
//! - The [`Assembler`] builds chapters, embeds images and generates the
//!   manifest, spine and table of contents
//! - [`write_epub`] packages the result
//!
//! ## Quick Start
//!
//! ```no_run
//! use kindling::{FileFetcher, Pipeline, PipelineConfig, Source, save_epub};
//! use url::Url;
//!
//! let source = Source::file("saved-article.html")
//!     .with_origin(Url::parse("https://www.cenital.com/some-article")?);
//! let ebook = Pipeline::new(PipelineConfig::default()).convert(&source, &FileFetcher)?;
//! save_epub(&ebook, "article.epub")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod article;
pub mod config;
pub mod delivery;
pub mod ebook;
pub mod epub;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod html;
pub mod pipeline;
pub mod sanitize;
pub mod source;
pub(crate) mod util;

pub use article::{ArticleDocument, ContentBlock};
pub use config::PipelineConfig;
pub use delivery::{Delivery, DeliveryPayload, DirectoryDelivery};
pub use ebook::{Assembler, EbookDocument};
pub use epub::{PackageSummary, inspect_epub, save_epub, to_epub_bytes, write_epub};
pub use error::{Error, Result};
pub use extract::{
    DomainRule, DomainRules, ExternalExtractor, ExtractionCandidate, Strategy, StrategyChain,
    StrategyKind,
};
pub use fetch::{FileFetcher, FileImages, Fetcher, ImageSource, NoImages};
pub use pipeline::{ExtractedArticle, Pipeline};
pub use sanitize::Sanitizer;
pub use source::{RawDocument, Source, SourceKind};

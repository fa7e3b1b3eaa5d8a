//! Error types for kindling operations.

use thiserror::Error;

/// Errors that can occur while turning an article into an ebook.
#[derive(Error, Debug)]
pub enum Error {
    /// The fetch/read collaborator could not supply the document.
    #[error("source unavailable: {source_ref}: {reason}")]
    SourceUnavailable { source_ref: String, reason: String },

    /// A domain rule refused the source before extraction.
    #[error("{host} is not supported: {reason}")]
    Unsupported { host: String, reason: String },

    /// Every extraction strategy ran out without a usable candidate.
    #[error("could not extract an article from the page")]
    ExtractionFailed,

    /// A candidate was found, but nothing survived sanitization.
    #[error("the extracted article has no usable content")]
    EmptyContent,

    /// Manifest, spine and table of contents disagree. Always a bug.
    #[error("ebook invariant violated: {0}")]
    AssemblyInvariantViolation(String),

    #[error("invalid selector: {0}")]
    InvalidSelector(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Invalid EPUB: {0}")]
    InvalidEpub(String),
}

impl Error {
    /// Whether the caller may offer the saved-HTML fallback to the user.
    ///
    /// Extraction results are deterministic for a given input, so these are
    /// never retried automatically.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::ExtractionFailed | Error::EmptyContent | Error::Unsupported { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_kinds() {
        assert!(Error::ExtractionFailed.is_recoverable());
        assert!(Error::EmptyContent.is_recoverable());
        assert!(!Error::AssemblyInvariantViolation("spine".into()).is_recoverable());
        assert!(
            !Error::SourceUnavailable {
                source_ref: "a.html".into(),
                reason: "missing".into()
            }
            .is_recoverable()
        );
    }
}

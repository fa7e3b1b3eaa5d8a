//! Where an article comes from.

use std::fmt;
use std::path::{Path, PathBuf};

use url::Url;

use crate::error::{Error, Result};

/// Origin kind of a [`Source`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
#[cfg_attr(feature = "cli", serde(rename_all = "snake_case"))]
pub enum SourceKind {
    Web,
    File,
}

/// A web address or a local file, possibly saved from a web address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Web(Url),
    File {
        path: PathBuf,
        /// Address the page was saved from, when known.
        origin: Option<Url>,
    },
}

impl Source {
    /// Parse an `http`/`https` URL.
    pub fn web(url: &str) -> Result<Self> {
        let url = Url::parse(url.trim())?;
        match url.scheme() {
            "http" | "https" => Ok(Source::Web(url)),
            other => Err(Error::SourceUnavailable {
                source_ref: url.to_string(),
                reason: format!("unsupported scheme `{other}`"),
            }),
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Source::File {
            path: path.into(),
            origin: None,
        }
    }

    /// Attach the URL a saved page came from.
    pub fn with_origin(self, origin: Url) -> Self {
        match self {
            Source::File { path, .. } => Source::File {
                path,
                origin: Some(origin),
            },
            web => web,
        }
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            Source::Web(_) => SourceKind::Web,
            Source::File { .. } => SourceKind::File,
        }
    }

    /// The web address associated with the source, if any.
    pub fn url(&self) -> Option<&Url> {
        match self {
            Source::Web(url) => Some(url),
            Source::File { origin, .. } => origin.as_ref(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Source::Web(_) => None,
            Source::File { path, .. } => Some(path),
        }
    }

    /// Lower-cased host with any leading `www.` removed.
    pub fn host(&self) -> Option<String> {
        self.url().and_then(Url::host_str).map(normalize_host)
    }

    /// Human-readable reference used in bylines and delivery messages.
    pub fn reference(&self) -> String {
        match self {
            Source::Web(url) => url.to_string(),
            Source::File {
                origin: Some(url), ..
            } => url.to_string(),
            Source::File { path, .. } => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                format!("Local file: {name}")
            }
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Web(url) => write!(f, "{url}"),
            Source::File { path, .. } => write!(f, "{}", path.display()),
        }
    }
}

/// Lower-case a host and strip a leading `www.`.
pub fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('.').to_ascii_lowercase();
    match host.strip_prefix("www.") {
        Some(rest) => rest.to_string(),
        None => host,
    }
}

/// Unparsed page text plus the URL relative links resolve against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDocument {
    pub html: String,
    pub base_url: Url,
}

impl RawDocument {
    pub fn new(html: impl Into<String>, base_url: Url) -> Self {
        Self {
            html: html.into(),
            base_url,
        }
    }

    /// Convenience constructor parsing `base_url`.
    pub fn parse(html: impl Into<String>, base_url: &str) -> Result<Self> {
        Ok(Self::new(html, Url::parse(base_url)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_web_source_host() {
        let source = Source::web("https://WWW.Cenital.com/some/article").unwrap();
        assert_eq!(source.kind(), SourceKind::Web);
        assert_eq!(source.host().as_deref(), Some("cenital.com"));
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        assert!(matches!(
            Source::web("ftp://example.com/file"),
            Err(Error::SourceUnavailable { .. })
        ));
        assert!(matches!(Source::web("not a url"), Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_file_source_with_origin() {
        let origin = Url::parse("https://news.example.org/a").unwrap();
        let source = Source::file("/tmp/saved.html").with_origin(origin);
        assert_eq!(source.kind(), SourceKind::File);
        assert_eq!(source.host().as_deref(), Some("news.example.org"));
        assert_eq!(source.reference(), "https://news.example.org/a");
    }

    #[test]
    fn test_file_reference() {
        let source = Source::file("/home/me/articles/page.html");
        assert_eq!(source.reference(), "Local file: page.html");
        assert_eq!(source.host(), None);
    }
}

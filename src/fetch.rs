//! Collaborators that read pages and images from outside the pipeline.

use std::fs;
use std::path::Path;

use tracing::debug;
use url::Url;

use crate::error::{Error, Result};
use crate::source::{RawDocument, Source};
use crate::util::{decode_text, extract_meta_charset};

/// Supplies the raw page for a source.
pub trait Fetcher: Send + Sync {
    /// Failures are reported as [`Error::SourceUnavailable`].
    fn fetch(&self, source: &Source) -> Result<RawDocument>;
}

/// Reads saved pages from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileFetcher;

impl FileFetcher {
    pub fn new() -> Self {
        Self
    }
}

impl Fetcher for FileFetcher {
    fn fetch(&self, source: &Source) -> Result<RawDocument> {
        let Source::File { path, origin } = source else {
            return Err(Error::SourceUnavailable {
                source_ref: source.to_string(),
                reason: "only local files can be read".to_string(),
            });
        };

        let bytes = fs::read(path).map_err(|e| Error::SourceUnavailable {
            source_ref: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let charset = extract_meta_charset(&bytes);
        let html = decode_text(&bytes, charset.as_deref()).into_owned();

        let base_url = match origin {
            Some(url) => url.clone(),
            None => file_url(path)?,
        };
        debug!(path = %path.display(), bytes = bytes.len(), base = %base_url, "read saved page");
        Ok(RawDocument::new(html, base_url))
    }
}

fn file_url(path: &Path) -> Result<Url> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    Url::from_file_path(&absolute).map_err(|()| Error::SourceUnavailable {
        source_ref: path.display().to_string(),
        reason: "path cannot be expressed as a file URL".to_string(),
    })
}

/// Supplies image bytes for an absolute URL.
pub trait ImageSource: Send + Sync {
    fn load(&self, url: &str) -> Option<Vec<u8>>;
}

/// Loads nothing: only `data:` URIs end up embedded.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoImages;

impl ImageSource for NoImages {
    fn load(&self, _url: &str) -> Option<Vec<u8>> {
        None
    }
}

/// Loads `file://` images, such as the `_files` folder browsers write next
/// to a saved page.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileImages;

impl ImageSource for FileImages {
    fn load(&self, url: &str) -> Option<Vec<u8>> {
        let url = Url::parse(url).ok()?;
        if url.scheme() != "file" {
            return None;
        }
        let path = url.to_file_path().ok()?;
        match fs::read(&path) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "image not readable");
                None
            }
        }
    }
}

//! Handing finished e-books to whoever sends them on.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::info;

use crate::ebook::EbookDocument;
use crate::epub::to_epub_bytes;
use crate::error::Result;
use crate::util::clean_file_name;

/// A serialized e-book with the message that accompanies it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryPayload {
    pub file_name: String,
    pub subject: String,
    pub body: String,
    pub bytes: Vec<u8>,
}

impl DeliveryPayload {
    /// Serialize `ebook` and describe it. `source_ref` is the URL or
    /// "Local file: ..." reference shown to the recipient.
    pub fn from_ebook(ebook: &EbookDocument, source_ref: &str) -> Result<Self> {
        Self::from_ebook_at(ebook, source_ref, Local::now())
    }

    /// Like [`from_ebook`](Self::from_ebook) with an explicit send time.
    pub fn from_ebook_at(
        ebook: &EbookDocument,
        source_ref: &str,
        sent: DateTime<Local>,
    ) -> Result<Self> {
        let title = &ebook.metadata.title;
        Ok(Self {
            file_name: format!("{}.epub", clean_file_name(title)),
            subject: format!("Convert: {title}"),
            body: format!(
                "Article: {title}\nSource: {source_ref}\nSent on: {}",
                sent.format("%Y-%m-%d %H:%M:%S")
            ),
            bytes: to_epub_bytes(ebook)?,
        })
    }
}

/// Accepts finished e-books.
pub trait Delivery {
    /// Deliver the payload, returning where it went.
    fn deliver(&self, payload: &DeliveryPayload) -> Result<PathBuf>;
}

/// Writes payloads into a directory.
#[derive(Debug, Clone)]
pub struct DirectoryDelivery {
    dir: PathBuf,
}

impl DirectoryDelivery {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Delivery for DirectoryDelivery {
    fn deliver(&self, payload: &DeliveryPayload) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(&payload.file_name);
        fs::write(&path, &payload.bytes)?;
        info!(path = %path.display(), bytes = payload.bytes.len(), subject = %payload.subject, "delivered ebook");
        Ok(path)
    }
}

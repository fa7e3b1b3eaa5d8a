//! The packaged e-book: chapters, embedded images and package structure.

mod assemble;

pub use assemble::{Assembler, new_identifier};

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};

/// Media type of chapter documents.
pub const XHTML_MEDIA_TYPE: &str = "application/xhtml+xml";

/// Package-level metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    pub title: String,
    pub author: String,
    /// `urn:uuid:` identifier, unique per generated document.
    pub identifier: String,
    pub language: String,
    /// Where the article came from, as shown to the reader.
    pub source: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub modified: DateTime<Utc>,
}

/// One XHTML content document.
#[derive(Debug, Clone, PartialEq)]
pub struct Chapter {
    pub id: String,
    pub title: String,
    /// Path relative to the package document.
    pub href: String,
    /// XHTML body fragment.
    pub body: String,
}

/// An embedded binary resource.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageResource {
    pub id: String,
    pub href: String,
    pub media_type: String,
    pub data: Vec<u8>,
}

/// A package manifest entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestItem {
    pub id: String,
    pub href: String,
    pub media_type: String,
    pub properties: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TocEntry {
    pub title: String,
    pub chapter_id: String,
    pub href: String,
}

/// A complete, validated e-book.
#[derive(Debug, Clone, PartialEq)]
pub struct EbookDocument {
    pub metadata: Metadata,
    pub chapters: Vec<Chapter>,
    pub resources: Vec<ImageResource>,
    pub manifest: Vec<ManifestItem>,
    /// Manifest ids in reading order.
    pub spine: Vec<String>,
    pub toc: Vec<TocEntry>,
}

impl EbookDocument {
    pub fn chapter(&self, id: &str) -> Option<&Chapter> {
        self.chapters.iter().find(|c| c.id == id)
    }

    pub fn manifest_item(&self, id: &str) -> Option<&ManifestItem> {
        self.manifest.iter().find(|m| m.id == id)
    }

    pub fn resource(&self, href: &str) -> Option<&ImageResource> {
        self.resources.iter().find(|r| r.href == href)
    }

    /// Check manifest, spine and table of contents agree.
    ///
    /// A failure here is a bug in whatever built the document.
    pub fn validate(&self) -> Result<()> {
        let violation = |msg: String| Err(Error::AssemblyInvariantViolation(msg));

        if self.metadata.title.trim().is_empty() {
            return violation("empty title".into());
        }
        if self.metadata.identifier.is_empty() {
            return violation("empty identifier".into());
        }
        if self.chapters.is_empty() {
            return violation("no chapters".into());
        }

        let mut ids = HashSet::new();
        let mut hrefs = HashSet::new();
        for item in &self.manifest {
            if !ids.insert(item.id.as_str()) {
                return violation(format!("duplicate manifest id `{}`", item.id));
            }
            if !hrefs.insert(item.href.as_str()) {
                return violation(format!("duplicate manifest href `{}`", item.href));
            }
            let has_content = self
                .chapters
                .iter()
                .any(|c| c.id == item.id && c.href == item.href)
                || self
                    .resources
                    .iter()
                    .any(|r| r.id == item.id && r.href == item.href && !r.data.is_empty());
            if !has_content {
                return violation(format!("manifest item `{}` has no content", item.id));
            }
        }

        let mut spine_counts: HashMap<&str, usize> = HashMap::new();
        for id in &self.spine {
            *spine_counts.entry(id.as_str()).or_default() += 1;
            let entries = self.manifest.iter().filter(|m| &m.id == id).count();
            if entries != 1 {
                return violation(format!("spine item `{id}` has {entries} manifest entries"));
            }
        }
        if let Some((id, _)) = spine_counts.iter().find(|(_, n)| **n > 1) {
            return violation(format!("spine item `{id}` repeated"));
        }
        let chapter_ids: Vec<&str> = self.chapters.iter().map(|c| c.id.as_str()).collect();
        let spine_ids: Vec<&str> = self.spine.iter().map(String::as_str).collect();
        if chapter_ids != spine_ids {
            return violation("spine order differs from chapter order".into());
        }

        for entry in &self.toc {
            match self.chapter(&entry.chapter_id) {
                Some(chapter) if chapter.href == entry.href => {}
                _ => {
                    return violation(format!(
                        "toc entry `{}` points at missing chapter `{}`",
                        entry.title, entry.chapter_id
                    ));
                }
            }
        }
        Ok(())
    }
}

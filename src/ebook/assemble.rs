//! Builds an [`EbookDocument`] from a sanitized article.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use tracing::{debug, warn};

use super::{
    Chapter, EbookDocument, ImageResource, ManifestItem, Metadata, TocEntry, XHTML_MEDIA_TYPE,
};
use crate::article::{ArticleDocument, ContentBlock};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::fetch::{ImageSource, NoImages};
use crate::html::text::escape_xml;
use crate::source::normalize_host;
use crate::util::{decode_data_uri, detect_media_format, time_seed_nanos};

const DEFAULT_AUTHOR: &str = "Unknown";
const UNTITLED: &str = "Untitled Article";

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// A fresh `urn:uuid:` identifier derived from `seed`, the clock and a
/// process-local sequence. Two calls never return the same value.
pub fn new_identifier(seed: &str) -> String {
    let mut hasher = sha1_smol::Sha1::new();
    hasher.update(seed.as_bytes());
    hasher.update(&time_seed_nanos().to_le_bytes());
    hasher.update(&SEQUENCE.fetch_add(1, Ordering::Relaxed).to_le_bytes());
    hasher.update(&std::process::id().to_le_bytes());
    let digest = hasher.digest().bytes();

    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    // Name-based (SHA-1) UUID, RFC 4122 variant.
    bytes[6] = (bytes[6] & 0x0f) | 0x50;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    format!(
        "urn:uuid:{}-{}-{}-{}-{}",
        &hex[..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..]
    )
}

/// Turns articles into e-books.
#[derive(Clone)]
pub struct Assembler {
    language: String,
    split_chapters: bool,
    images: Arc<dyn ImageSource>,
}

impl std::fmt::Debug for Assembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assembler")
            .field("language", &self.language)
            .field("split_chapters", &self.split_chapters)
            .finish_non_exhaustive()
    }
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new(&PipelineConfig::default())
    }
}

impl Assembler {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            language: config.language.clone(),
            split_chapters: config.split_chapters,
            images: Arc::new(NoImages),
        }
    }

    /// Where image bytes come from. Without one only `data:` URIs embed.
    pub fn with_images(mut self, images: Arc<dyn ImageSource>) -> Self {
        self.images = images;
        self
    }

    /// Assemble `article` into a validated e-book.
    pub fn assemble(&self, article: ArticleDocument) -> Result<EbookDocument> {
        let host = article
            .source_url
            .as_ref()
            .and_then(|u| u.host_str())
            .map(normalize_host);
        let title = match article.title.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => match &host {
                Some(host) => format!("Article from {host}"),
                None => UNTITLED.to_string(),
            },
        };
        let author = article
            .author
            .clone()
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_AUTHOR.to_string());

        let seed: String = std::iter::once(title.clone())
            .chain(article.blocks.iter().map(ContentBlock::plain_text))
            .collect::<Vec<_>>()
            .join("\n");

        let metadata = Metadata {
            identifier: new_identifier(&seed),
            title,
            author,
            language: self.language.clone(),
            source: article.source_url.as_ref().map(|u| u.to_string()),
            published: article.published,
            modified: Utc::now(),
        };

        let (blocks, resources) = self.embed_images(article.blocks);

        let mut chapters = Vec::new();
        for (index, (chapter_title, blocks)) in self.split(&metadata.title, blocks).into_iter().enumerate() {
            let number = index + 1;
            let mut body = String::new();
            if index == 0 {
                body.push_str(&front_matter(&metadata, host.as_deref(), article.author.is_some()));
            }
            for block in &blocks {
                body.push_str(&block.to_html_shifted(1));
                body.push('\n');
            }
            chapters.push(Chapter {
                id: format!("chapter_{number}"),
                title: chapter_title,
                href: format!("chapter_{number}.xhtml"),
                body,
            });
        }

        let mut manifest: Vec<ManifestItem> = chapters
            .iter()
            .map(|c| ManifestItem {
                id: c.id.clone(),
                href: c.href.clone(),
                media_type: XHTML_MEDIA_TYPE.to_string(),
                properties: None,
            })
            .collect();
        manifest.extend(resources.iter().map(|r| ManifestItem {
            id: r.id.clone(),
            href: r.href.clone(),
            media_type: r.media_type.clone(),
            properties: None,
        }));

        let spine = chapters.iter().map(|c| c.id.clone()).collect();
        let toc = chapters
            .iter()
            .map(|c| TocEntry {
                title: c.title.clone(),
                chapter_id: c.id.clone(),
                href: c.href.clone(),
            })
            .collect();

        let ebook = EbookDocument {
            metadata,
            chapters,
            resources,
            manifest,
            spine,
            toc,
        };
        ebook.validate()?;
        debug!(
            chapters = ebook.chapters.len(),
            images = ebook.resources.len(),
            identifier = %ebook.metadata.identifier,
            "assembled ebook"
        );
        Ok(ebook)
    }

    /// Load every image once, rewrite sources to package paths and drop the
    /// images that could not be loaded or typed.
    fn embed_images(&self, blocks: Vec<ContentBlock>) -> (Vec<ContentBlock>, Vec<ImageResource>) {
        let mut resources: Vec<ImageResource> = Vec::new();
        let mut embedded: HashMap<String, Option<String>> = HashMap::new();
        let mut out = Vec::with_capacity(blocks.len());

        for block in blocks {
            let ContentBlock::Image { src, alt } = block else {
                out.push(block);
                continue;
            };
            let href = match embedded.get(&src) {
                Some(href) => href.clone(),
                None => {
                    let href = self.load_image(&src, resources.len() + 1).map(|resource| {
                        let href = resource.href.clone();
                        resources.push(resource);
                        href
                    });
                    embedded.insert(src.clone(), href.clone());
                    href
                }
            };
            match href {
                Some(href) => out.push(ContentBlock::Image { src: href, alt }),
                None => warn!(src = %truncate_src(&src), "dropping image that could not be embedded"),
            }
        }
        (out, resources)
    }

    fn load_image(&self, src: &str, number: usize) -> Option<ImageResource> {
        let (data, declared) = if src.get(..5).is_some_and(|p| p.eq_ignore_ascii_case("data:")) {
            let uri = decode_data_uri(src)?;
            (uri.data, uri.media_type)
        } else {
            (self.images.load(src)?, None)
        };
        if data.is_empty() {
            return None;
        }
        let format = detect_media_format(src, &data).or_else(|| {
            declared
                .as_deref()
                .and_then(crate::util::MediaFormat::from_mime_type)
        })?;
        Some(ImageResource {
            id: format!("img_{number}"),
            href: format!("images/img_{number}.{}", format.extension()),
            media_type: format.mime_type().to_string(),
            data,
        })
    }

    /// Group blocks into `(title, blocks)` chapters.
    fn split(&self, title: &str, blocks: Vec<ContentBlock>) -> Vec<(String, Vec<ContentBlock>)> {
        let top_level = blocks
            .iter()
            .filter(|b| matches!(b, ContentBlock::Heading { level: 1, .. }))
            .count();
        if !self.split_chapters || top_level < 2 {
            return vec![(title.to_string(), blocks)];
        }

        let mut chapters: Vec<(String, Vec<ContentBlock>)> = Vec::new();
        let mut preamble = Vec::new();
        for block in blocks {
            if let ContentBlock::Heading { level: 1, text } = &block {
                let chapter_title = if chapters.is_empty() && preamble.iter().any(|b: &ContentBlock| !b.is_empty()) {
                    title.to_string()
                } else {
                    text.clone()
                };
                let mut body = std::mem::take(&mut preamble);
                body.push(block);
                chapters.push((chapter_title, body));
            } else if let Some((_, body)) = chapters.last_mut() {
                body.push(block);
            } else {
                preamble.push(block);
            }
        }
        chapters
    }
}

/// Title, byline and source link at the top of the first chapter.
fn front_matter(metadata: &Metadata, host: Option<&str>, has_author: bool) -> String {
    let mut html = format!("<h1>{}</h1>\n", escape_xml(&metadata.title));

    let mut byline = Vec::new();
    if has_author {
        byline.push(escape_xml(&metadata.author));
    }
    if let Some(date) = metadata.published {
        byline.push(date.format("%B %-d, %Y").to_string());
    }
    if !byline.is_empty() {
        html.push_str(&format!("<p class=\"byline\">{}</p>\n", byline.join(" &#183; ")));
    }

    if let Some(source) = &metadata.source {
        let label = host.unwrap_or(source);
        html.push_str(&format!(
            "<p class=\"source\">Source: <a href=\"{}\">{}</a></p>\n",
            escape_xml(source),
            escape_xml(label)
        ));
    }
    html
}

fn truncate_src(src: &str) -> String {
    if src.len() <= 80 {
        return src.to_string();
    }
    let mut end = 80;
    while !src.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &src[..end])
}

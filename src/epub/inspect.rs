//! Reads back the package structure of an EPUB and reports inconsistencies.

use std::collections::HashSet;
use std::io::{Cursor, Read, Seek};

use quick_xml::Reader;
use quick_xml::events::Event;
use zip::ZipArchive;

use super::writer::MIMETYPE;
use crate::error::{Error, Result};
use crate::html::text::is_xml_char;

/// Manifest media types whose documents must be well-formed XML.
const XML_MEDIA_TYPES: &[&str] = &["application/xhtml+xml", "application/x-dtbncx+xml"];

/// One `<item>` of the package manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageItem {
    pub id: String,
    pub href: String,
    pub media_type: String,
}

/// What an EPUB archive claims to contain.
#[derive(Debug, Clone, Default)]
pub struct PackageSummary {
    /// Path of the package document inside the archive.
    pub opf_path: String,
    pub title: Option<String>,
    pub identifier: Option<String>,
    pub language: Option<String>,
    pub manifest: Vec<PackageItem>,
    /// Spine `idref`s in reading order.
    pub spine: Vec<String>,
    /// Manifest id named by the spine's `toc` attribute.
    pub toc_id: Option<String>,
    /// Every entry name in the archive, in archive order.
    pub entries: Vec<String>,
    /// Whether the first entry is an uncompressed, correct `mimetype`.
    pub mimetype_ok: bool,
    /// XML documents of the manifest that failed to parse: archive path and
    /// reason.
    pub malformed: Vec<(String, String)>,
}

impl PackageSummary {
    /// Human-readable descriptions of everything wrong with the package.
    /// Empty when the package is consistent.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if !self.mimetype_ok {
            problems.push("mimetype is not the first, stored entry".to_string());
        }
        if self.title.as_deref().is_none_or(|t| t.trim().is_empty()) {
            problems.push("missing dc:title".to_string());
        }
        if self.identifier.as_deref().is_none_or(|t| t.trim().is_empty()) {
            problems.push("missing dc:identifier".to_string());
        }
        if self.spine.is_empty() {
            problems.push("empty spine".to_string());
        }

        let mut ids = HashSet::new();
        for item in &self.manifest {
            if !ids.insert(item.id.as_str()) {
                problems.push(format!("duplicate manifest id `{}`", item.id));
            }
            let path = self.resolve(&item.href);
            if !self.entries.iter().any(|e| *e == path) {
                problems.push(format!("manifest item `{}` missing from archive: {path}", item.id));
            }
        }
        let mut seen = HashSet::new();
        for idref in &self.spine {
            if !ids.contains(idref.as_str()) {
                problems.push(format!("spine item `{idref}` not in manifest"));
            }
            if !seen.insert(idref.as_str()) {
                problems.push(format!("spine item `{idref}` repeated"));
            }
        }
        if let Some(toc) = &self.toc_id
            && !ids.contains(toc.as_str())
        {
            problems.push(format!("spine toc `{toc}` not in manifest"));
        }
        for (path, reason) in &self.malformed {
            problems.push(format!("{path} is not well-formed: {reason}"));
        }
        problems
    }

    /// Archive path of a manifest href.
    pub fn resolve(&self, href: &str) -> String {
        match self.opf_path.rsplit_once('/') {
            Some((dir, _)) => format!("{dir}/{href}"),
            None => href.to_string(),
        }
    }

    pub fn item(&self, id: &str) -> Option<&PackageItem> {
        self.manifest.iter().find(|i| i.id == id)
    }
}

/// Inspect an in-memory EPUB archive.
pub fn inspect_epub(bytes: &[u8]) -> Result<PackageSummary> {
    inspect_epub_from_reader(Cursor::new(bytes))
}

/// Inspect an EPUB archive from any [`Read`] + [`Seek`] source.
pub fn inspect_epub_from_reader<R: Read + Seek>(reader: R) -> Result<PackageSummary> {
    let mut archive = ZipArchive::new(reader)?;
    let entries: Vec<String> = (0..archive.len())
        .filter_map(|i| archive.name_for_index(i).map(str::to_string))
        .collect();

    let mimetype_ok = if archive.is_empty() {
        false
    } else {
        let mut first = archive.by_index(0)?;
        let stored = first.compression() == zip::CompressionMethod::Stored;
        let named = first.name() == "mimetype";
        let mut content = Vec::new();
        first.read_to_end(&mut content)?;
        stored && named && content == MIMETYPE
    };

    let container = read_archive_text(&mut archive, "META-INF/container.xml")?;
    let opf_path = find_opf_path(&container)?;
    let opf = read_archive_text(&mut archive, &opf_path)?;

    let mut summary = parse_opf(&opf)?;
    summary.opf_path = opf_path;
    summary.entries = entries;
    summary.mimetype_ok = mimetype_ok;

    let mut malformed = Vec::new();
    for item in &summary.manifest {
        let path = summary.resolve(&item.href);
        if !XML_MEDIA_TYPES.contains(&item.media_type.as_str())
            || !summary.entries.contains(&path)
        {
            continue;
        }
        let checked = read_archive_text(&mut archive, &path)
            .map_err(|e| e.to_string())
            .and_then(|content| check_well_formed(&content));
        if let Err(reason) = checked {
            malformed.push((path, reason));
        }
    }
    summary.malformed = malformed;
    Ok(summary)
}

/// Parse a whole document, failing on characters XML forbids, mismatched
/// tags and unclosed elements.
fn check_well_formed(content: &str) -> std::result::Result<(), String> {
    if let Some(c) = content.chars().find(|&c| !is_xml_char(c)) {
        return Err(format!("character U+{:04X} is not allowed", u32::from(c)));
    }
    let mut reader = Reader::from_str(content);
    let mut depth = 0usize;
    loop {
        match reader.read_event() {
            Ok(Event::Start(_)) => depth += 1,
            Ok(Event::End(_)) => depth = depth.saturating_sub(1),
            Ok(Event::Eof) if depth == 0 => return Ok(()),
            Ok(Event::Eof) => return Err(format!("{depth} unclosed elements")),
            Err(e) => return Err(e.to_string()),
            _ => {}
        }
    }
}

fn read_archive_text<R: Read + Seek>(archive: &mut ZipArchive<R>, path: &str) -> Result<String> {
    let mut file = archive
        .by_name(path)
        .map_err(|_| Error::InvalidEpub(format!("missing {path}")))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    String::from_utf8(strip_bom(&bytes).to_vec())
        .map_err(|_| Error::InvalidEpub(format!("{path} is not UTF-8")))
}

fn find_opf_path(container: &str) -> Result<String> {
    let mut reader = Reader::from_str(container);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) if local_name(e.name().as_ref()) == b"rootfile" => {
                for attr in e.attributes().flatten() {
                    if attr.key.as_ref() == b"full-path" {
                        return Ok(String::from_utf8_lossy(&attr.value).into_owned());
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e)),
            _ => {}
        }
    }

    Err(Error::InvalidEpub("no rootfile in container.xml".into()))
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Identifier,
    Language,
}

fn parse_opf(content: &str) -> Result<PackageSummary> {
    let mut reader = Reader::from_str(content);

    let mut summary = PackageSummary::default();
    let mut in_metadata = false;
    let mut current: Option<Field> = None;
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"metadata" => in_metadata = true,
                    b"title" if in_metadata => current = Some(Field::Title),
                    b"identifier" if in_metadata => current = Some(Field::Identifier),
                    b"language" if in_metadata => current = Some(Field::Language),
                    b"spine" => summary.toc_id = attribute(&e, b"toc"),
                    _ => {}
                }
                text.clear();
            }
            Ok(Event::Empty(e)) => {
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"item" => {
                        if let Some(id) = attribute(&e, b"id") {
                            summary.manifest.push(PackageItem {
                                id,
                                href: attribute(&e, b"href").unwrap_or_default(),
                                media_type: attribute(&e, b"media-type").unwrap_or_default(),
                            });
                        }
                    }
                    b"itemref" => {
                        if let Some(idref) = attribute(&e, b"idref") {
                            summary.spine.push(idref);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(e)) => {
                if current.is_some() {
                    text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if current.is_some()
                    && let Some(resolved) = resolve_entity(&String::from_utf8_lossy(e.as_ref()))
                {
                    text.push_str(&resolved);
                }
            }
            Ok(Event::End(e)) => {
                let name = e.name();
                if local_name(name.as_ref()) == b"metadata" {
                    in_metadata = false;
                }
                if let Some(field) = current.take() {
                    let value = Some(text.trim().to_string());
                    // First occurrence wins.
                    match field {
                        Field::Title if summary.title.is_none() => summary.title = value,
                        Field::Identifier if summary.identifier.is_none() => {
                            summary.identifier = value
                        }
                        Field::Language if summary.language.is_none() => summary.language = value,
                        _ => {}
                    }
                    text.clear();
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e)),
            _ => {}
        }
    }

    Ok(summary)
}

fn attribute(e: &quick_xml::events::BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .map(|attr| String::from_utf8_lossy(&attr.value).into_owned())
}

fn resolve_entity(entity: &str) -> Option<String> {
    match entity {
        "apos" => return Some("'".to_string()),
        "quot" => return Some("\"".to_string()),
        "lt" => return Some("<".to_string()),
        "gt" => return Some(">".to_string()),
        "amp" => return Some("&".to_string()),
        _ => {}
    }

    let code = if let Some(hex) = entity.strip_prefix("#x") {
        u32::from_str_radix(hex, 16).ok()?
    } else {
        entity.strip_prefix('#')?.parse::<u32>().ok()?
    };
    char::from_u32(code).map(|c| c.to_string())
}

fn strip_bom(data: &[u8]) -> &[u8] {
    data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data)
}

/// Local part of a possibly namespaced XML name.
fn local_name(name: &[u8]) -> &[u8] {
    name.iter()
        .rposition(|&b| b == b':')
        .map(|i| &name[i + 1..])
        .unwrap_or(name)
}

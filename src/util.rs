//! Byte-level helpers: text decoding, media sniffing, data URIs and file names.

use std::borrow::Cow;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Nanoseconds since the Unix epoch, or 0 if the clock is before it.
pub fn time_seed_nanos() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// Decode bytes to a string, handling various encodings.
///
/// 1. UTF-8 (a BOM is handled by encoding_rs)
/// 2. The hint encoding, usually from `<meta charset>`
/// 3. Windows-1252, which old saved pages commonly use
pub fn decode_text<'a>(bytes: &'a [u8], hint_encoding: Option<&str>) -> Cow<'a, str> {
    let (result, _encoding, malformed) = encoding_rs::UTF_8.decode(bytes);
    if !malformed {
        return result;
    }

    if let Some(name) = hint_encoding
        && let Some(encoding) = encoding_rs::Encoding::for_label(name.as_bytes())
    {
        let (result, _, _) = encoding.decode(bytes);
        return result;
    }

    let (result, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    result
}

/// Charset declared by `<meta charset="...">` or an `http-equiv` content
/// type within the first kilobyte of an HTML page.
pub fn extract_meta_charset(bytes: &[u8]) -> Option<String> {
    let head = &bytes[..bytes.len().min(1024)];
    let lower = head.to_ascii_lowercase();
    let pos = memchr::memmem::find(&lower, b"charset=")?;
    let value = &head[pos + 8..];
    let value = value
        .strip_prefix(b"\"")
        .or_else(|| value.strip_prefix(b"'"))
        .unwrap_or(value);
    let end = value
        .iter()
        .position(|&b| matches!(b, b'"' | b'\'' | b';' | b'>' | b'/') || b.is_ascii_whitespace())
        .unwrap_or(value.len());
    let label = std::str::from_utf8(&value[..end]).ok()?.trim();
    (!label.is_empty()).then(|| label.to_string())
}

/// Image formats that can be embedded in a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaFormat {
    Jpeg,
    Png,
    Gif,
    Svg,
    WebP,
}

impl MediaFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            MediaFormat::Jpeg => "image/jpeg",
            MediaFormat::Png => "image/png",
            MediaFormat::Gif => "image/gif",
            MediaFormat::Svg => "image/svg+xml",
            MediaFormat::WebP => "image/webp",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            MediaFormat::Jpeg => "jpg",
            MediaFormat::Png => "png",
            MediaFormat::Gif => "gif",
            MediaFormat::Svg => "svg",
            MediaFormat::WebP => "webp",
        }
    }

    /// Format named by a MIME type such as `image/png`.
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(MediaFormat::Jpeg),
            "image/png" => Some(MediaFormat::Png),
            "image/gif" => Some(MediaFormat::Gif),
            "image/svg+xml" => Some(MediaFormat::Svg),
            "image/webp" => Some(MediaFormat::WebP),
            _ => None,
        }
    }
}

/// Detect an image format from magic bytes, falling back to the extension
/// of `path` (query string and fragment ignored).
pub fn detect_media_format(path: &str, data: &[u8]) -> Option<MediaFormat> {
    sniff_image(data).or_else(|| format_from_extension(path))
}

fn sniff_image(data: &[u8]) -> Option<MediaFormat> {
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some(MediaFormat::Jpeg);
    }
    if data.starts_with(&[0x89, b'P', b'N', b'G']) {
        return Some(MediaFormat::Png);
    }
    if data.starts_with(b"GIF8") {
        return Some(MediaFormat::Gif);
    }
    if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
        return Some(MediaFormat::WebP);
    }
    let head = &data[..data.len().min(256)];
    let trimmed = head.trim_ascii_start();
    if (trimmed.starts_with(b"<svg") || trimmed.starts_with(b"<?xml"))
        && memchr::memmem::find(head, b"<svg").is_some()
    {
        return Some(MediaFormat::Svg);
    }
    None
}

fn format_from_extension(path: &str) -> Option<MediaFormat> {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    let ext = path.rsplit_once('.')?.1.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some(MediaFormat::Jpeg),
        "png" => Some(MediaFormat::Png),
        "gif" => Some(MediaFormat::Gif),
        "svg" => Some(MediaFormat::Svg),
        "webp" => Some(MediaFormat::WebP),
        _ => None,
    }
}

/// A decoded `data:` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    pub media_type: Option<String>,
    pub data: Vec<u8>,
}

/// Decode a `data:[<media type>][;base64],<data>` URI.
///
/// Non-base64 payloads are taken literally; percent-escapes are not decoded.
pub fn decode_data_uri(uri: &str) -> Option<DataUri> {
    let rest = uri.get(..5).filter(|p| p.eq_ignore_ascii_case("data:"))?;
    let rest = &uri[rest.len()..];
    let (header, payload) = rest.split_once(',')?;
    let mut params = header.split(';');
    let media_type = params
        .next()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string);
    let is_base64 = params.any(|p| p.trim().eq_ignore_ascii_case("base64"));

    let data = if is_base64 {
        let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        STANDARD.decode(compact).ok()?
    } else {
        payload.as_bytes().to_vec()
    };
    Some(DataUri { media_type, data })
}

/// A file name for a title: separators and punctuation removed, spaces
/// turned into underscores.
pub fn clean_file_name(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    let joined = cleaned.split_whitespace().collect::<Vec<_>>().join("_");
    let truncated: String = joined.chars().take(100).collect();
    if truncated.is_empty() {
        "article".to_string()
    } else {
        truncated
    }
}

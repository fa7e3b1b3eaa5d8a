//! EPUB 3 serialization with an NCX table of contents for older readers.

use std::io::{Cursor, Seek, Write};
use std::path::Path;

use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::ebook::{EbookDocument, ManifestItem};
use crate::error::Result;
use crate::html::text::escape_xml;

pub(crate) const MIMETYPE: &[u8] = b"application/epub+zip";

/// Container.xml pointing at the package document.
const CONTAINER_XML: &[u8] = br#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>
"#;

const STYLE_CSS: &str = "body { margin: 0 5%; line-height: 1.5; }
h1, h2, h3, h4, h5, h6 { line-height: 1.2; margin: 1.2em 0 0.6em; }
p { margin: 0 0 0.8em; text-align: left; }
p.byline, p.source { font-size: 0.9em; color: #555; margin: 0 0 0.4em; }
blockquote { margin: 1em 1.5em; font-style: italic; }
div.figure { margin: 1em 0; text-align: center; }
div.figure img { max-width: 100%; }
";

/// Write `ebook` as an EPUB archive to any [`Write`] + [`Seek`] destination.
///
/// The document is validated first; nothing is written when it is
/// inconsistent.
pub fn write_epub<W: Write + Seek>(ebook: &EbookDocument, writer: W) -> Result<W> {
    ebook.validate()?;

    let mut zip = ZipWriter::new(writer);
    let stored = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    let deflated =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    // The mimetype entry must come first and uncompressed.
    zip.start_file("mimetype", stored)?;
    zip.write_all(MIMETYPE)?;

    zip.start_file("META-INF/container.xml", deflated)?;
    zip.write_all(CONTAINER_XML)?;

    zip.start_file("OEBPS/content.opf", deflated)?;
    zip.write_all(generate_opf(ebook).as_bytes())?;

    zip.start_file("OEBPS/toc.ncx", deflated)?;
    zip.write_all(generate_ncx(ebook).as_bytes())?;

    zip.start_file("OEBPS/nav.xhtml", deflated)?;
    zip.write_all(generate_nav(ebook).as_bytes())?;

    zip.start_file("OEBPS/style.css", deflated)?;
    zip.write_all(STYLE_CSS.as_bytes())?;

    for chapter in &ebook.chapters {
        let path = format!("OEBPS/{}", chapter.href);
        zip.start_file(path.as_str(), deflated)?;
        zip.write_all(chapter_document(ebook, &chapter.title, &chapter.body).as_bytes())?;
    }

    for resource in &ebook.resources {
        let path = format!("OEBPS/{}", resource.href);
        zip.start_file(path.as_str(), stored)?;
        zip.write_all(&resource.data)?;
    }

    Ok(zip.finish()?)
}

/// Serialize `ebook` into an in-memory EPUB.
pub fn to_epub_bytes(ebook: &EbookDocument) -> Result<Vec<u8>> {
    Ok(write_epub(ebook, Cursor::new(Vec::new()))?.into_inner())
}

/// Write `ebook` to a file on disk.
pub fn save_epub<P: AsRef<Path>>(ebook: &EbookDocument, path: P) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_epub(ebook, file)?;
    Ok(())
}

/// Items the writer adds to every package on top of the document's own.
fn package_items() -> [ManifestItem; 3] {
    [
        ManifestItem {
            id: "ncx".into(),
            href: "toc.ncx".into(),
            media_type: "application/x-dtbncx+xml".into(),
            properties: None,
        },
        ManifestItem {
            id: "nav".into(),
            href: "nav.xhtml".into(),
            media_type: "application/xhtml+xml".into(),
            properties: Some("nav".into()),
        },
        ManifestItem {
            id: "css".into(),
            href: "style.css".into(),
            media_type: "text/css".into(),
            properties: None,
        },
    ]
}

fn generate_opf(ebook: &EbookDocument) -> String {
    let metadata = &ebook.metadata;
    let mut opf = String::new();

    opf.push_str(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="BookId">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
"#,
    );
    opf.push_str(&format!(
        "    <dc:title id=\"title\">{}</dc:title>\n",
        escape_xml(&metadata.title)
    ));
    opf.push_str(&format!(
        "    <dc:creator id=\"creator\">{}</dc:creator>\n",
        escape_xml(&metadata.author)
    ));
    opf.push_str(&format!(
        "    <dc:language>{}</dc:language>\n",
        escape_xml(&metadata.language)
    ));
    opf.push_str(&format!(
        "    <dc:identifier id=\"BookId\">{}</dc:identifier>\n",
        escape_xml(&metadata.identifier)
    ));
    if let Some(published) = metadata.published {
        opf.push_str(&format!(
            "    <dc:date>{}</dc:date>\n",
            published.format("%Y-%m-%d")
        ));
    }
    if let Some(source) = &metadata.source {
        opf.push_str(&format!("    <dc:source>{}</dc:source>\n", escape_xml(source)));
    }
    opf.push_str(&format!(
        "    <meta property=\"dcterms:modified\">{}</meta>\n",
        metadata.modified.format("%Y-%m-%dT%H:%M:%SZ")
    ));
    opf.push_str("  </metadata>\n");

    opf.push_str("  <manifest>\n");
    for item in package_items().iter().chain(&ebook.manifest) {
        opf.push_str(&format!(
            "    <item id=\"{}\" href=\"{}\" media-type=\"{}\"",
            escape_xml(&item.id),
            escape_xml(&item.href),
            escape_xml(&item.media_type)
        ));
        if let Some(properties) = &item.properties {
            opf.push_str(&format!(" properties=\"{}\"", escape_xml(properties)));
        }
        opf.push_str("/>\n");
    }
    opf.push_str("  </manifest>\n");

    opf.push_str("  <spine toc=\"ncx\">\n");
    for id in &ebook.spine {
        opf.push_str(&format!("    <itemref idref=\"{}\"/>\n", escape_xml(id)));
    }
    opf.push_str("  </spine>\n");

    opf.push_str("</package>\n");
    opf
}

fn generate_ncx(ebook: &EbookDocument) -> String {
    let mut ncx = String::new();

    ncx.push_str(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
"#,
    );
    ncx.push_str(&format!(
        "    <meta name=\"dtb:uid\" content=\"{}\"/>\n",
        escape_xml(&ebook.metadata.identifier)
    ));
    ncx.push_str(
        r#"    <meta name="dtb:depth" content="1"/>
    <meta name="dtb:totalPageCount" content="0"/>
    <meta name="dtb:maxPageNumber" content="0"/>
  </head>
"#,
    );
    ncx.push_str(&format!(
        "  <docTitle><text>{}</text></docTitle>\n  <navMap>\n",
        escape_xml(&ebook.metadata.title)
    ));

    for (index, entry) in ebook.toc.iter().enumerate() {
        let play_order = index + 1;
        ncx.push_str(&format!(
            "    <navPoint id=\"navPoint-{play_order}\" playOrder=\"{play_order}\">\n"
        ));
        ncx.push_str(&format!(
            "      <navLabel><text>{}</text></navLabel>\n",
            escape_xml(&entry.title)
        ));
        ncx.push_str(&format!(
            "      <content src=\"{}\"/>\n",
            escape_xml(&entry.href)
        ));
        ncx.push_str("    </navPoint>\n");
    }

    ncx.push_str("  </navMap>\n</ncx>\n");
    ncx
}

fn generate_nav(ebook: &EbookDocument) -> String {
    let mut items = String::new();
    for entry in &ebook.toc {
        items.push_str(&format!(
            "      <li><a href=\"{}\">{}</a></li>\n",
            escape_xml(&entry.href),
            escape_xml(&entry.title)
        ));
    }
    let body = format!(
        "<nav epub:type=\"toc\" id=\"toc\">\n    <h1>Contents</h1>\n    <ol>\n{items}    </ol>\n  </nav>\n"
    );
    xhtml_document(&ebook.metadata.language, "Contents", &body)
}

fn chapter_document(ebook: &EbookDocument, title: &str, body: &str) -> String {
    xhtml_document(&ebook.metadata.language, title, body)
}

fn xhtml_document(language: &str, title: &str, body: &str) -> String {
    let language = escape_xml(language);
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops" xml:lang="{language}" lang="{language}">
<head>
  <meta charset="UTF-8"/>
  <title>{}</title>
  <link rel="stylesheet" type="text/css" href="style.css"/>
</head>
<body>
  {body}
</body>
</html>
"#,
        escape_xml(title)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::{ArticleDocument, ContentBlock};
    use crate::ebook::Assembler;

    fn ebook() -> EbookDocument {
        Assembler::default()
            .assemble(ArticleDocument {
                title: Some("Fish & Chips".into()),
                blocks: vec![ContentBlock::Paragraph {
                    text: "Batter <crisp>.".into(),
                }],
                ..Default::default()
            })
            .unwrap()
    }

    #[test]
    fn test_opf_lists_package_items_and_spine() {
        let ebook = ebook();
        let opf = generate_opf(&ebook);
        assert!(opf.contains("<dc:title id=\"title\">Fish &amp; Chips</dc:title>"));
        assert!(opf.contains("<dc:creator id=\"creator\">Unknown</dc:creator>"));
        assert!(opf.contains("properties=\"nav\""));
        assert!(opf.contains("<itemref idref=\"chapter_1\"/>"));
        assert!(opf.contains("dcterms:modified"));
        assert!(opf.contains(&ebook.metadata.identifier));
    }

    #[test]
    fn test_ncx_has_one_nav_point_per_entry() {
        let ncx = generate_ncx(&ebook());
        assert_eq!(ncx.matches("<navPoint ").count(), 1);
        assert!(ncx.contains("<content src=\"chapter_1.xhtml\"/>"));
    }

    #[test]
    fn test_chapter_document_escapes_text() {
        let ebook = ebook();
        let chapter = &ebook.chapters[0];
        let xhtml = chapter_document(&ebook, &chapter.title, &chapter.body);
        assert!(xhtml.contains("<title>Fish &amp; Chips</title>"));
        assert!(xhtml.contains("<p>Batter &lt;crisp&gt;.</p>"));
        assert!(xhtml.contains("xml:lang=\"en\""));
    }

    #[test]
    fn test_invalid_document_is_not_written() {
        let mut ebook = ebook();
        ebook.spine.push("missing".into());
        assert!(to_epub_bytes(&ebook).is_err());
    }
}

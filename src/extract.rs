//! Document loading: bytes in, page texts out.
//!
//! PDFs yield one page per PDF page, PPTX one page per slide, DOCX a single
//! page. Plain text is split into pages on form feeds.

use std::io::Read;
use std::path::Path;

use crate::error::LoadError;
use crate::models::Document;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const MIME_PPTX: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";
pub const MIME_TEXT: &str = "text/plain";
pub const MIME_MARKDOWN: &str = "text/markdown";

/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Guess a content type from a file extension.
pub fn content_type_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "pdf" => Some(MIME_PDF),
        "docx" => Some(MIME_DOCX),
        "pptx" => Some(MIME_PPTX),
        "txt" | "text" => Some(MIME_TEXT),
        "md" | "markdown" => Some(MIME_MARKDOWN),
        _ => None,
    }
}

/// Read a document from disk, detecting its type from the extension.
pub fn load(path: &Path, max_bytes: u64) -> Result<Document, LoadError> {
    let content_type = content_type_for_path(path).ok_or_else(|| {
        LoadError::UnsupportedContentType(format!(
            "unknown extension for {}",
            path.display()
        ))
    })?;

    let io_err = |source| LoadError::Io {
        path: path.display().to_string(),
        source,
    };
    let size = std::fs::metadata(path).map_err(io_err)?.len();
    if size > max_bytes {
        return Err(LoadError::TooLarge {
            size,
            limit: max_bytes,
        });
    }
    let bytes = std::fs::read(path).map_err(io_err)?;
    load_bytes(bytes, content_type, max_bytes)
}

/// Parse in-memory document bytes of the given content type.
pub fn load_bytes(
    bytes: Vec<u8>,
    content_type: &str,
    max_bytes: u64,
) -> Result<Document, LoadError> {
    if bytes.len() as u64 > max_bytes {
        return Err(LoadError::TooLarge {
            size: bytes.len() as u64,
            limit: max_bytes,
        });
    }

    let pages = extract_pages(&bytes, content_type)?;
    tracing::debug!(content_type, pages = pages.len(), "document loaded");

    Ok(Document {
        content_type: content_type.to_string(),
        bytes,
        pages,
    })
}

/// Extract page texts from binary content.
pub fn extract_pages(bytes: &[u8], content_type: &str) -> Result<Vec<String>, LoadError> {
    match content_type {
        MIME_PDF => extract_pdf(bytes),
        MIME_DOCX => extract_docx(bytes).map(|text| vec![text]),
        MIME_PPTX => extract_pptx(bytes),
        MIME_TEXT | MIME_MARKDOWN => extract_plain(bytes),
        _ => Err(LoadError::UnsupportedContentType(content_type.to_string())),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<Vec<String>, LoadError> {
    pdf_extract::extract_text_from_mem_by_pages(bytes).map_err(|e| LoadError::Pdf(e.to_string()))
}

fn extract_plain(bytes: &[u8]) -> Result<Vec<String>, LoadError> {
    let text = std::str::from_utf8(bytes).map_err(|_| LoadError::InvalidUtf8)?;
    Ok(text.split('\x0c').map(str::to_string).collect())
}

type Archive<'a> = zip::ZipArchive<std::io::Cursor<&'a [u8]>>;

fn open_archive(bytes: &[u8]) -> Result<Archive<'_>, LoadError> {
    zip::ZipArchive::new(std::io::Cursor::new(bytes)).map_err(|e| LoadError::Ooxml(e.to_string()))
}

fn read_zip_entry_bounded(
    archive: &mut Archive<'_>,
    name: &str,
    max_bytes: u64,
) -> Result<Vec<u8>, LoadError> {
    let entry = archive
        .by_name(name)
        .map_err(|e| LoadError::Ooxml(format!("{}: {}", name, e)))?;
    let mut out = Vec::new();
    entry
        .take(max_bytes)
        .read_to_end(&mut out)
        .map_err(|e| LoadError::Ooxml(e.to_string()))?;
    if out.len() as u64 >= max_bytes {
        return Err(LoadError::Ooxml(format!(
            "ZIP entry {} exceeds size limit ({} bytes)",
            name, max_bytes
        )));
    }
    Ok(out)
}

fn extract_docx(bytes: &[u8]) -> Result<String, LoadError> {
    let mut archive = open_archive(bytes)?;
    let xml = read_zip_entry_bounded(&mut archive, "word/document.xml", MAX_XML_ENTRY_BYTES)?;
    // Paragraph ends become newlines so sentences from adjacent paragraphs don't fuse.
    extract_text_runs(&xml, b"p")
}

fn extract_pptx(bytes: &[u8]) -> Result<Vec<String>, LoadError> {
    let mut archive = open_archive(bytes)?;
    let mut slide_names: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with("ppt/slides/slide") && n.ends_with(".xml"))
        .map(|s| s.to_string())
        .collect();
    slide_names.sort_by_key(|name| {
        name.trim_start_matches("ppt/slides/slide")
            .trim_end_matches(".xml")
            .parse::<u32>()
            .unwrap_or(u32::MAX)
    });

    let mut pages = Vec::with_capacity(slide_names.len());
    for name in slide_names {
        let xml = read_zip_entry_bounded(&mut archive, &name, MAX_XML_ENTRY_BYTES)?;
        pages.push(extract_text_runs(&xml, b"p")?);
    }
    Ok(pages)
}

/// Collect the text of every `<*:t>` element; a newline is emitted when an
/// element named `block` closes.
fn extract_text_runs(xml: &[u8], block: &[u8]) -> Result<String, LoadError> {
    use quick_xml::events::Event;

    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut in_text = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text = true,
            Ok(Event::Text(te)) if in_text => {
                let text = te
                    .unescape()
                    .map_err(|e| LoadError::Ooxml(e.to_string()))?;
                out.push_str(&text);
            }
            Ok(Event::End(e)) => {
                let name = e.local_name();
                if name.as_ref() == b"t" {
                    in_text = false;
                } else if name.as_ref() == block && !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(LoadError::Ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(out.trim_end().to_string())
}

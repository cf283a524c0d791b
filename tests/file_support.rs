//! Document formats on disk: PDF, DOCX, PPTX and Markdown through
//! `setup_path`.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;

use agentic_rag::config::Config;
use agentic_rag::embedding::HashEmbedder;
use agentic_rag::error::{LlmError, LoadError, SetupError};
use agentic_rag::extract::{self, MIME_PDF, MIME_PPTX};
use agentic_rag::llm::LanguageModel;
use agentic_rag::session::SessionController;

const PHRASE: &str = "The capital of France is Paris.";

/// Minimal valid PDF with one page showing `text`.
/// Body first, then the xref table with correct byte offsets.
fn minimal_pdf_with_text(text: &str) -> Vec<u8> {
    let content = format!("BT /F1 12 Tf 100 700 Td ({}) Tj ET", text);
    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");
    let o1 = out.len();
    out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");
    let o2 = out.len();
    out.extend_from_slice(b"2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj\n");
    let o3 = out.len();
    out.extend_from_slice(b"3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >> endobj\n");
    let o4 = out.len();
    out.extend_from_slice(
        format!(
            "4 0 obj << /Length {} >> stream\n{}\nendstream endobj\n",
            content.len(),
            content
        )
        .as_bytes(),
    );
    let o5 = out.len();
    out.extend_from_slice(
        b"5 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> endobj\n",
    );
    let xref_start = out.len();
    out.extend_from_slice(b"xref\n0 6\n");
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    for offset in [o1, o2, o3, o4, o5] {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(b"trailer << /Size 6 /Root 1 0 R >>\nstartxref\n");
    out.extend_from_slice(format!("{}\n", xref_start).as_bytes());
    out.extend_from_slice(b"%%EOF\n");
    out
}

fn zip_with(entries: &[(&str, String)]) -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
        for (name, body) in entries {
            zip.start_file(*name, zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }
    buf
}

fn minimal_docx(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p))
        .collect();
    zip_with(&[(
        "word/document.xml",
        format!(
            "<?xml version=\"1.0\"?><w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body>{}</w:body></w:document>",
            body
        ),
    )])
}

fn minimal_pptx(slides: &[&str]) -> Vec<u8> {
    let entries: Vec<(String, String)> = slides
        .iter()
        .enumerate()
        .map(|(i, text)| {
            (
                format!("ppt/slides/slide{}.xml", i + 1),
                format!(
                    "<p:sld xmlns:a=\"a\" xmlns:p=\"p\"><p:txBody><a:p><a:r><a:t>{}</a:t></a:r></a:p></p:txBody></p:sld>",
                    text
                ),
            )
        })
        .collect();
    let refs: Vec<(&str, String)> = entries
        .iter()
        .map(|(n, b)| (n.as_str(), b.clone()))
        .collect();
    zip_with(&refs)
}

/// Answers immediately without using tools.
struct Direct;

#[async_trait]
impl LanguageModel for Direct {
    fn model_name(&self) -> &str {
        "direct"
    }
    async fn complete(&self, _prompt: &str, _stop: &[&str]) -> Result<String, LlmError> {
        Ok("Final Answer: ok".to_string())
    }
}

fn controller() -> SessionController {
    SessionController::with_components(
        Config::default(),
        Arc::new(HashEmbedder::default()),
        Arc::new(Direct),
    )
}

fn write(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, bytes).unwrap();
    path
}

fn indexed_text(c: &SessionController) -> String {
    c.session()
        .unwrap()
        .index()
        .chunks()
        .map(|ch| ch.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

#[test]
fn pdf_fixture_extracts_phrase() {
    let doc = extract::load_bytes(minimal_pdf_with_text(PHRASE), MIME_PDF, u64::MAX).unwrap();
    assert_eq!(doc.pages.len(), 1);
    assert!(doc.pages[0].contains("Paris"), "{:?}", doc.pages);
}

#[tokio::test]
async fn pdf_document_is_indexed() {
    let tmp = TempDir::new().unwrap();
    let path = write(tmp.path(), "report.pdf", &minimal_pdf_with_text(PHRASE));

    let mut c = controller();
    c.setup_path(&path).await.unwrap();

    assert_eq!(c.session().unwrap().content_type(), MIME_PDF);
    assert!(indexed_text(&c).contains("capital of France"));
}

#[tokio::test]
async fn docx_document_is_indexed() {
    let tmp = TempDir::new().unwrap();
    let path = write(
        tmp.path(),
        "notes.docx",
        &minimal_docx(&["Geography notes", PHRASE]),
    );

    let mut c = controller();
    c.setup_path(&path).await.unwrap();

    assert_eq!(indexed_text(&c), format!("Geography notes\n{}", PHRASE));
}

#[tokio::test]
async fn pptx_slides_become_pages() {
    let tmp = TempDir::new().unwrap();
    let path = write(
        tmp.path(),
        "deck.pptx",
        &minimal_pptx(&["Agenda", "Capitals", PHRASE]),
    );

    let mut config = Config::default();
    config.chunking.chunk_size = 12;
    config.chunking.chunk_overlap = 2;
    let mut c = SessionController::with_components(
        config,
        Arc::new(HashEmbedder::default()),
        Arc::new(Direct),
    );
    c.setup_path(&path).await.unwrap();

    let session = c.session().unwrap();
    assert_eq!(session.content_type(), MIME_PPTX);
    let chunks: Vec<_> = session.index().chunks().collect();
    assert_eq!(chunks[0].page, 1);
    assert_eq!(chunks.last().unwrap().page, 3);
}

#[tokio::test]
async fn markdown_document_is_indexed() {
    let tmp = TempDir::new().unwrap();
    let path = write(
        tmp.path(),
        "README.md",
        format!("# Facts\n\n{}\n", PHRASE).as_bytes(),
    );

    let mut c = controller();
    c.setup_path(&path).await.unwrap();
    assert!(indexed_text(&c).contains(PHRASE));
}

#[tokio::test]
async fn corrupt_pdf_fails_setup() {
    let tmp = TempDir::new().unwrap();
    let path = write(tmp.path(), "broken.pdf", b"%PDF-1.4\nthis is not a pdf");

    let mut c = controller();
    let err = c.setup_path(&path).await.unwrap_err();
    assert!(matches!(err, SetupError::Load(LoadError::Pdf(_))), "{}", err);
    assert!(!c.is_active());
}

#[tokio::test]
async fn missing_file_fails_setup() {
    let tmp = TempDir::new().unwrap();
    let mut c = controller();
    let err = c
        .setup_path(&tmp.path().join("nope.txt"))
        .await
        .unwrap_err();
    assert!(matches!(err, SetupError::Load(LoadError::Io { .. })), "{}", err);
}

#[tokio::test]
async fn unknown_extension_fails_setup() {
    let tmp = TempDir::new().unwrap();
    let path = write(tmp.path(), "image.png", &[0x89, b'P', b'N', b'G']);
    let mut c = controller();
    let err = c.setup_path(&path).await.unwrap_err();
    assert!(
        matches!(err, SetupError::Load(LoadError::UnsupportedContentType(_))),
        "{}",
        err
    );
}

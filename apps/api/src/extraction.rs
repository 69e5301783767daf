//! Upload text extraction. PDF parsing is CPU-bound and runs on the blocking
//! pool; unreadable files degrade to empty text so the candidate still ranks.

use tracing::{debug, warn};

const PDF_MAGIC: &[u8] = b"%PDF";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentKind {
    Pdf,
    PlainText,
    Unsupported,
}

fn detect_kind(file_name: &str, content_type: Option<&str>, bytes: &[u8]) -> DocumentKind {
    let name = file_name.to_ascii_lowercase();
    let content_type = content_type.unwrap_or_default().to_ascii_lowercase();

    if content_type == "application/pdf" || name.ends_with(".pdf") || bytes.starts_with(PDF_MAGIC) {
        DocumentKind::Pdf
    } else if content_type.starts_with("text/") || name.ends_with(".txt") {
        DocumentKind::PlainText
    } else {
        DocumentKind::Unsupported
    }
}

/// Returns the raw text of an uploaded document, or `""` if nothing could be
/// read from it.
pub async fn extract_document_text(
    file_name: &str,
    content_type: Option<&str>,
    bytes: Vec<u8>,
) -> String {
    match detect_kind(file_name, content_type, &bytes) {
        DocumentKind::Pdf => extract_pdf(file_name, bytes).await,
        DocumentKind::PlainText => String::from_utf8_lossy(&bytes).into_owned(),
        DocumentKind::Unsupported => {
            warn!(
                file = file_name,
                content_type = content_type.unwrap_or("unknown"),
                "Unsupported document type, treating as empty"
            );
            String::new()
        }
    }
}

async fn extract_pdf(file_name: &str, bytes: Vec<u8>) -> String {
    let size = bytes.len();
    // pdf-extract can panic on malformed input; the join error covers that
    let result =
        tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes)).await;

    match result {
        Ok(Ok(text)) => {
            debug!(file = file_name, bytes = size, chars = text.len(), "Extracted PDF text");
            text
        }
        Ok(Err(e)) => {
            warn!(file = file_name, "PDF extraction failed: {e}");
            String::new()
        }
        Err(e) => {
            warn!(file = file_name, "PDF extraction aborted: {e}");
            String::new()
        }
    }
}

/// Candidate name for an upload: the file's basename.
pub fn candidate_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if base.is_empty() {
        "resume".to_string()
    } else {
        base.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_kind_by_content_type_name_and_magic() {
        assert_eq!(detect_kind("cv", Some("application/pdf"), b""), DocumentKind::Pdf);
        assert_eq!(detect_kind("CV.PDF", None, b""), DocumentKind::Pdf);
        assert_eq!(detect_kind("upload.bin", None, b"%PDF-1.7"), DocumentKind::Pdf);
        assert_eq!(detect_kind("cv.txt", None, b"hi"), DocumentKind::PlainText);
        assert_eq!(
            detect_kind("cv", Some("text/plain; charset=utf-8"), b"hi"),
            DocumentKind::PlainText
        );
        assert_eq!(detect_kind("cv.docx", None, b"PK"), DocumentKind::Unsupported);
    }

    #[tokio::test]
    async fn test_plain_text_is_decoded_lossily() {
        let text = extract_document_text("cv.txt", None, b"Python \xff developer".to_vec()).await;
        assert_eq!(text, "Python \u{fffd} developer");
    }

    #[tokio::test]
    async fn test_corrupt_pdf_degrades_to_empty_text() {
        let text = extract_document_text(
            "broken.pdf",
            Some("application/pdf"),
            b"%PDF-1.4 this is not really a pdf".to_vec(),
        )
        .await;
        assert_eq!(text, "");
    }

    #[tokio::test]
    async fn test_unsupported_type_is_empty() {
        let text = extract_document_text("photo.png", Some("image/png"), vec![0x89, 0x50]).await;
        assert_eq!(text, "");
    }

    #[test]
    fn test_candidate_name_is_basename() {
        assert_eq!(candidate_name("alice.pdf"), "alice.pdf");
        assert_eq!(candidate_name("uploads/2024/bob.pdf"), "bob.pdf");
        assert_eq!(candidate_name("C:\\Users\\carol\\cv.pdf"), "cv.pdf");
        assert_eq!(candidate_name(""), "resume");
        assert_eq!(candidate_name("dir/"), "resume");
    }
}

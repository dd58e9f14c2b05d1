//! Content-signature classification of downloaded files.
//!
//! Drive exports arrive with names that cannot be trusted: a document may have
//! no extension, the wrong one, or be an HTML login page saved as `.pdf`. The
//! classifier reads a small fixed prefix of the file and decides what it is
//! from the bytes alone.
//!
//! | Prefix | Result |
//! |--------|--------|
//! | `%PDF` | [`Signature::Pdf`] |
//! | `PK\x03\x04` (ZIP) | [`Signature::Docx`] |
//! | `<!doctype html` / `<html` (after whitespace, any case) | [`Signature::ErrorPage`] |
//! | anything else, empty, unreadable | [`Signature::Unknown`] |
//!
//! A ZIP is assumed to be a word-processor export. The one exception is a ZIP
//! whose first entry shows it is a spreadsheet (`xl/`) or presentation
//! (`ppt/`) package; those are `Unknown`.

use crate::types::DocumentKind;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Number of bytes read from the start of each file.
pub const SNIFF_LEN: usize = 512;

/// Maximum length of the decoded excerpt attached to an error page.
const SNIPPET_CHARS: usize = 120;

const PDF_MAGIC: &[u8] = b"%PDF";
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Offset of the file-name length field in a ZIP local file header.
const ZIP_NAME_LEN_OFFSET: usize = 26;
/// Offset of the file name in a ZIP local file header.
const ZIP_NAME_OFFSET: usize = 30;

/// Prefixes of non-word-processor OOXML packages.
const FOREIGN_OOXML_PREFIXES: &[&str] = &["xl/", "ppt/"];

/// What a file's leading bytes say it is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signature {
    Docx,
    Pdf,
    /// An HTML page where a document was expected, usually a sign-in or
    /// permission redirect. `snippet` is a short decoded excerpt.
    ErrorPage { snippet: String },
    Unknown,
}

impl Signature {
    /// Document kind for document signatures, `None` otherwise.
    pub fn kind(&self) -> Option<DocumentKind> {
        match self {
            Signature::Docx => Some(DocumentKind::Docx),
            Signature::Pdf => Some(DocumentKind::Pdf),
            Signature::ErrorPage { .. } | Signature::Unknown => None,
        }
    }
}

/// Classify a file by its first [`SNIFF_LEN`] bytes.
///
/// I/O failures yield [`Signature::Unknown`]; a file that cannot be read is
/// skipped, not fatal.
pub fn sniff_file(path: &Path) -> Signature {
    match read_prefix(path) {
        Ok(prefix) => sniff_bytes(&prefix),
        Err(err) => {
            tracing::debug!(path = %path.display(), error = %err, "unreadable, treating as unknown");
            Signature::Unknown
        }
    }
}

/// Classify a byte prefix.
pub fn sniff_bytes(prefix: &[u8]) -> Signature {
    if prefix.starts_with(PDF_MAGIC) {
        return Signature::Pdf;
    }
    if prefix.starts_with(ZIP_MAGIC) {
        return if is_foreign_ooxml(prefix) {
            Signature::Unknown
        } else {
            Signature::Docx
        };
    }
    if looks_like_html(prefix) {
        return Signature::ErrorPage {
            snippet: snippet(prefix),
        };
    }
    Signature::Unknown
}

fn read_prefix(path: &Path) -> std::io::Result<Vec<u8>> {
    let file = File::open(path)?;
    let mut prefix = Vec::with_capacity(SNIFF_LEN);
    file.take(SNIFF_LEN as u64).read_to_end(&mut prefix)?;
    Ok(prefix)
}

fn looks_like_html(prefix: &[u8]) -> bool {
    let body = prefix.strip_prefix(UTF8_BOM).unwrap_or(prefix);
    let start = body
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(body.len());
    let body = &body[start..];
    starts_with_ignore_case(body, b"<!doctype html") || starts_with_ignore_case(body, b"<html")
}

fn starts_with_ignore_case(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.len() >= needle.len() && haystack[..needle.len()].eq_ignore_ascii_case(needle)
}

/// Name of the first entry in a ZIP local file header, if it fits in the prefix.
fn first_zip_entry(prefix: &[u8]) -> Option<&str> {
    let len_bytes = prefix.get(ZIP_NAME_LEN_OFFSET..ZIP_NAME_LEN_OFFSET + 2)?;
    let name_len = u16::from_le_bytes([len_bytes[0], len_bytes[1]]) as usize;
    let name = prefix.get(ZIP_NAME_OFFSET..ZIP_NAME_OFFSET + name_len)?;
    std::str::from_utf8(name).ok()
}

fn is_foreign_ooxml(prefix: &[u8]) -> bool {
    first_zip_entry(prefix)
        .map(|name| FOREIGN_OOXML_PREFIXES.iter().any(|p| name.starts_with(p)))
        .unwrap_or(false)
}

/// Short whitespace-collapsed excerpt of an HTML prefix for error messages.
fn snippet(prefix: &[u8]) -> String {
    let text = String::from_utf8_lossy(prefix);
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut out: String = collapsed.chars().take(SNIPPET_CHARS).collect();
    if collapsed.chars().count() > SNIPPET_CHARS {
        out.push('…');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{docx_bytes, html_error_bytes, pdf_bytes, zip_with_first_entry};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn pdf_magic() {
        assert_eq!(sniff_bytes(&pdf_bytes()), Signature::Pdf);
    }

    #[test]
    fn zip_magic_is_docx() {
        assert_eq!(sniff_bytes(&docx_bytes()), Signature::Docx);
    }

    #[test]
    fn bare_zip_magic_is_docx() {
        assert_eq!(sniff_bytes(b"PK\x03\x04"), Signature::Docx);
    }

    #[test]
    fn spreadsheet_zip_is_unknown() {
        let bytes = zip_with_first_entry("xl/workbook.xml");
        assert_eq!(sniff_bytes(&bytes), Signature::Unknown);
    }

    #[test]
    fn presentation_zip_is_unknown() {
        let bytes = zip_with_first_entry("ppt/presentation.xml");
        assert_eq!(sniff_bytes(&bytes), Signature::Unknown);
    }

    #[test]
    fn word_zip_with_content_types_first_is_docx() {
        let bytes = zip_with_first_entry("[Content_Types].xml");
        assert_eq!(sniff_bytes(&bytes), Signature::Docx);
    }

    #[test]
    fn html_doctype_is_error_page() {
        let sig = sniff_bytes(&html_error_bytes());
        assert!(matches!(sig, Signature::ErrorPage { .. }));
    }

    #[test]
    fn html_tag_with_whitespace_and_case() {
        let sig = sniff_bytes(b"\n\n   <HTML lang=\"en\"><head>");
        assert!(matches!(sig, Signature::ErrorPage { .. }));
    }

    #[test]
    fn html_after_bom() {
        let sig = sniff_bytes(b"\xEF\xBB\xBF<!DOCTYPE html><html>");
        assert!(matches!(sig, Signature::ErrorPage { .. }));
    }

    #[test]
    fn error_page_snippet_is_collapsed_and_bounded() {
        let mut bytes = b"<!doctype html>\n\n<title>Sign in</title>".to_vec();
        bytes.extend(std::iter::repeat_n(b'x', 400));
        let Signature::ErrorPage { snippet } = sniff_bytes(&bytes) else {
            panic!("expected error page");
        };
        assert!(snippet.starts_with("<!doctype html> <title>Sign in</title>"));
        assert!(snippet.chars().count() <= SNIPPET_CHARS + 1);
        assert!(snippet.ends_with('…'));
    }

    #[test]
    fn other_xml_is_unknown() {
        assert_eq!(sniff_bytes(b"<?xml version=\"1.0\"?>"), Signature::Unknown);
    }

    #[test]
    fn empty_is_unknown() {
        assert_eq!(sniff_bytes(b""), Signature::Unknown);
    }

    #[test]
    fn plain_text_is_unknown() {
        assert_eq!(sniff_bytes(b"just some notes"), Signature::Unknown);
    }

    #[test]
    fn missing_file_is_unknown() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(sniff_file(&tmp.path().join("nope")), Signature::Unknown);
    }

    #[test]
    fn extension_is_ignored() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("report.docx");
        fs::write(&path, pdf_bytes()).unwrap();
        assert_eq!(sniff_file(&path), Signature::Pdf);
    }

    #[test]
    fn only_prefix_is_read() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("big");
        let mut bytes = pdf_bytes();
        bytes.resize(SNIFF_LEN * 8, b'0');
        fs::write(&path, &bytes).unwrap();
        assert_eq!(read_prefix(&path).unwrap().len(), SNIFF_LEN);
    }

    #[test]
    fn signature_kind_mapping() {
        assert_eq!(Signature::Pdf.kind(), Some(DocumentKind::Pdf));
        assert_eq!(Signature::Docx.kind(), Some(DocumentKind::Docx));
        assert_eq!(Signature::Unknown.kind(), None);
        assert_eq!(
            Signature::ErrorPage {
                snippet: String::new()
            }
            .kind(),
            None
        );
    }
}

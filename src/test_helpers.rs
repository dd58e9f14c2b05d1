//! Shared test utilities for the drive-notes test suite.
//!
//! Byte builders for each signature the classifier recognizes, a tree writer
//! for laying out downloaded folders in a temp dir, and entry lookups that
//! panic with the available names on a miss.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = write_tree(&[
//!     ("A.txt", pdf_bytes()),
//!     ("sub/B", docx_bytes()),
//! ]);
//! let report = normalize(tmp.path(), &IngestConfig::default()).unwrap();
//! assert_eq!(renamed_to(&report), vec!["A.pdf", "sub/B.docx"]);
//! ```

use std::fs;
use std::path::Path;
use tempfile::TempDir;

use crate::normalize::NormalizeReport;
use crate::types::{Entry, to_slash};

// =========================================================================
// Signature fixtures
// =========================================================================

/// Minimal PDF header followed by some body bytes.
pub fn pdf_bytes() -> Vec<u8> {
    b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n1 0 obj\n<< /Type /Catalog >>\nendobj\n".to_vec()
}

/// ZIP local file header whose first entry is a word-processor part.
pub fn docx_bytes() -> Vec<u8> {
    zip_with_first_entry("[Content_Types].xml")
}

/// An HTML sign-in page such as Drive returns for a private file.
pub fn html_error_bytes() -> Vec<u8> {
    b"<!DOCTYPE html><html><head><title>Google Drive - Sign in</title></head><body>You need access</body></html>"
        .to_vec()
}

/// A ZIP local file header with the given first entry name.
pub fn zip_with_first_entry(name: &str) -> Vec<u8> {
    let mut bytes = b"PK\x03\x04".to_vec();
    bytes.extend_from_slice(&[20, 0]); // version needed
    bytes.extend_from_slice(&[0, 0]); // flags
    bytes.extend_from_slice(&[8, 0]); // deflate
    bytes.extend_from_slice(&[0; 4]); // mtime + mdate
    bytes.extend_from_slice(&[0; 12]); // crc + sizes
    bytes.extend_from_slice(&(name.len() as u16).to_le_bytes());
    bytes.extend_from_slice(&[0, 0]); // extra length
    bytes.extend_from_slice(name.as_bytes());
    bytes.extend_from_slice(b"\x00\x01\x02\x03");
    bytes
}

// =========================================================================
// Tree setup
// =========================================================================

/// Create a temp dir containing the given `(relative path, bytes)` files.
pub fn write_tree(files: &[(&str, Vec<u8>)]) -> TempDir {
    let tmp = TempDir::new().unwrap();
    write_files(tmp.path(), files);
    tmp
}

/// Write `(relative path, bytes)` files under `root`, creating parents.
pub fn write_files(root: &Path, files: &[(&str, Vec<u8>)]) {
    for (rel, bytes) in files {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, bytes).unwrap();
    }
}

/// All regular files under `root`, relative, `/`-separated, sorted.
pub fn list_files(root: &Path) -> Vec<String> {
    let mut files: Vec<String> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| to_slash(e.path().strip_prefix(root).unwrap()))
        .collect();
    files.sort();
    files
}

// =========================================================================
// Report and entry lookups
// =========================================================================

/// Rename targets in report order, relative and `/`-separated.
pub fn renamed_to(report: &NormalizeReport) -> Vec<String> {
    report.renames.iter().map(|r| to_slash(&r.to)).collect()
}

/// Resolved stems in entry order.
pub fn stems(entries: &[Entry]) -> Vec<&str> {
    entries.iter().map(|e| e.rel_stem()).collect()
}

/// Titles in entry order.
pub fn titles(entries: &[Entry]) -> Vec<&str> {
    entries.iter().map(|e| e.title()).collect()
}

/// Find an entry by title. Panics if not found.
pub fn find_entry<'a>(entries: &'a [Entry], title: &str) -> &'a Entry {
    entries
        .iter()
        .find(|e| e.title() == title)
        .unwrap_or_else(|| panic!("entry '{title}' not found. Available: {:?}", titles(entries)))
}

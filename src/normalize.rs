//! Ingestion normalization.
//!
//! Walks the downloaded folder and makes every file's extension tell the
//! truth. Each regular file is visited in case-insensitive full-path order so
//! renames come out the same on every run and platform:
//!
//! 1. Shortcut/companion stubs (`.lnk`, `.gdoc`, …) are skipped unread.
//! 2. The file is classified by [`sniff_file`].
//! 3. HTML error pages are collected; the scan keeps going.
//! 4. Unknown files are skipped.
//! 5. Documents whose extension already matches are left alone.
//! 6. Anything else is renamed to the matching extension, choosing
//!    `name.ext`, `name-1.ext`, `name-2.ext`, … whichever is free first.
//!
//! If any error pages were found the whole step fails once, after the scan,
//! with a message listing the first few offenders. One sharing
//! misconfiguration usually shows up as many broken files, so they are
//! reported together.
//!
//! The result is a [`VerifiedTree`]: every path in it has a `.docx`/`.pdf`
//! extension that matches its bytes.

use crate::config::IngestConfig;
use crate::sniff::{Signature, sniff_file};
use crate::types::{DocumentKind, to_slash};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot walk source directory: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("source directory does not exist: {0}")]
    MissingRoot(PathBuf),
    #[error("{message}")]
    ErrorPages { files: Vec<PathBuf>, message: String },
    #[error("no free name for {path} after {attempts} numbered attempts")]
    UniquePathExhausted { path: PathBuf, attempts: usize },
    #[error(
        "no DOCX/PDF documents found in {0}. Check that source.folder_url (or GDRIVE_FOLDER_URL) \
         points at a folder shared as \"Anyone with the link\" that contains Word or PDF files"
    )]
    NoDocuments(PathBuf),
}

/// A document file whose extension matches its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedDocument {
    /// Path relative to the tree root.
    pub path: PathBuf,
    pub kind: DocumentKind,
}

/// The verified document set handed to the entry resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedTree {
    pub root: PathBuf,
    /// Documents in case-insensitive full-path visit order.
    pub documents: Vec<VerifiedDocument>,
}

/// A rename performed to correct an extension. Paths are relative to the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rename {
    pub from: PathBuf,
    pub to: PathBuf,
    pub kind: DocumentKind,
}

/// Everything the normalizer did, relative to the root.
#[derive(Debug, Clone)]
pub struct NormalizeReport {
    pub renames: Vec<Rename>,
    pub unchanged: Vec<PathBuf>,
    pub stubs: Vec<PathBuf>,
    pub unknown: Vec<PathBuf>,
    pub tree: VerifiedTree,
}

/// An HTML page found where a document was expected.
#[derive(Debug, Clone)]
struct ErrorPage {
    path: PathBuf,
    snippet: String,
}

/// Classify and rename every file under `root`.
pub fn normalize(root: &Path, config: &IngestConfig) -> Result<NormalizeReport, NormalizeError> {
    if !root.is_dir() {
        return Err(NormalizeError::MissingRoot(root.to_path_buf()));
    }

    let mut renames = Vec::new();
    let mut unchanged = Vec::new();
    let mut stubs = Vec::new();
    let mut unknown = Vec::new();
    let mut documents = Vec::new();
    let mut error_pages = Vec::new();

    for path in collect_files(root)? {
        let rel = relative(root, &path);

        if config.is_stub(&path) {
            tracing::debug!(file = %to_slash(&rel), "skipping stub");
            stubs.push(rel);
            continue;
        }

        let kind = match sniff_file(&path) {
            Signature::Pdf => DocumentKind::Pdf,
            Signature::Docx => DocumentKind::Docx,
            Signature::ErrorPage { snippet } => {
                tracing::warn!(file = %to_slash(&rel), "HTML page instead of a document");
                error_pages.push(ErrorPage { path: rel, snippet });
                continue;
            }
            Signature::Unknown => {
                if DocumentKind::from_extension(&path).is_some() {
                    tracing::warn!(
                        file = %to_slash(&rel),
                        "document extension but unrecognized content, excluding"
                    );
                } else {
                    tracing::debug!(file = %to_slash(&rel), "unrecognized content, skipping");
                }
                unknown.push(rel);
                continue;
            }
        };

        if has_extension(&path, kind) {
            unchanged.push(rel.clone());
            documents.push(VerifiedDocument { path: rel, kind });
            continue;
        }

        let target = unique_path(&path, kind, config.unique_path_attempts)?;
        fs::rename(&path, &target)?;
        let to = relative(root, &target);
        tracing::info!(from = %to_slash(&rel), to = %to_slash(&to), "renamed to match content");
        documents.push(VerifiedDocument {
            path: to.clone(),
            kind,
        });
        renames.push(Rename { from: rel, to, kind });
    }

    if !error_pages.is_empty() {
        let message = error_page_message(&error_pages, config.max_error_pages);
        return Err(NormalizeError::ErrorPages {
            files: error_pages.into_iter().map(|p| p.path).collect(),
            message,
        });
    }

    Ok(NormalizeReport {
        renames,
        unchanged,
        stubs,
        unknown,
        tree: VerifiedTree {
            root: root.to_path_buf(),
            documents,
        },
    })
}

/// Fail unless normalization left at least one document behind.
///
/// Guards against a folder that exists but is empty or misconfigured quietly
/// producing an empty site.
pub fn assert_has_documents(report: &NormalizeReport) -> Result<(), NormalizeError> {
    if report.tree.documents.is_empty() {
        return Err(NormalizeError::NoDocuments(report.tree.root.clone()));
    }
    Ok(())
}

/// Regular files under `root` in case-insensitive full-path order.
pub(crate) fn collect_files(root: &Path) -> Result<Vec<PathBuf>, NormalizeError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    // Raw path breaks ties between names that differ only in case.
    files.sort_by_cached_key(|p| (p.to_string_lossy().to_lowercase(), p.clone()));
    Ok(files)
}

fn relative(root: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(root).unwrap_or(path).to_path_buf()
}

fn has_extension(path: &Path, kind: DocumentKind) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(kind.extension()))
        .unwrap_or(false)
}

/// Whether an extension looks like a real one rather than part of a title
/// (`"Lecture 3.1 Notes"` has extension `"1 Notes"`).
fn is_real_extension(ext: &str) -> bool {
    (1..=5).contains(&ext.len()) && ext.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// File name without its extension, if the extension is a real one.
fn base_name(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if is_real_extension(ext) => name[..name.len() - ext.len() - 1].to_string(),
        _ => name,
    }
}

/// First free sibling path for `path` with the extension of `kind`.
fn unique_path(path: &Path, kind: DocumentKind, attempts: usize) -> Result<PathBuf, NormalizeError> {
    let dir = path.parent().unwrap_or_else(|| Path::new(""));
    let base = base_name(path);
    let ext = kind.extension();

    let first = dir.join(format!("{base}.{ext}"));
    if !first.exists() {
        return Ok(first);
    }
    for n in 1..=attempts {
        let candidate = dir.join(format!("{base}-{n}.{ext}"));
        if !candidate.exists() {
            return Ok(candidate);
        }
    }
    Err(NormalizeError::UniquePathExhausted {
        path: path.to_path_buf(),
        attempts,
    })
}

fn error_page_message(pages: &[ErrorPage], max_listed: usize) -> String {
    let mut message = format!(
        "Drive returned an HTML page instead of a document for {} file(s). \
         The folder or these files are probably not shared as \"Anyone with the link\"; \
         fix the sharing settings and sync again.",
        pages.len()
    );
    for page in pages.iter().take(max_listed) {
        message.push_str(&format!("\n  - {}: {}", to_slash(&page.path), page.snippet));
    }
    if pages.len() > max_listed {
        message.push_str(&format!("\n  ... and {} more", pages.len() - max_listed));
    }
    message
}

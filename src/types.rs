//! Shared types passed between the ingestion, resolution and build stages.
//!
//! [`Entry`] is built once by the resolver and never mutated afterwards; every
//! field is private and exposed through accessors. [`EntrySummary`] is its
//! serialized form as it appears in the build manifest and failure artifact.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::{Component, Path, PathBuf};

/// The two document kinds the site is built from.
///
/// Files the classifier cannot identify never become entries, so there is no
/// `Unknown` variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Docx,
    Pdf,
}

impl DocumentKind {
    /// Canonical lowercase extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            DocumentKind::Docx => "docx",
            DocumentKind::Pdf => "pdf",
        }
    }

    /// Upper-case label used on download links.
    pub fn label(self) -> &'static str {
        match self {
            DocumentKind::Docx => "DOCX",
            DocumentKind::Pdf => "PDF",
        }
    }

    /// Kind implied by a path's extension (ASCII case-insensitive).
    ///
    /// Only trustworthy after normalization has run over the tree.
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        if ext.eq_ignore_ascii_case("docx") {
            Some(DocumentKind::Docx)
        } else if ext.eq_ignore_ascii_case("pdf") {
            Some(DocumentKind::Pdf)
        } else {
            None
        }
    }
}

/// Human ordering of entries within one output directory.
///
/// Titles with a leading number come first, ordered numerically; the rest
/// follow, ordered by case-folded title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    /// Leading 1–4 digit number of the title, if any.
    pub number: Option<u32>,
    /// Case-folded title.
    pub title: String,
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        let by_number = match (self.number, other.number) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_number.then_with(|| self.title.cmp(&other.title))
    }
}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// One logical document slated for a page plus a downloadable copy.
///
/// Output paths are relative to the output root (e.g. `docs/`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    kind: DocumentKind,
    title: String,
    rel_dir: PathBuf,
    rel_stem: String,
    src: PathBuf,
    out_html: PathBuf,
    out_file: PathBuf,
    sort_key: SortKey,
}

impl Entry {
    pub(crate) fn new(
        kind: DocumentKind,
        title: String,
        rel_dir: PathBuf,
        rel_stem: String,
        src: PathBuf,
        sort_key: SortKey,
    ) -> Self {
        let (out_html, out_file) = output_paths(kind, &rel_dir, &rel_stem);
        Self {
            kind,
            title,
            rel_dir,
            rel_stem,
            src,
            out_html,
            out_file,
            sort_key,
        }
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn rel_dir(&self) -> &Path {
        &self.rel_dir
    }

    pub fn rel_stem(&self) -> &str {
        &self.rel_stem
    }

    pub fn src(&self) -> &Path {
        &self.src
    }

    pub fn out_html(&self) -> &Path {
        &self.out_html
    }

    pub fn out_file(&self) -> &Path {
        &self.out_file
    }

    pub fn sort_key(&self) -> &SortKey {
        &self.sort_key
    }

    /// Directory receiving the images extracted from this entry.
    pub fn assets_dir(&self) -> PathBuf {
        Path::new(ASSETS_DIR).join(&self.rel_dir).join(&self.rel_stem)
    }

    /// Group label used by the index: the slugged directory, or `None` at the root.
    pub fn group(&self) -> Option<String> {
        let dir = to_slash(&self.rel_dir);
        if dir.is_empty() { None } else { Some(dir) }
    }

    pub fn summary(&self) -> EntrySummary {
        EntrySummary::from(self)
    }
}

pub const NOTES_DIR: &str = "notes";
pub const DOWNLOADS_DIR: &str = "downloads";
pub const ASSETS_DIR: &str = "assets";

fn output_paths(kind: DocumentKind, rel_dir: &Path, stem: &str) -> (PathBuf, PathBuf) {
    let notes = Path::new(NOTES_DIR).join(rel_dir);
    let downloads = Path::new(DOWNLOADS_DIR).join(rel_dir);
    match kind {
        DocumentKind::Docx => (
            notes.join(format!("{stem}.html")),
            downloads.join(format!("{stem}.docx")),
        ),
        DocumentKind::Pdf => (
            notes.join(format!("{stem}.pdf.html")),
            downloads.join(format!("{stem}.pdf")),
        ),
    }
}

/// Serialized form of an [`Entry`]: every attribute, paths as `/`-separated strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntrySummary {
    pub kind: DocumentKind,
    pub title: String,
    pub rel_dir: String,
    pub rel_stem: String,
    pub src: String,
    pub out_html: String,
    pub out_file: String,
    pub sort_key: SortKey,
}

impl From<&Entry> for EntrySummary {
    fn from(entry: &Entry) -> Self {
        Self {
            kind: entry.kind,
            title: entry.title.clone(),
            rel_dir: to_slash(&entry.rel_dir),
            rel_stem: entry.rel_stem.clone(),
            src: to_slash(&entry.src),
            out_html: to_slash(&entry.out_html),
            out_file: to_slash(&entry.out_file),
            sort_key: entry.sort_key.clone(),
        }
    }
}

/// Render a path with `/` separators regardless of platform.
///
/// `.` components are dropped, so an empty relative directory renders as `""`.
pub fn to_slash(path: &Path) -> String {
    let mut parts: Vec<String> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::RootDir => parts.push(String::new()),
            other => parts.push(other.as_os_str().to_string_lossy().into_owned()),
        }
    }
    if parts.len() == 1 && parts[0].is_empty() {
        return "/".to_string();
    }
    parts.join("/")
}

/// Relative `/`-separated href from a page to a target, both relative to the
/// output root.
///
/// ```text
/// notes/a/x.html → downloads/a/x.docx   ⇒  ../../downloads/a/x.docx
/// notes/x.html   → index.html           ⇒  ../index.html
/// ```
pub fn relative_href(from_page: &Path, to: &Path) -> String {
    let from_dir: Vec<_> = from_page
        .parent()
        .map(|p| p.components().filter(|c| !matches!(c, Component::CurDir)).collect())
        .unwrap_or_default();
    let target: Vec<_> = to
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();

    let common = from_dir
        .iter()
        .zip(target.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<String> = Vec::new();
    for _ in common..from_dir.len() {
        parts.push("..".to_string());
    }
    for component in &target[common..] {
        parts.push(component.as_os_str().to_string_lossy().into_owned());
    }
    parts.join("/")
}

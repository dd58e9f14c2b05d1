//! Entry resolution.
//!
//! Turns the verified document tree into the ordered list of [`Entry`] values
//! the rest of the build works from. Resolution is pure: it reads nothing but
//! the [`VerifiedTree`] and never touches the filesystem, so the same tree
//! always resolves to the same entries.
//!
//! ## Output paths
//!
//! ```text
//! content/drive/Week 1/03_Lecture.docx   →  notes/week-1/03-lecture.html
//!                                           downloads/week-1/03-lecture.docx
//! content/drive/Syllabus.pdf             →  notes/syllabus.pdf.html
//!                                           downloads/syllabus.pdf
//! ```
//!
//! ## Collisions
//!
//! Slugs are lossy, so distinct source names can land on the same slug
//! (`Note.docx` and `note!!.docx` are both `note`). The first one seen, in
//! case-insensitive path order, keeps the plain slug; later ones get `-1`,
//! `-2`, … The same applies to sibling directories. Running out of numbered
//! candidates is an error rather than a silent overwrite.
//!
//! The stem `index` is taken in the root output directory before any document
//! is seen, since `notes/index.html` and `downloads/index.html` are the
//! generated listings. A root-level `Index.docx` becomes `index-1`.
//!
//! ## Ordering
//!
//! Entries are ordered by output directory, then by [`SortKey`]
//! (leading number, then case-folded title), then by stem.

use crate::naming::{slugify, sort_key, title_from_stem};
use crate::normalize::VerifiedTree;
use crate::types::{DocumentKind, Entry, SortKey, to_slash};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("no free slug for '{stem}' in '{dir}' after {attempts} numbered attempts")]
    StemCollision {
        dir: String,
        stem: String,
        attempts: usize,
    },
    #[error("no free slug for directory '{name}' in '{parent}' after {attempts} numbered attempts")]
    DirectoryCollision {
        parent: String,
        name: String,
        attempts: usize,
    },
}

/// Stem of the generated index pages in the root output directory.
const RESERVED_ROOT_STEM: &str = "index";

/// Hands out slugs that are unique within a scope (an output directory).
struct SlugAllocator {
    used: HashMap<PathBuf, HashSet<String>>,
    attempts: usize,
}

impl SlugAllocator {
    fn new(attempts: usize) -> Self {
        Self {
            used: HashMap::new(),
            attempts,
        }
    }

    /// Mark `name` as taken in `scope` without handing it out.
    fn reserve(&mut self, scope: &Path, name: &str) {
        self.used
            .entry(scope.to_path_buf())
            .or_default()
            .insert(name.to_string());
    }

    /// Claim `desired` in `scope`, or the first free `desired-N`.
    fn claim(&mut self, scope: &Path, desired: &str) -> Option<String> {
        let used = self.used.entry(scope.to_path_buf()).or_default();
        if used.insert(desired.to_string()) {
            return Some(desired.to_string());
        }
        (1..=self.attempts)
            .map(|n| format!("{desired}-{n}"))
            .find(|candidate| used.insert(candidate.clone()))
    }
}

/// Maps source directories to their slugged output directories.
struct DirectoryMap {
    resolved: HashMap<PathBuf, PathBuf>,
    slugs: SlugAllocator,
}

impl DirectoryMap {
    fn new(attempts: usize) -> Self {
        Self {
            resolved: HashMap::new(),
            slugs: SlugAllocator::new(attempts),
        }
    }

    /// Output directory for a source directory, slugging each new component.
    fn resolve(&mut self, source_dir: &Path) -> Result<PathBuf, ResolveError> {
        let mut source = PathBuf::new();
        let mut output = PathBuf::new();
        for component in source_dir.components() {
            let name = component.as_os_str().to_string_lossy();
            source.push(component);
            if let Some(known) = self.resolved.get(&source) {
                output = known.clone();
                continue;
            }
            let slug = self.slugs.claim(&output, &slugify(&name)).ok_or_else(|| {
                ResolveError::DirectoryCollision {
                    parent: to_slash(&output),
                    name: name.to_string(),
                    attempts: self.slugs.attempts,
                }
            })?;
            output.push(slug);
            self.resolved.insert(source.clone(), output.clone());
        }
        Ok(output)
    }
}

/// Resolve the verified tree into ordered entries.
///
/// `attempts` bounds the numbered candidates tried per colliding slug.
pub fn resolve(tree: &VerifiedTree, attempts: usize) -> Result<Vec<Entry>, ResolveError> {
    let mut dirs = DirectoryMap::new(attempts);
    let mut stems = SlugAllocator::new(attempts);
    stems.reserve(Path::new(""), RESERVED_ROOT_STEM);
    let mut entries = Vec::with_capacity(tree.documents.len());

    for document in &tree.documents {
        let Some(kind) = DocumentKind::from_extension(&document.path) else {
            continue;
        };

        let source_dir = document.path.parent().unwrap_or_else(|| Path::new(""));
        let rel_dir = dirs.resolve(source_dir)?;

        let raw_stem = document
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let desired = slugify(&raw_stem);
        let rel_stem =
            stems
                .claim(&rel_dir, &desired)
                .ok_or_else(|| ResolveError::StemCollision {
                    dir: to_slash(&rel_dir),
                    stem: desired.clone(),
                    attempts,
                })?;

        let title = title_from_stem(&raw_stem);
        let key: SortKey = sort_key(&title);
        tracing::debug!(
            source = %to_slash(&document.path),
            dir = %to_slash(&rel_dir),
            stem = %rel_stem,
            "resolved entry"
        );
        entries.push(Entry::new(
            kind,
            title,
            rel_dir,
            rel_stem,
            tree.root.join(&document.path),
            key,
        ));
    }

    entries.sort_by_cached_key(|e| {
        (
            to_slash(e.rel_dir()).to_lowercase(),
            e.sort_key().clone(),
            e.rel_stem().to_string(),
        )
    });
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::VerifiedDocument;
    use crate::test_helpers::{find_entry, stems, titles};

    fn tree(paths: &[&str]) -> VerifiedTree {
        VerifiedTree {
            root: PathBuf::from("content/drive"),
            documents: paths
                .iter()
                .map(|p| VerifiedDocument {
                    path: PathBuf::from(p),
                    kind: DocumentKind::from_extension(Path::new(p))
                        .unwrap_or(DocumentKind::Docx),
                })
                .collect(),
        }
    }

    #[test]
    fn colliding_stems_get_numeric_suffix_in_visit_order() {
        let entries = resolve(&tree(&["note!!.docx", "Note.docx"]), 100).unwrap();
        assert_eq!(find_entry(&entries, "note!!").rel_stem(), "note");
        assert_eq!(find_entry(&entries, "Note").rel_stem(), "note-1");
    }

    #[test]
    fn resolution_is_deterministic() {
        let input = tree(&["a/X.docx", "a/x!.pdf", "a/x .docx", "b/x.docx"]);
        let first = resolve(&input, 100).unwrap();
        let second = resolve(&input, 100).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn same_stem_different_kinds_still_distinct() {
        let entries = resolve(&tree(&["Plan.docx", "Plan.pdf"]), 100).unwrap();
        let mut s = stems(&entries);
        s.sort();
        assert_eq!(s, vec!["plan", "plan-1"]);
    }

    #[test]
    fn root_index_stem_never_takes_the_listing_path() {
        let entries = resolve(&tree(&["Index.docx", "index!.pdf"]), 100).unwrap();
        let doc = find_entry(&entries, "Index");
        assert_eq!(doc.rel_stem(), "index-1");
        assert_eq!(to_slash(doc.out_html()), "notes/index-1.html");
        assert_eq!(find_entry(&entries, "index!").rel_stem(), "index-2");
    }

    #[test]
    fn index_stem_below_the_root_is_kept() {
        let entries = resolve(&tree(&["Week 1/Index.docx"]), 100).unwrap();
        assert_eq!(to_slash(entries[0].out_html()), "notes/week-1/index.html");
    }

    #[test]
    fn same_stem_in_different_directories_is_not_a_collision() {
        let entries = resolve(&tree(&["a/Note.docx", "b/Note.docx"]), 100).unwrap();
        assert_eq!(stems(&entries), vec!["note", "note"]);
    }

    #[test]
    fn suffix_skips_names_already_taken() {
        // Normalizer visit order: '!' < '-' < '.'
        let entries = resolve(&tree(&["Note!.docx", "note-1.docx", "note.docx"]), 100).unwrap();
        let note_bang = find_entry(&entries, "Note!");
        let note_one = find_entry(&entries, "note 1");
        let note = find_entry(&entries, "note");
        assert_eq!(note_bang.rel_stem(), "note");
        assert_eq!(note_one.rel_stem(), "note-1");
        assert_eq!(note.rel_stem(), "note-2");
    }

    #[test]
    fn exhausted_stems_are_an_error() {
        let err = resolve(&tree(&["a.docx", "a!.docx", "a!!.docx"]), 1).unwrap_err();
        assert!(matches!(err, ResolveError::StemCollision { attempts: 1, .. }));
    }

    #[test]
    fn directories_are_slugged_per_component() {
        let entries = resolve(&tree(&["Week 1/Ödevler/Lab 2.docx"]), 100).unwrap();
        assert_eq!(to_slash(entries[0].rel_dir()), "week-1/devler");
        assert_eq!(
            to_slash(entries[0].out_html()),
            "notes/week-1/devler/lab-2.html"
        );
    }

    #[test]
    fn sibling_directories_with_same_slug_are_disambiguated() {
        let entries = resolve(&tree(&["Week 1/a.docx", "week-1/b.docx"]), 100).unwrap();
        assert_eq!(to_slash(find_entry(&entries, "a").rel_dir()), "week-1");
        assert_eq!(to_slash(find_entry(&entries, "b").rel_dir()), "week-1-1");
    }

    #[test]
    fn files_in_same_source_dir_share_output_dir() {
        let entries = resolve(&tree(&["Week 1/a.docx", "Week 1/b.pdf"]), 100).unwrap();
        assert!(entries.iter().all(|e| to_slash(e.rel_dir()) == "week-1"));
    }

    #[test]
    fn unslugable_names_fall_back() {
        let entries = resolve(&tree(&["çç/ğğ.pdf"]), 100).unwrap();
        assert_eq!(to_slash(entries[0].rel_dir()), "item");
        assert_eq!(entries[0].rel_stem(), "item");
        assert_eq!(entries[0].title(), "ğğ");
    }

    #[test]
    fn titles_come_from_stems() {
        let entries = resolve(&tree(&["03_Lecture-Notes.docx"]), 100).unwrap();
        assert_eq!(entries[0].title(), "03 Lecture Notes");
        assert_eq!(entries[0].sort_key().number, Some(3));
    }

    #[test]
    fn entries_ordered_by_number_then_title() {
        let entries = resolve(
            &tree(&["10 Giriş.docx", "2 Giriş.docx", "Appendix.pdf", "1 Start.docx"]),
            100,
        )
        .unwrap();
        assert_eq!(
            titles(&entries),
            vec!["1 Start", "2 Giriş", "10 Giriş", "Appendix"]
        );
    }

    #[test]
    fn entries_ordered_by_directory_first() {
        let entries = resolve(&tree(&["b/1 x.docx", "A/9 y.docx", "0 root.docx"]), 100).unwrap();
        let dirs: Vec<String> = entries.iter().map(|e| to_slash(e.rel_dir())).collect();
        assert_eq!(dirs, vec!["", "a", "b"]);
    }

    #[test]
    fn non_document_extensions_are_ignored() {
        let entries = resolve(&tree(&["a.docx", "b.txt"]), 100).unwrap();
        assert_eq!(titles(&entries), vec!["a"]);
    }

    #[test]
    fn source_path_is_joined_to_root() {
        let entries = resolve(&tree(&["sub/B.docx"]), 100).unwrap();
        assert_eq!(to_slash(entries[0].src()), "content/drive/sub/B.docx");
        assert_eq!(entries[0].kind(), DocumentKind::Docx);
    }
}

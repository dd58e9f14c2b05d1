//! CLI output formatting for all pipeline stages.
//!
//! Output is an inventory of content, not of files: each entry is shown by
//! position and title, with filesystem paths as indented context lines.
//!
//! # Output Format
//!
//! ## Normalize
//!
//! ```text
//! Normalize
//!     Renamed: A.txt → A.pdf
//!     Renamed: sub/B → sub/B.docx
//!     Skipped stub: Shortcut.lnk
//!     Unrecognized: notes.bin
//! 2 documents, 2 renamed
//! ```
//!
//! ## Entries
//!
//! ```text
//! Kök
//! 001 Syllabus (PDF)
//!     Source: content/drive/Syllabus.pdf
//!     Page: notes/syllabus.pdf.html
//! week-1
//! 001 03 Lecture (DOCX)
//!     Source: content/drive/Week 1/03_Lecture.docx
//!     Page: notes/week-1/03-lecture.html
//! ```
//!
//! ## Build
//!
//! ```text
//! 001 Syllabus → notes/syllabus.pdf.html
//! 002 03 Lecture → notes/week-1/03-lecture.html (2 images)
//!     Warning: 1 unsupported block(s) were skipped
//! Built 2 entries, 2 images, 1 warning
//! ```
//!
//! # Architecture
//!
//! Each stage has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure.

use crate::manifest::{BuildManifest, BuildStatus, FailureArtifact};
use crate::normalize::NormalizeReport;
use crate::pipeline::BuildReport;
use crate::types::{Entry, to_slash};

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

// ============================================================================
// Normalize
// ============================================================================

pub fn format_normalize_report(report: &NormalizeReport) -> Vec<String> {
    let mut lines = vec!["Normalize".to_string()];
    for rename in &report.renames {
        lines.push(format!(
            "{}Renamed: {} → {}",
            indent(1),
            to_slash(&rename.from),
            to_slash(&rename.to)
        ));
    }
    for stub in &report.stubs {
        lines.push(format!("{}Skipped stub: {}", indent(1), to_slash(stub)));
    }
    for unknown in &report.unknown {
        lines.push(format!("{}Unrecognized: {}", indent(1), to_slash(unknown)));
    }
    lines.push(format!(
        "{}, {} renamed",
        plural(report.tree.documents.len(), "document", "documents"),
        report.renames.len()
    ));
    lines
}

pub fn print_normalize_report(report: &NormalizeReport) {
    for line in format_normalize_report(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Entries
// ============================================================================

/// Entries grouped under their output directory, in resolved order.
///
/// Entries are already sorted by directory, so a new header is emitted
/// whenever the directory changes.
pub fn format_entries(entries: &[Entry], root_group: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current: Option<String> = None;
    let mut pos = 0;
    for entry in entries {
        let group = entry.group().unwrap_or_else(|| root_group.to_string());
        if current.as_deref() != Some(group.as_str()) {
            lines.push(group.clone());
            current = Some(group);
            pos = 0;
        }
        pos += 1;
        lines.push(format!(
            "{} {} ({})",
            format_index(pos),
            entry.title(),
            entry.kind().label()
        ));
        lines.push(format!("{}Source: {}", indent(1), to_slash(entry.src())));
        lines.push(format!("{}Page: {}", indent(1), to_slash(entry.out_html())));
    }
    lines
}

pub fn print_entries(entries: &[Entry], root_group: &str) {
    for line in format_entries(entries, root_group) {
        println!("{}", line);
    }
}

// ============================================================================
// Build
// ============================================================================

pub fn format_build_report(report: &BuildReport) -> Vec<String> {
    let mut lines = Vec::new();
    let mut images = 0;
    let mut warnings = 0;
    for (i, built) in report.built.iter().enumerate() {
        let mut line = format!(
            "{} {} → {}",
            format_index(i + 1),
            built.title,
            to_slash(&built.page)
        );
        if built.images > 0 {
            line.push_str(&format!(" ({})", plural(built.images, "image", "images")));
        }
        lines.push(line);
        for warning in &built.warnings {
            lines.push(format!("{}Warning: {}", indent(1), warning));
        }
        images += built.images;
        warnings += built.warnings.len();
    }
    lines.push(format!(
        "Built {}, {}, {}",
        plural(report.built.len(), "entry", "entries"),
        plural(images, "image", "images"),
        plural(warnings, "warning", "warnings")
    ));
    lines
}

pub fn print_build_report(report: &BuildReport) {
    for line in format_build_report(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Status
// ============================================================================

/// Summary of the last recorded build.
pub fn format_status(manifest: &BuildManifest, failure: Option<&FailureArtifact>) -> Vec<String> {
    let status = match manifest.status {
        BuildStatus::Collected => "collected",
        BuildStatus::Success => "success",
        BuildStatus::Failed => "failed",
    };
    let mut lines = vec![format!("Last build: {} at {}", status, manifest.generated_at)];
    lines.push(format!("{}Entries: {}", indent(1), manifest.counts.entries));
    if let Some(error) = &manifest.error {
        lines.push(format!("{}Error: {}", indent(1), error));
    }
    if let Some(entry) = &manifest.current_entry {
        lines.push(format!("{}Entry: {} ({})", indent(1), entry.title, entry.src));
    }
    if let Some(failure) = failure {
        lines.push(format!("{}Log: {}", indent(1), failure.log_file));
    }
    lines
}

pub fn print_status(manifest: &BuildManifest, failure: Option<&FailureArtifact>) {
    for line in format_status(manifest, failure) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{Rename, VerifiedDocument, VerifiedTree};
    use crate::pipeline::BuiltEntry;
    use crate::types::{DocumentKind, SortKey};
    use std::path::PathBuf;

    fn entry(kind: DocumentKind, rel_dir: &str, title: &str) -> Entry {
        let stem = title.to_lowercase().replace(' ', "-");
        Entry::new(
            kind,
            title.to_string(),
            PathBuf::from(rel_dir),
            stem.clone(),
            PathBuf::from(format!("content/drive/{title}.{}", kind.extension())),
            SortKey {
                number: None,
                title: title.to_lowercase(),
            },
        )
    }

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(1000), "1000");
    }

    #[test]
    fn indent_levels() {
        assert_eq!(indent(0), "");
        assert_eq!(indent(2), "        ");
    }

    #[test]
    fn normalize_report_lists_renames() {
        let report = NormalizeReport {
            renames: vec![Rename {
                from: PathBuf::from("A.txt"),
                to: PathBuf::from("A.pdf"),
                kind: DocumentKind::Pdf,
            }],
            unchanged: vec![],
            stubs: vec![PathBuf::from("x.lnk")],
            unknown: vec![],
            tree: VerifiedTree {
                root: PathBuf::from("content/drive"),
                documents: vec![VerifiedDocument {
                    path: PathBuf::from("A.pdf"),
                    kind: DocumentKind::Pdf,
                }],
            },
        };
        let lines = format_normalize_report(&report);
        assert_eq!(
            lines,
            vec![
                "Normalize",
                "    Renamed: A.txt → A.pdf",
                "    Skipped stub: x.lnk",
                "1 document, 1 renamed",
            ]
        );
    }

    #[test]
    fn entries_grouped_by_directory() {
        let entries = vec![
            entry(DocumentKind::Pdf, "", "Syllabus"),
            entry(DocumentKind::Docx, "week-1", "Lab"),
            entry(DocumentKind::Docx, "week-1", "Quiz"),
        ];
        let lines = format_entries(&entries, "Kök");
        assert_eq!(lines[0], "Kök");
        assert_eq!(lines[1], "001 Syllabus (PDF)");
        assert_eq!(lines[2], "    Source: content/drive/Syllabus.pdf");
        assert_eq!(lines[3], "    Page: notes/syllabus.pdf.html");
        assert_eq!(lines[4], "week-1");
        assert_eq!(lines[5], "001 Lab (DOCX)");
        assert_eq!(lines[8], "002 Quiz (DOCX)");
    }

    #[test]
    fn build_report_totals() {
        let report = BuildReport {
            built: vec![
                BuiltEntry {
                    title: "Syllabus".into(),
                    kind: DocumentKind::Pdf,
                    page: PathBuf::from("notes/syllabus.pdf.html"),
                    images: 0,
                    warnings: vec![],
                },
                BuiltEntry {
                    title: "Lab".into(),
                    kind: DocumentKind::Docx,
                    page: PathBuf::from("notes/lab.html"),
                    images: 2,
                    warnings: vec!["1 unsupported block(s) were skipped".into()],
                },
            ],
            ..BuildReport::default()
        };
        let lines = format_build_report(&report);
        assert_eq!(lines[0], "001 Syllabus → notes/syllabus.pdf.html");
        assert_eq!(lines[1], "002 Lab → notes/lab.html (2 images)");
        assert_eq!(lines[2], "    Warning: 1 unsupported block(s) were skipped");
        assert_eq!(lines[3], "Built 2 entries, 2 images, 1 warning");
    }

    #[test]
    fn empty_build_report() {
        let lines = format_build_report(&BuildReport::default());
        assert_eq!(lines, vec!["Built 0 entries, 0 images, 0 warnings"]);
    }

    #[test]
    fn status_of_failed_build() {
        let e = entry(DocumentKind::Docx, "", "Lab");
        let manifest = BuildManifest::new(
            BuildStatus::Failed,
            vec![e.summary()],
            Some(e.summary()),
            Some("boom".into()),
        );
        let lines = format_status(&manifest, None);
        assert!(lines[0].starts_with("Last build: failed at "));
        assert_eq!(lines[1], "    Entries: 1");
        assert_eq!(lines[2], "    Error: boom");
        assert_eq!(lines[3], "    Entry: Lab (content/drive/Lab.docx)");
    }
}

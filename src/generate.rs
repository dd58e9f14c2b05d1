//! HTML site generation.
//!
//! Renders the pages of the static site from the resolved entry list. All
//! markup is built with [maud](https://maud.lambda.xyz/), so titles and
//! warnings coming from file names are escaped.
//!
//! ## Generated Pages
//!
//! - **Home** (`/index.html`): entries grouped by output directory, with the
//!   optional markdown intro from config
//! - **Notes index** (`/notes/index.html`): flat list of document pages
//! - **Downloads index** (`/downloads/index.html`): flat list of originals
//! - **DOCX pages** (`/notes/<dir>/<stem>.html`): converted body plus any
//!   conversion warnings
//! - **PDF pages** (`/notes/<dir>/<stem>.pdf.html`): the PDF in an iframe
//!
//! ## Output Structure
//!
//! ```text
//! docs/
//! ├── index.html
//! ├── .nojekyll
//! ├── notes/
//! │   ├── index.html
//! │   └── week-1/03-lecture.html
//! ├── downloads/
//! │   ├── index.html
//! │   └── week-1/03-lecture.docx
//! └── assets/
//!     └── week-1/03-lecture/img-001.png
//! ```
//!
//! A build is assembled in `.drive-notes-staging/` under the output root and
//! moved into place by [`publish_staging`] once everything rendered.
//!
//! Every href is relative to the page it appears on, so the site works from
//! any sub-path (GitHub Pages project sites live under `/<repo>/`).

use crate::config::SiteSettings;
use crate::convert::Conversion;
use crate::types::{ASSETS_DIR, DOWNLOADS_DIR, DocumentKind, Entry, NOTES_DIR, relative_href};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use pulldown_cmark::{Parser, html as md_html};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
}

const CSS: &str = include_str!("../static/style.css");

pub const INDEX_PAGE: &str = "index.html";
pub const NOJEKYLL: &str = ".nojekyll";

fn notes_index() -> PathBuf {
    Path::new(NOTES_DIR).join(INDEX_PAGE)
}

fn downloads_index() -> PathBuf {
    Path::new(DOWNLOADS_DIR).join(INDEX_PAGE)
}

// ============================================================================
// Filesystem
// ============================================================================

/// Directory under the output root a build is assembled in.
pub const STAGING_DIR: &str = ".drive-notes-staging";

/// Everything a build publishes, relative to the output root.
const PUBLISHED: [&str; 5] = [NOTES_DIR, DOWNLOADS_DIR, ASSETS_DIR, INDEX_PAGE, NOJEKYLL];

/// Create an empty staging directory, replacing one left by an interrupted run.
pub fn prepare_staging(output_root: &Path) -> Result<PathBuf, GenerateError> {
    discard_staging(output_root)?;
    let staging = output_root.join(STAGING_DIR);
    fs::create_dir_all(&staging)?;
    Ok(staging)
}

pub fn discard_staging(output_root: &Path) -> Result<(), GenerateError> {
    remove_path(&output_root.join(STAGING_DIR))?;
    Ok(())
}

/// Replace the published site with the staged build.
///
/// All previously generated output goes, so pages of entries that no longer
/// exist never survive a build. Other files under the output root are kept.
pub fn publish_staging(output_root: &Path) -> Result<(), GenerateError> {
    let staging = output_root.join(STAGING_DIR);
    for name in PUBLISHED {
        let target = output_root.join(name);
        remove_path(&target)?;
        let staged = staging.join(name);
        if staged.exists() {
            fs::rename(&staged, &target)?;
        }
    }
    fs::remove_dir_all(&staging)?;
    Ok(())
}

fn remove_path(path: &Path) -> std::io::Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Write a rendered page at `rel_path` under the output root.
pub fn write_page(output_root: &Path, rel_path: &Path, page: Markup) -> Result<PathBuf, GenerateError> {
    let path = output_root.join(rel_path);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, page.into_string())?;
    Ok(path)
}

/// Copy an entry's source file to its download path.
pub fn copy_download(output_root: &Path, entry: &Entry) -> Result<PathBuf, GenerateError> {
    let to = output_root.join(entry.out_file());
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(entry.src(), &to).map_err(|source| GenerateError::Copy {
        from: entry.src().to_path_buf(),
        to: to.clone(),
        source,
    })?;
    Ok(to)
}

/// Write the home, notes and downloads indexes plus the `.nojekyll` marker.
///
/// Returns the written paths.
pub fn write_site_indexes(
    output_root: &Path,
    entries: &[Entry],
    site: &SiteSettings,
    updated_at: &str,
) -> Result<Vec<PathBuf>, GenerateError> {
    let written = vec![
        write_page(
            output_root,
            Path::new(INDEX_PAGE),
            render_index(entries, site, updated_at),
        )?,
        write_page(output_root, &notes_index(), render_notes_index(entries, site))?,
        write_page(
            output_root,
            &downloads_index(),
            render_downloads_index(entries, site),
        )?,
    ];
    fs::write(output_root.join(NOJEKYLL), "")?;
    Ok(written)
}

// ============================================================================
// HTML Components
// ============================================================================

fn base_document(title: &str, language: &str, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang=(language) {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) }
                style { (PreEscaped(CSS)) }
            }
            body {
                (content)
            }
        }
    }
}

/// Sticky bar with the page title, a home link and a download link.
fn topbar(title: &str, home_href: &str, download_href: &str) -> Markup {
    html! {
        div.topbar {
            div.wrap {
                div { (title) }
                div.btns {
                    a.btn href=(home_href) { "← Ana sayfa" }
                    a.btn href=(download_href) { "⬇️ İndir" }
                }
            }
        }
    }
}

fn entry_icon(entry: &Entry) -> &'static str {
    match entry.kind() {
        DocumentKind::Docx => "📖",
        DocumentKind::Pdf => "📄",
    }
}

fn render_markdown(source: &str) -> String {
    let mut out = String::new();
    md_html::push_html(&mut out, Parser::new(source));
    out
}

// ============================================================================
// Page Renderers
// ============================================================================

/// Page for a converted Word document.
pub fn render_docx_page(entry: &Entry, site: &SiteSettings, conversion: &Conversion) -> Markup {
    let page = entry.out_html();
    let content = html! {
        (topbar(
            entry.title(),
            &relative_href(page, Path::new(INDEX_PAGE)),
            &relative_href(page, entry.out_file()),
        ))
        div.wrap {
            @if !conversion.warnings.is_empty() {
                div.notice {
                    strong { "Dönüştürme uyarıları" }
                    ul {
                        @for warning in &conversion.warnings {
                            li { (warning) }
                        }
                    }
                }
            }
            (PreEscaped(&conversion.body_html))
        }
    };
    base_document(entry.title(), &site.language, content)
}

/// Page embedding a PDF.
pub fn render_pdf_page(entry: &Entry, site: &SiteSettings) -> Markup {
    let page = entry.out_html();
    let pdf_href = relative_href(page, entry.out_file());
    let content = html! {
        (topbar(entry.title(), &relative_href(page, Path::new(INDEX_PAGE)), &pdf_href))
        div.wrap {
            p { a.btn href=(pdf_href) { "⬇️ PDF indir" } }
            iframe.pdf src=(pdf_href) title=(entry.title()) {}
        }
    };
    base_document(entry.title(), &site.language, content)
}

/// Home page: entries grouped by directory.
pub fn render_index(entries: &[Entry], site: &SiteSettings, updated_at: &str) -> Markup {
    let mut groups: BTreeMap<(String, String), Vec<&Entry>> = BTreeMap::new();
    for entry in entries {
        let label = entry.group().unwrap_or_else(|| site.root_group.clone());
        groups
            .entry((label.to_lowercase(), label))
            .or_default()
            .push(entry);
    }

    let home = Path::new(INDEX_PAGE);
    let content = html! {
        div.wrap {
            h1 { (site.title) }
            p.updated { "Otomatik güncellendi: " (updated_at) }
            @if !site.intro.trim().is_empty() {
                section.intro { (PreEscaped(render_markdown(&site.intro))) }
            }
            h2 { "İçerik" }
            @if entries.is_empty() {
                p { "Henüz Drive'dan (DOCX/PDF) içerik indirilemedi." }
            }
            @for ((_, label), group) in &groups {
                h3 { (label) }
                ul.entries {
                    @for entry in group {
                        li {
                            (entry_icon(entry)) " "
                            a href=(relative_href(home, entry.out_html())) { (entry.title()) }
                            " · ⬇️ "
                            a href=(relative_href(home, entry.out_file())) { (entry.kind().label()) }
                        }
                    }
                }
            }
            p {
                a href=(relative_href(home, &notes_index())) { "Tüm notlar" }
                " · "
                a href=(relative_href(home, &downloads_index())) { "Tüm indirmeler" }
            }
        }
    };
    base_document(&site.title, &site.language, content)
}

/// Flat list of every document page.
pub fn render_notes_index(entries: &[Entry], site: &SiteSettings) -> Markup {
    let page = notes_index();
    let title = format!("Notlar · {}", site.title);
    let content = html! {
        div.wrap {
            p { a.btn href=(relative_href(&page, Path::new(INDEX_PAGE))) { "← Ana sayfa" } }
            h1 { "Notlar" }
            ul.entries {
                @for entry in entries {
                    li {
                        (entry_icon(entry)) " "
                        a href=(relative_href(&page, entry.out_html())) { (entry.title()) }
                    }
                }
            }
        }
    };
    base_document(&title, &site.language, content)
}

/// Flat list of every downloadable original.
pub fn render_downloads_index(entries: &[Entry], site: &SiteSettings) -> Markup {
    let page = downloads_index();
    let title = format!("İndirmeler · {}", site.title);
    let content = html! {
        div.wrap {
            p { a.btn href=(relative_href(&page, Path::new(INDEX_PAGE))) { "← Ana sayfa" } }
            h1 { "İndirmeler" }
            ul.entries {
                @for entry in entries {
                    li {
                        a href=(relative_href(&page, entry.out_file())) { (entry.title()) }
                        " "
                        span.kind { "(" (entry.kind().label()) ")" }
                    }
                }
            }
        }
    };
    base_document(&title, &site.language, content)
}

// ============================================================================
// Tests
// ============================================================================

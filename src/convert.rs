//! Document conversion.
//!
//! Word documents become an HTML fragment that the page renderer wraps in the
//! site chrome. Conversion sits behind [`DocumentConverter`] so the pipeline
//! can be driven with a stand-in in tests; [`DocxConverter`] is the shipped
//! implementation, built on `docx-rs`.
//!
//! Embedded images go through an [`ImageSink`] owned by the caller. The sink
//! numbers images sequentially per entry (`img-001.png`, `img-002.jpg`, …),
//! writes them under the entry's assets directory and hands back an href
//! relative to the entry's page.
//!
//! Anything the converter cannot render is dropped with a warning. Warnings
//! are shown on the generated page verbatim.

use crate::types::{Entry, relative_href};
use docx_rs::{
    DocumentChild, Paragraph, ParagraphChild, RunChild, Table, TableCellContent, TableChild,
    TableRowChild,
};
use maud::{Markup, html};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Output of a successful conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversion {
    pub body_html: String,
    pub warnings: Vec<String>,
}

/// Turns a source document into an HTML body fragment.
pub trait DocumentConverter {
    fn convert(&self, source: &Path, images: &mut ImageSink) -> Result<Conversion, ConvertError>;
}

/// Per-entry destination for extracted images.
#[derive(Debug)]
pub struct ImageSink {
    /// Directory on disk receiving the images.
    dir: PathBuf,
    /// Same directory, relative to the output root.
    rel_dir: PathBuf,
    /// Page the hrefs are relative to, relative to the output root.
    page: PathBuf,
    counter: usize,
    written: Vec<PathBuf>,
}

impl ImageSink {
    pub fn new(output_root: &Path, entry: &Entry) -> Self {
        let rel_dir = entry.assets_dir();
        Self {
            dir: output_root.join(&rel_dir),
            rel_dir,
            page: entry.out_html().to_path_buf(),
            counter: 0,
            written: Vec::new(),
        }
    }

    /// Write the next image and return its href relative to the page.
    pub fn write(&mut self, bytes: &[u8], extension: &str) -> Result<String, ConvertError> {
        self.counter += 1;
        let filename = format!("img-{:03}.{extension}", self.counter);
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(&filename);
        fs::write(&path, bytes)?;
        self.written.push(path);
        Ok(relative_href(&self.page, &self.rel_dir.join(filename)))
    }

    /// Paths written so far, in order.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    pub fn count(&self) -> usize {
        self.counter
    }
}

/// Extension for an image, from its media path or else its content.
pub fn image_extension(media_path: &str, bytes: &[u8]) -> &'static str {
    let from_path = Path::new(media_path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match from_path.as_deref() {
        Some("png") => return "png",
        Some("jpg" | "jpeg") => return "jpg",
        Some("gif") => return "gif",
        Some("svg") => return "svg",
        Some("webp") => return "webp",
        _ => {}
    }
    match image::guess_format(bytes) {
        Ok(image::ImageFormat::Png) => "png",
        Ok(image::ImageFormat::Jpeg) => "jpg",
        Ok(image::ImageFormat::Gif) => "gif",
        Ok(image::ImageFormat::WebP) => "webp",
        _ => "bin",
    }
}

/// Converts `.docx` files with `docx-rs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocxConverter;

impl DocumentConverter for DocxConverter {
    fn convert(&self, source: &Path, images: &mut ImageSink) -> Result<Conversion, ConvertError> {
        let bytes = fs::read(source)?;
        let docx = docx_rs::read_docx(&bytes).map_err(|e| ConvertError::Parse {
            path: source.to_path_buf(),
            message: e.to_string(),
        })?;

        let mut blocks: Vec<Markup> = Vec::new();
        let mut skipped = 0usize;
        for child in &docx.document.children {
            match child {
                DocumentChild::Paragraph(para) => {
                    if let Some(block) = render_paragraph(para) {
                        blocks.push(block);
                    }
                }
                DocumentChild::Table(table) => blocks.push(render_table(table)),
                _ => skipped += 1,
            }
        }

        let mut warnings = Vec::new();
        if skipped > 0 {
            warnings.push(format!("{skipped} unsupported block(s) were skipped"));
        }

        let mut figures: Vec<String> = Vec::new();
        for (_, media_path, image, _) in &docx.images {
            let ext = image_extension(media_path, &image.0);
            if ext == "bin" {
                warnings.push(format!("image {media_path} has an unrecognized format"));
            }
            figures.push(images.write(&image.0, ext)?);
        }

        let body = html! {
            @for block in &blocks { (block) }
            @for src in &figures {
                figure { img src=(src) alt=""; }
            }
        };
        tracing::debug!(
            source = %source.display(),
            blocks = blocks.len(),
            images = figures.len(),
            "converted docx"
        );
        Ok(Conversion {
            body_html: body.into_string(),
            warnings,
        })
    }
}

enum Inline {
    Text(String),
    Break,
}

fn collect_inline(children: &[ParagraphChild], out: &mut Vec<Inline>) {
    for child in children {
        match child {
            ParagraphChild::Run(run) => {
                for rc in &run.children {
                    match rc {
                        RunChild::Text(t) => out.push(Inline::Text(t.text.clone())),
                        RunChild::Tab(_) => out.push(Inline::Text(" ".to_string())),
                        RunChild::Break(_) => out.push(Inline::Break),
                        _ => {}
                    }
                }
            }
            ParagraphChild::Hyperlink(link) => collect_inline(&link.children, out),
            _ => {}
        }
    }
}

fn paragraph_text(para: &Paragraph) -> String {
    let mut inline = Vec::new();
    collect_inline(&para.children, &mut inline);
    inline
        .into_iter()
        .map(|i| match i {
            Inline::Text(t) => t,
            Inline::Break => " ".to_string(),
        })
        .collect()
}

/// Heading level implied by a paragraph style id (`Heading1`, `Title`, …).
fn heading_level(style: &str) -> Option<u8> {
    let normalized: String = style
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    if normalized == "title" {
        return Some(1);
    }
    let level: u8 = normalized.strip_prefix("heading")?.parse().ok()?;
    (1..=6).contains(&level).then_some(level)
}

fn render_paragraph(para: &Paragraph) -> Option<Markup> {
    let mut inline = Vec::new();
    collect_inline(&para.children, &mut inline);
    let empty = inline.iter().all(|i| match i {
        Inline::Text(t) => t.trim().is_empty(),
        Inline::Break => true,
    });
    if empty {
        return None;
    }

    let level = para
        .property
        .style
        .as_ref()
        .and_then(|s| heading_level(&s.val));
    let content = html! {
        @for item in &inline {
            @match item {
                Inline::Text(t) => { (t) }
                Inline::Break => { br; }
            }
        }
    };
    Some(match level {
        Some(1) => html! { h1 { (content) } },
        Some(2) => html! { h2 { (content) } },
        Some(3) => html! { h3 { (content) } },
        Some(4) => html! { h4 { (content) } },
        Some(5) => html! { h5 { (content) } },
        Some(_) => html! { h6 { (content) } },
        None => html! { p { (content) } },
    })
}

fn render_table(table: &Table) -> Markup {
    let rows: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|row| {
            let TableChild::TableRow(row) = row;
            row.cells
                .iter()
                .map(|cell| {
                    let TableRowChild::TableCell(cell) = cell;
                    cell.children
                        .iter()
                        .filter_map(|content| match content {
                            TableCellContent::Paragraph(p) => Some(paragraph_text(p)),
                            _ => None,
                        })
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .collect()
        })
        .collect();

    html! {
        table {
            tbody {
                @for row in &rows {
                    tr { @for cell in row { td { (cell) } } }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DocumentKind, SortKey};
    use tempfile::TempDir;

    fn entry(rel_dir: &str, stem: &str) -> Entry {
        Entry::new(
            DocumentKind::Docx,
            stem.to_string(),
            PathBuf::from(rel_dir),
            stem.to_string(),
            PathBuf::from(format!("src/{stem}.docx")),
            SortKey {
                number: None,
                title: stem.to_string(),
            },
        )
    }

    #[test]
    fn sink_numbers_images_sequentially() {
        let tmp = TempDir::new().unwrap();
        let mut sink = ImageSink::new(tmp.path(), &entry("week-1", "lab"));

        let first = sink.write(b"a", "png").unwrap();
        let second = sink.write(b"b", "jpg").unwrap();

        assert_eq!(first, "../../assets/week-1/lab/img-001.png");
        assert_eq!(second, "../../assets/week-1/lab/img-002.jpg");
        assert_eq!(sink.count(), 2);
        assert_eq!(
            fs::read(tmp.path().join("assets/week-1/lab/img-002.jpg")).unwrap(),
            b"b"
        );
    }

    #[test]
    fn sink_counters_are_per_entry() {
        let tmp = TempDir::new().unwrap();
        let mut a = ImageSink::new(tmp.path(), &entry("", "a"));
        let mut b = ImageSink::new(tmp.path(), &entry("", "b"));
        a.write(b"1", "png").unwrap();
        a.write(b"2", "png").unwrap();
        let href = b.write(b"3", "png").unwrap();
        assert_eq!(href, "../assets/b/img-001.png");
        assert_eq!(a.written().len(), 2);
    }

    #[test]
    fn sink_creates_nothing_until_written() {
        let tmp = TempDir::new().unwrap();
        let sink = ImageSink::new(tmp.path(), &entry("", "a"));
        assert!(sink.written().is_empty());
        assert!(!tmp.path().join("assets").exists());
    }

    #[test]
    fn extension_from_media_path() {
        assert_eq!(image_extension("media/image1.PNG", b""), "png");
        assert_eq!(image_extension("media/photo.jpeg", b""), "jpg");
        assert_eq!(image_extension("media/x.svg", b""), "svg");
    }

    #[test]
    fn extension_sniffed_from_bytes() {
        let png = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
        assert_eq!(image_extension("media/image1.emf", png), "png");
        assert_eq!(image_extension("media/image1", b"GIF89a...."), "gif");
        assert_eq!(image_extension("media/image1", b"nothing"), "bin");
    }

    #[test]
    fn heading_levels_from_styles() {
        assert_eq!(heading_level("Heading1"), Some(1));
        assert_eq!(heading_level("heading 3"), Some(3));
        assert_eq!(heading_level("Title"), Some(1));
        assert_eq!(heading_level("Heading9"), None);
        assert_eq!(heading_level("Normal"), None);
    }

    #[test]
    fn tables_render_cell_text() {
        let cell = |text: &str| {
            docx_rs::TableCell::new()
                .add_paragraph(Paragraph::new().add_run(docx_rs::Run::new().add_text(text)))
        };
        let table = Table::new(vec![
            docx_rs::TableRow::new(vec![cell("Hafta"), cell("Konu")]),
            docx_rs::TableRow::new(vec![cell("1"), cell("Giriş")]),
        ]);
        assert_eq!(
            render_table(&table).into_string(),
            "<table><tbody><tr><td>Hafta</td><td>Konu</td></tr>\
             <tr><td>1</td><td>Giriş</td></tr></tbody></table>"
        );
    }

    #[test]
    fn unparseable_docx_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("broken.docx");
        fs::write(&source, b"PK\x03\x04 not really a zip").unwrap();
        let mut sink = ImageSink::new(tmp.path(), &entry("", "broken"));
        let err = DocxConverter.convert(&source, &mut sink).unwrap_err();
        assert!(matches!(err, ConvertError::Parse { .. }));
    }

    #[test]
    fn missing_source_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let mut sink = ImageSink::new(tmp.path(), &entry("", "gone"));
        let err = DocxConverter
            .convert(&tmp.path().join("gone.docx"), &mut sink)
            .unwrap_err();
        assert!(matches!(err, ConvertError::Io(_)));
    }
}

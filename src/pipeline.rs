//! The build run.
//!
//! A run moves through `syncing → collecting → building(entry) → success`;
//! any error ends it in `failed`. [`Pipeline::run`] is the single place that
//! turns an outcome into artifacts:
//!
//! | Outcome          | `build-manifest.json` | `build-failure.json` |
//! |------------------|-----------------------|----------------------|
//! | entries resolved | `collected`           | untouched            |
//! | build succeeded  | `success`             | removed              |
//! | any failure      | `failed`              | written              |
//!
//! A sync-only run that succeeds leaves both artifacts as they were, since
//! nothing about the site changed.
//!
//! Entry pages and index pages are built in a staging directory under the
//! output root and published only after every entry has built. A failed run
//! discards the staging directory and leaves the previously published site
//! untouched, so no index ever points at a missing page.

use crate::config::SiteConfig;
use crate::convert::{ConvertError, DocumentConverter, ImageSink};
use crate::generate::{
    GenerateError, copy_download, discard_staging, prepare_staging, publish_staging,
    render_docx_page, render_pdf_page, write_page, write_site_indexes,
};
use crate::manifest::{
    BuildManifest, BuildStatus, FailureArtifact, ManifestError, StatePaths, timestamp, write_json,
};
use crate::normalize::{NormalizeError, NormalizeReport, assert_has_documents, normalize};
use crate::resolve::{ResolveError, resolve};
use crate::sync::{FolderFetcher, SyncError, sync_folder};
use crate::types::{DocumentKind, Entry, EntrySummary, to_slash};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("failed to convert '{title}' ({src}): {source}")]
    Convert {
        title: String,
        src: String,
        source: ConvertError,
    },
    #[error(transparent)]
    Generate(#[from] GenerateError),
    #[error("failed to write build artifacts: {0}")]
    Manifest(#[from] ManifestError),
}

/// Which phases a run performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub sync: bool,
    pub build: bool,
}

/// Result of building one entry.
#[derive(Debug, Clone)]
pub struct BuiltEntry {
    pub title: String,
    pub kind: DocumentKind,
    /// Page path relative to the output root.
    pub page: PathBuf,
    pub images: usize,
    pub warnings: Vec<String>,
}

/// What a successful run did.
#[derive(Debug, Default)]
pub struct BuildReport {
    pub synced: bool,
    pub normalize: Option<NormalizeReport>,
    pub entries: Vec<Entry>,
    pub built: Vec<BuiltEntry>,
}

/// Manifest state gathered while the run progresses.
#[derive(Debug, Default)]
struct RunRecord {
    entries: Vec<EntrySummary>,
    current: Option<EntrySummary>,
}

/// Normalize the source tree and resolve it into entries.
///
/// Fails if no documents survive normalization. Renames are the only writes.
pub fn collect(config: &SiteConfig) -> Result<(NormalizeReport, Vec<Entry>), PipelineError> {
    let report = normalize(&config.source.dir, &config.ingest)?;
    assert_has_documents(&report)?;
    let entries = resolve(&report.tree, config.ingest.unique_path_attempts)?;
    tracing::info!(
        documents = report.tree.documents.len(),
        renamed = report.renames.len(),
        entries = entries.len(),
        "collected entries"
    );
    Ok((report, entries))
}

pub struct Pipeline<'a> {
    config: &'a SiteConfig,
    fetcher: &'a dyn FolderFetcher,
    converter: &'a dyn DocumentConverter,
    state: StatePaths,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a SiteConfig,
        fetcher: &'a dyn FolderFetcher,
        converter: &'a dyn DocumentConverter,
    ) -> Self {
        Self {
            config,
            fetcher,
            converter,
            state: StatePaths::new(&config.state.dir),
        }
    }

    pub fn state(&self) -> &StatePaths {
        &self.state
    }

    /// Run the requested phases, recording the outcome in the state directory.
    pub fn run(&self, options: RunOptions) -> Result<BuildReport, PipelineError> {
        let mut record = RunRecord::default();
        match self.execute(options, &mut record) {
            Ok(report) => Ok(report),
            Err(e) => {
                self.record_failure(&e, &record);
                Err(e)
            }
        }
    }

    fn execute(
        &self,
        options: RunOptions,
        record: &mut RunRecord,
    ) -> Result<BuildReport, PipelineError> {
        let mut report = BuildReport::default();

        if options.sync {
            let url = self.config.folder_url().ok_or(SyncError::MissingFolderUrl)?;
            tracing::info!(dir = %self.config.source.dir.display(), "syncing drive folder");
            sync_folder(url, &self.config.source.dir, self.fetcher)?;
            report.synced = true;
        }

        if !options.build {
            return Ok(report);
        }

        let (normalized, entries) = collect(self.config)?;
        record.entries = entries.iter().map(Entry::summary).collect();
        self.persist(BuildStatus::Collected, record, None)?;

        let output = &self.config.output.dir;
        let staging = prepare_staging(output)?;
        match self.build_site(&staging, &entries, record) {
            Ok(built) => report.built = built,
            Err(e) => {
                if let Err(cleanup) = discard_staging(output) {
                    tracing::warn!(error = %cleanup, "could not remove staging directory");
                }
                return Err(e);
            }
        }
        publish_staging(output)?;
        self.persist(BuildStatus::Success, record, None)?;
        let stale = self.state.failure();
        if stale.exists() {
            fs::remove_file(&stale).map_err(ManifestError::from)?;
        }
        tracing::info!(
            entries = entries.len(),
            output = %output.display(),
            "build succeeded"
        );

        report.normalize = Some(normalized);
        report.entries = entries;
        Ok(report)
    }

    /// Build every entry and the indexes under `root`.
    fn build_site(
        &self,
        root: &Path,
        entries: &[Entry],
        record: &mut RunRecord,
    ) -> Result<Vec<BuiltEntry>, PipelineError> {
        let mut built = Vec::with_capacity(entries.len());
        for entry in entries {
            record.current = Some(entry.summary());
            built.push(self.build_entry(root, entry)?);
        }
        record.current = None;
        write_site_indexes(root, entries, &self.config.site, &timestamp())?;
        Ok(built)
    }

    fn build_entry(&self, output: &Path, entry: &Entry) -> Result<BuiltEntry, PipelineError> {
        let site = &self.config.site;
        copy_download(output, entry)?;

        let (page, images, warnings) = match entry.kind() {
            DocumentKind::Docx => {
                let mut sink = ImageSink::new(output, entry);
                let conversion = self
                    .converter
                    .convert(entry.src(), &mut sink)
                    .map_err(|source| PipelineError::Convert {
                        title: entry.title().to_string(),
                        src: to_slash(entry.src()),
                        source,
                    })?;
                for warning in &conversion.warnings {
                    tracing::warn!(entry = %entry.title(), %warning, "conversion warning");
                }
                let page = render_docx_page(entry, site, &conversion);
                (page, sink.count(), conversion.warnings)
            }
            DocumentKind::Pdf => (render_pdf_page(entry, site), 0, Vec::new()),
        };

        write_page(output, entry.out_html(), page)?;
        tracing::info!(
            entry = %entry.title(),
            page = %to_slash(entry.out_html()),
            images,
            "built entry"
        );
        Ok(BuiltEntry {
            title: entry.title().to_string(),
            kind: entry.kind(),
            page: entry.out_html().to_path_buf(),
            images,
            warnings,
        })
    }

    fn persist(
        &self,
        status: BuildStatus,
        record: &RunRecord,
        error: Option<String>,
    ) -> Result<(), ManifestError> {
        let manifest = BuildManifest::new(
            status,
            record.entries.clone(),
            record.current.clone(),
            error,
        );
        write_json(&self.state.manifest(), &manifest)
    }

    /// Write the failed manifest and the failure artifact.
    ///
    /// Problems writing them are logged; the run's own error is what the
    /// caller sees.
    fn record_failure(&self, error: &PipelineError, record: &RunRecord) {
        let message = error.to_string();
        match &record.current {
            Some(entry) => tracing::error!(entry = %entry.title, error = %message, "build failed"),
            None => tracing::error!(error = %message, "run failed"),
        }

        if let Err(e) = self.persist(BuildStatus::Failed, record, Some(message.clone())) {
            tracing::error!(error = %e, "could not write build manifest");
        }
        let artifact = FailureArtifact::new(
            message,
            record.current.clone(),
            &self.state.log(),
            self.config.state.log_tail_lines,
        );
        if let Err(e) = write_json(&self.state.failure(), &artifact) {
            tracing::error!(error = %e, "could not write failure artifact");
        }
    }
}

//! Build manifest and failure artifact.
//!
//! Automated callers (CI jobs publishing the site) need to know what the last
//! build did without re-running it. Two JSON files in the state directory
//! answer that:
//!
//! - **`build-manifest.json`**: a snapshot of the run's state. Written when
//!   entries have been collected (`"collected"`) and again at the terminal
//!   outcome (`"success"` or `"failed"`).
//! - **`build-failure.json`**: diagnostic detail, written only when a run
//!   fails: the error, the entry that was being built, and the tail of the
//!   run log.
//!
//! ```json
//! {
//!   "generated_at": "2026-10-17T09:30:00Z",
//!   "status": "failed",
//!   "error": "failed to convert ...",
//!   "current_entry": { "kind": "docx", "title": "03 Lecture", ... },
//!   "counts": { "entries": 12 },
//!   "entries": [ ... ]
//! }
//! ```
//!
//! Files are written to a temporary sibling and renamed into place, so a
//! reader never sees a half-written artifact.

use crate::types::EntrySummary;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const MANIFEST_FILENAME: &str = "build-manifest.json";
pub const FAILURE_FILENAME: &str = "build-failure.json";
pub const LOG_FILENAME: &str = "build.log";

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStatus {
    Collected,
    Success,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    pub entries: usize,
}

/// Snapshot of the most recent build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildManifest {
    pub generated_at: String,
    pub status: BuildStatus,
    pub error: Option<String>,
    pub current_entry: Option<EntrySummary>,
    pub counts: Counts,
    pub entries: Vec<EntrySummary>,
}

impl BuildManifest {
    pub fn new(
        status: BuildStatus,
        entries: Vec<EntrySummary>,
        current_entry: Option<EntrySummary>,
        error: Option<String>,
    ) -> Self {
        Self {
            generated_at: timestamp(),
            status,
            error,
            current_entry,
            counts: Counts {
                entries: entries.len(),
            },
            entries,
        }
    }

    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Diagnostic record of a failed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureArtifact {
    pub failed_at: String,
    pub error: String,
    pub current_entry: Option<EntrySummary>,
    pub log_file: String,
    pub log_tail_lines: usize,
    pub log_tail: String,
}

impl FailureArtifact {
    /// Build the artifact, tailing `log_file` if it exists.
    pub fn new(
        error: String,
        current_entry: Option<EntrySummary>,
        log_file: &Path,
        log_tail_lines: usize,
    ) -> Self {
        Self {
            failed_at: timestamp(),
            error,
            current_entry,
            log_file: crate::types::to_slash(log_file),
            log_tail_lines,
            log_tail: read_log_tail(log_file, log_tail_lines),
        }
    }

    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Locations of the build artifacts inside the state directory.
#[derive(Debug, Clone)]
pub struct StatePaths {
    dir: PathBuf,
}

impl StatePaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn manifest(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILENAME)
    }

    pub fn failure(&self) -> PathBuf {
        self.dir.join(FAILURE_FILENAME)
    }

    pub fn log(&self) -> PathBuf {
        self.dir.join(LOG_FILENAME)
    }
}

/// Current time as an RFC 3339 UTC timestamp.
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Serialize `value` as pretty JSON to `path` via a temporary sibling.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ManifestError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Last `lines` lines of a log file; empty if the file is missing or unreadable.
pub fn read_log_tail(path: &Path, lines: usize) -> String {
    let Ok(bytes) = fs::read(path) else {
        return String::new();
    };
    let text = String::from_utf8_lossy(&bytes);
    let all: Vec<&str> = text.lines().collect();
    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
}

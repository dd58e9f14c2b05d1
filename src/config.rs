//! Builder configuration.
//!
//! Handles loading, validating, and printing `drive-notes.toml`. Every value
//! has a default, so the file is optional and may be sparse. The CLI layers
//! its `--source`/`--output`/`--state-dir` flags and the `GDRIVE_FOLDER_URL`
//! environment variable on top in `main`; nothing below this module reads the
//! environment.
//!
//! ## Configuration Options
//!
//! ```toml
//! [source]
//! folder_url = ""             # Public Drive folder to sync (required for `sync`)
//! dir = "content/drive"       # Where synced documents live
//!
//! [output]
//! dir = "docs"                # Generated site
//!
//! [state]
//! dir = ".drive-notes"        # Build manifest, failure report, run log
//! log_tail_lines = 200        # Log lines copied into the failure report
//!
//! [site]
//! title = "FSP Notları"
//! language = "tr"
//! root_group = "Kök"          # Index heading for documents at the top level
//! intro = ""                  # Optional markdown shown on the index page
//!
//! [ingest]
//! stub_extensions = ["lnk", "url", ...]
//! max_error_pages = 3         # Error pages listed in the failure message
//! unique_path_attempts = 10000
//!
//! [sync]
//! command = ["gdown", "--folder", "{url}", "-O", "{dir}", "--no-cookies"]
//! fallback_command = ["python3", "-m", "gdown", ...]
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "drive-notes.toml";

/// Placeholder replaced by the folder URL in sync commands.
pub const URL_PLACEHOLDER: &str = "{url}";
/// Placeholder replaced by the output directory in sync commands.
pub const DIR_PLACEHOLDER: &str = "{dir}";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Remote folder and local download location.
    pub source: SourceConfig,
    /// Generated site location.
    pub output: OutputConfig,
    /// Build manifest, failure artifact and log location.
    pub state: StateConfig,
    /// Presentation settings for generated pages.
    pub site: SiteSettings,
    /// Ingestion normalization settings.
    pub ingest: IngestConfig,
    /// External fetch commands.
    pub sync: SyncConfig,
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ingest.max_error_pages == 0 {
            return Err(ConfigError::Validation(
                "ingest.max_error_pages must be at least 1".into(),
            ));
        }
        if self.ingest.unique_path_attempts == 0 {
            return Err(ConfigError::Validation(
                "ingest.unique_path_attempts must be at least 1".into(),
            ));
        }
        if self.sync.command.is_empty() {
            return Err(ConfigError::Validation(
                "sync.command must not be empty".into(),
            ));
        }
        if self.source.dir.as_os_str().is_empty() || self.output.dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "source.dir and output.dir must not be empty".into(),
            ));
        }
        if self.source.dir == self.output.dir {
            return Err(ConfigError::Validation(
                "source.dir and output.dir must differ".into(),
            ));
        }
        Ok(())
    }

    /// The configured folder URL, if one is set and non-blank.
    pub fn folder_url(&self) -> Option<&str> {
        self.source
            .folder_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    /// Public folder URL or id handed to the fetch command.
    pub folder_url: Option<String>,
    /// Local directory the folder is synced into.
    pub dir: PathBuf,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            folder_url: None,
            dir: PathBuf::from("content/drive"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("docs"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StateConfig {
    pub dir: PathBuf,
    /// Number of trailing log lines copied into the failure artifact.
    pub log_tail_lines: usize,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".drive-notes"),
            log_tail_lines: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteSettings {
    /// Site title shown on the index pages.
    pub title: String,
    /// `lang` attribute of generated pages.
    pub language: String,
    /// Group heading for documents at the top of the source tree.
    pub root_group: String,
    /// Markdown rendered above the index listing.
    pub intro: String,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            title: "FSP Notları".to_string(),
            language: "tr".to_string(),
            root_group: "Kök".to_string(),
            intro: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IngestConfig {
    /// Extensions (no dot, lowercase) of shortcut/companion stubs that are
    /// never classified.
    pub stub_extensions: Vec<String>,
    /// How many offending files the aggregated error-page message lists.
    pub max_error_pages: usize,
    /// Numbered candidates tried before a rename or stem is declared a collision.
    pub unique_path_attempts: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            stub_extensions: [
                "lnk", "url", "desktop", "ini", "gdoc", "gsheet", "gslides", "gdraw", "gform",
                "gmap", "gsite", "gjam",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            max_error_pages: 3,
            unique_path_attempts: 10_000,
        }
    }
}

impl IngestConfig {
    /// Whether `path` has one of the configured stub extensions.
    pub fn is_stub(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| {
                self.stub_extensions
                    .iter()
                    .any(|stub| stub.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// Primary fetch command; `{url}` and `{dir}` are substituted.
    pub command: Vec<String>,
    /// Alternate invocation tried once when the primary yields no files.
    pub fallback_command: Vec<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        let args = |prefix: &[&str], extra: &[&str]| -> Vec<String> {
            prefix
                .iter()
                .chain(["--folder", URL_PLACEHOLDER, "-O", DIR_PLACEHOLDER, "--no-cookies"].iter())
                .chain(extra.iter())
                .map(|s| s.to_string())
                .collect()
        };
        Self {
            command: args(&["gdown"], &[]),
            fallback_command: args(&["python3", "-m", "gdown"], &["--remaining-ok"]),
        }
    }
}

// =============================================================================
// Config loading
// =============================================================================

/// Load config from a TOML file.
///
/// A missing file yields the stock defaults. Unknown keys are rejected and the
/// result is validated.
pub fn load_config(path: &Path) -> Result<SiteConfig, ConfigError> {
    if !path.exists() {
        return Ok(SiteConfig::default());
    }
    let content = fs::read_to_string(path)?;
    let config: SiteConfig = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `drive-notes.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# drive-notes configuration
# =========================
# All settings are optional. Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Source documents
# ---------------------------------------------------------------------------
[source]
# Public Drive folder ("Anyone with the link"). Required by `sync` and `run`.
# The GDRIVE_FOLDER_URL environment variable overrides this value.
# folder_url = "https://drive.google.com/drive/folders/..."

# Local directory the folder is downloaded into. Wiped on every sync.
dir = "content/drive"

# ---------------------------------------------------------------------------
# Generated site
# ---------------------------------------------------------------------------
[output]
dir = "docs"

# ---------------------------------------------------------------------------
# Build state (manifest, failure report, run log)
# ---------------------------------------------------------------------------
[state]
dir = ".drive-notes"

# Trailing lines of the run log copied into build-failure.json.
log_tail_lines = 200

# ---------------------------------------------------------------------------
# Site presentation
# ---------------------------------------------------------------------------
[site]
title = "FSP Notları"
language = "tr"

# Index heading for documents at the top level of the folder.
root_group = "Kök"

# Markdown shown above the index listing.
intro = ""

# ---------------------------------------------------------------------------
# Ingestion
# ---------------------------------------------------------------------------
[ingest]
# Shortcut/companion files that are never classified.
stub_extensions = ["lnk", "url", "desktop", "ini", "gdoc", "gsheet", "gslides", "gdraw", "gform", "gmap", "gsite", "gjam"]

# How many error-page files the failure message lists.
max_error_pages = 3

# Numbered candidates (name-1, name-2, ...) tried before giving up.
unique_path_attempts = 10000

# ---------------------------------------------------------------------------
# Sync commands ({url} and {dir} are substituted)
# ---------------------------------------------------------------------------
[sync]
command = ["gdown", "--folder", "{url}", "-O", "{dir}", "--no-cookies"]
fallback_command = ["python3", "-m", "gdown", "--folder", "{url}", "-O", "{dir}", "--no-cookies", "--remaining-ok"]
"##
}

//! Downloading the shared folder.
//!
//! The folder is fetched by an external tool (`gdown` by default) behind the
//! [`FolderFetcher`] trait. [`sync_folder`] owns the policy around it:
//!
//! 1. Wipe and recreate the source directory so stale files never survive.
//! 2. Run the fetcher in [`FetchMode::Primary`].
//! 3. If that failed or left no files, run it once in [`FetchMode::Fallback`].
//! 4. Still no files: [`SyncError::Empty`].

use crate::config::{DIR_PLACEHOLDER, SyncConfig, URL_PLACEHOLDER};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error(
        "no Drive folder configured: set source.folder_url in the config file or the \
         GDRIVE_FOLDER_URL environment variable"
    )]
    MissingFolderUrl,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("fetch command is empty")]
    EmptyCommand,
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("{program} exited with {status}")]
    CommandFailed { program: String, status: String },
    #[error(
        "no files were downloaded into {dir}{}. Make sure the folder is shared as \
         \"Anyone with the link\" and contains DOCX or PDF files",
        fetch_cause(.last_error)
    )]
    Empty {
        dir: PathBuf,
        /// Error from the most recent failed fetch attempt, if any.
        last_error: Option<String>,
    },
}

fn fetch_cause(last_error: &Option<String>) -> String {
    last_error
        .as_ref()
        .map(|e| format!(" (last fetch error: {e})"))
        .unwrap_or_default()
}

/// Which invocation of the fetch tool to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    Primary,
    Fallback,
}

/// Downloads a remote folder into a local directory.
pub trait FolderFetcher {
    fn fetch(&self, folder: &str, out_dir: &Path, mode: FetchMode) -> Result<(), SyncError>;
}

/// Runs the configured command line, substituting `{url}` and `{dir}`.
#[derive(Debug, Clone)]
pub struct CommandFetcher {
    command: Vec<String>,
    fallback_command: Vec<String>,
}

impl CommandFetcher {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            command: config.command.clone(),
            fallback_command: config.fallback_command.clone(),
        }
    }

    /// Program and arguments for a mode, placeholders filled in.
    pub fn command_line(&self, folder: &str, out_dir: &Path, mode: FetchMode) -> Vec<String> {
        let template = match mode {
            FetchMode::Primary => &self.command,
            FetchMode::Fallback => &self.fallback_command,
        };
        let dir = out_dir.to_string_lossy();
        template
            .iter()
            .map(|arg| {
                arg.replace(URL_PLACEHOLDER, folder)
                    .replace(DIR_PLACEHOLDER, &dir)
            })
            .collect()
    }
}

impl FolderFetcher for CommandFetcher {
    fn fetch(&self, folder: &str, out_dir: &Path, mode: FetchMode) -> Result<(), SyncError> {
        let line = self.command_line(folder, out_dir, mode);
        let (program, args) = line.split_first().ok_or(SyncError::EmptyCommand)?;
        tracing::info!(program = %program, mode = ?mode, "fetching folder");
        let status = Command::new(program)
            .args(args)
            .status()
            .map_err(|source| SyncError::Spawn {
                program: program.clone(),
                source,
            })?;
        if !status.success() {
            return Err(SyncError::CommandFailed {
                program: program.clone(),
                status: status.to_string(),
            });
        }
        Ok(())
    }
}

/// Replace the contents of `dir` with a fresh download of `folder`.
pub fn sync_folder(folder: &str, dir: &Path, fetcher: &dyn FolderFetcher) -> Result<(), SyncError> {
    if dir.exists() {
        fs::remove_dir_all(dir)?;
    }
    fs::create_dir_all(dir)?;

    let mut last_error = None;
    match fetcher.fetch(folder, dir, FetchMode::Primary) {
        Ok(()) if has_files(dir) => return Ok(()),
        Ok(()) => tracing::warn!(dir = %dir.display(), "primary fetch produced no files, retrying"),
        Err(e) => {
            tracing::warn!(error = %e, "primary fetch failed, retrying");
            last_error = Some(e.to_string());
        }
    }

    if let Err(e) = fetcher.fetch(folder, dir, FetchMode::Fallback) {
        tracing::warn!(error = %e, "fallback fetch failed");
        last_error = Some(e.to_string());
    }
    if has_files(dir) {
        Ok(())
    } else {
        Err(SyncError::Empty {
            dir: dir.to_path_buf(),
            last_error,
        })
    }
}

fn has_files(dir: &Path) -> bool {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .any(|e| e.file_type().is_file())
}

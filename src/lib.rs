//! # drive-notes
//!
//! Publishes a shared Google Drive folder of Word and PDF notes as a static
//! HTML site. Drive downloads are messy: files arrive without extensions or
//! with the wrong one, and a folder that is not shared publicly yields HTML
//! sign-in pages saved under document names. drive-notes repairs what it can,
//! refuses what it cannot, and turns the rest into a site with stable URLs.
//!
//! # Architecture
//!
//! ```text
//! 1. Sync       Drive folder  →  content/drive/         (external fetch tool)
//! 2. Normalize  content/drive →  VerifiedTree           (extensions match bytes)
//! 3. Resolve    VerifiedTree  →  Vec<Entry>             (slugs, titles, order)
//! 4. Build      Vec<Entry>    →  docs/                  (pages, downloads, indexes)
//! ```
//!
//! Every build leaves `build-manifest.json` in the state directory; a failed
//! run also leaves `build-failure.json` naming the error, the entry being
//! built and the tail of the run log.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`sniff`] | Content classification from the first bytes of a file |
//! | [`normalize`] | Extension repair, error-page aggregation, verified document tree |
//! | [`resolve`] | Deterministic output paths, titles and ordering for each document |
//! | [`naming`] | Slugs, titles from file stems, leading-number sort keys |
//! | [`convert`] | Word → HTML conversion with per-entry image numbering |
//! | [`sync`] | Folder download through a configurable command with one fallback |
//! | [`generate`] | Maud templates for entry pages and the three index pages |
//! | [`pipeline`] | Phase sequencing, manifest and failure capture |
//! | [`manifest`] | Build manifest and failure artifact records |
//! | [`config`] | `drive-notes.toml` loading and validation |
//! | [`types`] | Shared types (`Entry`, `DocumentKind`, `SortKey`) |
//! | [`logging`] | `tracing` subscriber writing to stderr and the run log |
//! | [`output`] | CLI output formatting |
//!
//! # Determinism
//!
//! Files are visited in case-insensitive full-path order and every collision
//! is settled by that order, so an unchanged folder always produces the same
//! renames, the same output paths and the same page order.

pub mod config;
pub mod convert;
pub mod generate;
pub mod logging;
pub mod manifest;
pub mod naming;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod resolve;
pub mod sniff;
pub mod sync;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;

use clap::{Parser, Subcommand};
use drive_notes::config::{self, DEFAULT_CONFIG_FILE, SiteConfig};
use drive_notes::convert::DocxConverter;
use drive_notes::manifest::{BuildManifest, FailureArtifact, StatePaths};
use drive_notes::pipeline::{self, Pipeline, RunOptions};
use drive_notes::sync::CommandFetcher;
use drive_notes::{logging, output};
use std::path::PathBuf;

/// Environment variable holding the Drive folder URL; overrides the config file.
const FOLDER_URL_ENV: &str = "GDRIVE_FOLDER_URL";

#[derive(Parser)]
#[command(name = "drive-notes")]
#[command(about = "Publish a shared Drive folder of DOCX/PDF notes as a static site")]
#[command(long_about = "\
Publish a shared Drive folder of DOCX/PDF notes as a static site

The folder is downloaded into the source directory, every file is checked
by content (not by name), misnamed documents are renamed, and each document
becomes a page plus a downloadable copy:

  content/drive/Week 1/03_Lecture      (a DOCX without extension)
    → content/drive/Week 1/03_Lecture.docx
    → docs/notes/week-1/03-lecture.html
    → docs/downloads/week-1/03-lecture.docx

The folder must be shared as \"Anyone with the link\". Private files come
back as HTML sign-in pages, which fail the build with a list of offenders.

Build state is recorded in the state directory:
  build-manifest.json   last build's status and entries
  build-failure.json    error, failing entry and log tail (failed runs only)
  build.log             log of the last run

Run 'drive-notes gen-config' to generate a documented drive-notes.toml.")]
#[command(version)]
struct Cli {
    /// Config file
    #[arg(long, default_value = DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    /// Directory the Drive folder is downloaded into
    #[arg(long, global = true)]
    source: Option<PathBuf>,

    /// Site output directory
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// Directory for the build manifest, failure artifact and run log
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Download the Drive folder into the source directory
    Sync,
    /// Normalize and resolve the source directory without building
    Check,
    /// Build the site from the source directory
    Build,
    /// Sync, then build
    Run,
    /// Show the last recorded build
    Status,
    /// Print a stock drive-notes.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let site_config = load_site_config(&cli)?;
    let state = StatePaths::new(&site_config.state.dir);

    match cli.command {
        Command::Check => {
            logging::init_stderr()?;
            println!("==> Checking {}", site_config.source.dir.display());
            let (report, entries) = pipeline::collect(&site_config)?;
            output::print_normalize_report(&report);
            output::print_entries(&entries, &site_config.site.root_group);
            println!("==> Content is valid");
        }
        Command::Status => {
            if !state.manifest().exists() {
                println!("No build recorded in {}", state.dir().display());
                return Ok(());
            }
            let manifest = BuildManifest::load(&state.manifest())?;
            let failure = if state.failure().exists() {
                Some(FailureArtifact::load(&state.failure())?)
            } else {
                None
            };
            output::print_status(&manifest, failure.as_ref());
        }
        Command::Sync | Command::Build | Command::Run => {
            let options = match cli.command {
                Command::Sync => RunOptions {
                    sync: true,
                    build: false,
                },
                Command::Build => RunOptions {
                    sync: false,
                    build: true,
                },
                _ => RunOptions {
                    sync: true,
                    build: true,
                },
            };
            logging::init(&state.log())?;

            let fetcher = CommandFetcher::new(&site_config.sync);
            let converter = DocxConverter;
            let pipeline = Pipeline::new(&site_config, &fetcher, &converter);
            let report = pipeline.run(options)?;

            if report.synced {
                println!("==> Synced into {}", site_config.source.dir.display());
            }
            if let Some(normalized) = &report.normalize {
                output::print_normalize_report(normalized);
                output::print_entries(&report.entries, &site_config.site.root_group);
                output::print_build_report(&report);
                println!("==> Build complete: {}", site_config.output.dir.display());
            }
        }
        // Handled before config loading.
        Command::GenConfig => {}
    }

    Ok(())
}

/// Config file, then environment, then CLI flags.
fn load_site_config(cli: &Cli) -> Result<SiteConfig, Box<dyn std::error::Error>> {
    let mut site_config = config::load_config(&cli.config)?;
    if let Some(url) = std::env::var(FOLDER_URL_ENV)
        .ok()
        .filter(|url| !url.trim().is_empty())
    {
        site_config.source.folder_url = Some(url);
    }
    if let Some(source) = &cli.source {
        site_config.source.dir = source.clone();
    }
    if let Some(output) = &cli.output {
        site_config.output.dir = output.clone();
    }
    if let Some(state_dir) = &cli.state_dir {
        site_config.state.dir = state_dir.clone();
    }
    site_config.validate()?;
    Ok(site_config)
}

//! Reelcut CLI: offline tooling for session-replay video pipelines.
//!
//! Usage:
//!   reelcut validate <SESSION>    Validate an uploaded session file
//!   reelcut info <SESSION>        Show session information
//!   reelcut correlate <MANIFEST>  Fold metadata onto clip windows
//!   reelcut slice <MANIFEST>      Slice clips out of a rendered video
//!   reelcut check                 Check system capabilities
//!
//! Rendering itself needs a page backend and runs inside the pipeline
//! host; this tool covers everything that works from files on disk.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "reelcut",
    about = "Session-replay to per-interaction video clips",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate an uploaded session file
    Validate {
        /// Path to the session JSON file
        path: PathBuf,
    },

    /// Show session information
    Info {
        /// Path to the session JSON file
        path: PathBuf,
    },

    /// Fold a capture manifest's metadata onto clip windows
    Correlate {
        /// Path to the capture manifest JSON
        manifest: PathBuf,
    },

    /// Slice per-interaction clips out of a rendered video
    Slice {
        /// Path to the capture manifest JSON
        manifest: PathBuf,

        /// Directory to write clips and thumbnails into
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Per-trim timeout in milliseconds
        #[arg(long, default_value = "60000")]
        timeout_ms: u64,
    },

    /// Check system capabilities
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    reelcut_common::logging::init_logging(&reelcut_common::config::LoggingConfig {
        level: log_level.to_string(),
        json: false,
        file: None,
    });

    match cli.command {
        Commands::Validate { path } => commands::validate::run(path),
        Commands::Info { path } => commands::info::run(path),
        Commands::Correlate { manifest } => commands::correlate::run(manifest),
        Commands::Slice {
            manifest,
            output,
            timeout_ms,
        } => commands::slice::run(manifest, output, timeout_ms).await,
        Commands::Check => commands::check::run(),
    }
}

//! Conform CLI — Transcribe between interchange containers and timelines.
//!
//! Usage:
//!   conform read <CONTAINER>       Transcribe a container to a timeline file
//!   conform write <TIMELINE> <OUT> Transcribe a timeline file to a container
//!   conform info <CONTAINER>       Show a container's mob structure

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "conform",
    about = "Bidirectional timeline transcription for editorial interchange containers",
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
    /// Transcribe a container into a timeline file
    Read {
        /// Path to the container
        path: PathBuf,

        /// Output timeline file (defaults to the input with .timeline.json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Keep the raw structure instead of simplifying it
        #[arg(long)]
        no_simplify: bool,

        /// Attach markers to the nearest item instead of track scope
        #[arg(long)]
        attach_markers: bool,

        /// Bake keyframed speed curves to per-frame maps
        #[arg(long)]
        bake_keyframed_properties: bool,

        /// Trace per-segment transcription decisions
        #[arg(long)]
        transcribe_log: bool,
    },

    /// Transcribe a timeline file into a container
    Write {
        /// Path to the timeline file
        timeline: PathBuf,

        /// Output container path
        output: PathBuf,
    },

    /// Show a container's mob structure
    Info {
        /// Path to the container
        path: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logging = if cli.verbose {
        conform_common::config::LoggingConfig::verbose()
    } else {
        conform_common::config::LoggingConfig::default()
    };
    conform_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Read {
            path,
            output,
            no_simplify,
            attach_markers,
            bake_keyframed_properties,
            transcribe_log,
        } => commands::read::run(
            path,
            output,
            !no_simplify,
            attach_markers,
            bake_keyframed_properties,
            transcribe_log,
        ),
        Commands::Write { timeline, output } => commands::write::run(timeline, output),
        Commands::Info { path } => commands::info::run(path),
    }
}

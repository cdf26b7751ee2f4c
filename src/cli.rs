use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "scribeflow")]
#[command(author, version, about = "Audio transcription pipeline with API key rotation")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Transcribe the next inbox recording (or a given file)
    Run {
        /// Process this file instead of the next inbox recording
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Show the configured API key pool and rotation cursor
    Keys,

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}

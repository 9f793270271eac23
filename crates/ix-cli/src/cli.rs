//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Interaction telemetry recorder.
///
/// Controls recording sessions, replays captured input through the
/// segmentation engine and exports consolidated segments.
#[derive(Debug, Parser)]
#[command(name = "ix", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Begin recording a new session.
    Start,

    /// Stop recording.
    Stop,

    /// Show recording state and counters.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Export all sessions as consolidated segments.
    Export {
        /// Directory to write the export into (defaults to the configured export dir).
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Erase all sessions and reset counters.
    Clear,

    /// Replay a raw input script through a page on virtual time.
    Simulate {
        /// JSONL file with one `{"at_ms": ..., "type": ...}` input per line.
        #[arg(long)]
        script: PathBuf,

        /// URL of the simulated page.
        #[arg(long, default_value = "https://example.test/")]
        url: String,

        /// Keep the page open until this virtual time (ms) after the last input.
        #[arg(long)]
        until: Option<u64>,
    },
}

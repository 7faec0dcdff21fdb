use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "svcwrap")]
#[command(about = "Generate callback-style wrappers for remote service traits", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate extension units for every marked trait under a source tree
    Generate {
        /// Source root to scan (usually a crate's `src`)
        source: PathBuf,

        /// Output directory for generated units
        #[arg(short, long)]
        out: PathBuf,

        /// Configuration file (defaults to the nearest svcwrap.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print the build report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List marked traits and how each operation is classified
    Scan {
        /// Source root to scan
        source: PathBuf,

        /// Configuration file (defaults to the nearest svcwrap.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print descriptors as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a default svcwrap.toml
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,

        /// Directory to write into
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
}

/// Default log filter for a `-v` count; `SVCWRAP_LOG` overrides it
pub fn default_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

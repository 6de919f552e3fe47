//! Command line interface definition

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// strand - verified record stream downloader
#[derive(Parser)]
#[command(name = "strand")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Download, verify and chain record stream files")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH", env = "STRAND_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run download cycles until interrupted
    Run {
        /// Run a single cycle and exit
        #[arg(long)]
        once: bool,

        /// Pause between cycles, overriding the config file
        #[arg(long, value_name = "SECS")]
        interval_secs: Option<u64>,

        /// Append committed file summaries to this file instead of stdout
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Decode a local record file and print its summary as JSON
    Parse {
        /// Record file named after its consensus timestamp
        file: PathBuf,
    },

    /// Print the filename of a block
    BlockFilename {
        #[arg(allow_negative_numbers = true)]
        number: i64,
    },
}

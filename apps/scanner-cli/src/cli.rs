use clap::{Parser, Subcommand};
use std::path::PathBuf;

use scanner_core::{DatasetId, RecordFilter};

#[derive(Parser)]
#[command(name = "scanner")]
#[command(about = "Handheld inventory scanner with offline queueing", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to scanner.toml (defaults to the platform config dir)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Connect to an inventory server and remember it
    Connect {
        /// Server address, e.g. 192.168.1.20:8000
        url: String,
    },

    /// List datasets on the server
    Datasets,

    /// Make a dataset the active one
    Activate {
        dataset_id: DatasetId,
    },

    /// Scan box codes (from arguments, or one per line on stdin)
    Scan {
        codes: Vec<String>,
    },

    /// Show locally cached records of the active dataset
    Records {
        /// all | found | not-found
        #[arg(short, long, default_value = "all")]
        filter: RecordFilter,
    },

    /// Upload queued scans now
    Sync,

    /// Show connection and queue status
    Status {
        /// Keep printing the queue size until Ctrl-C
        #[arg(short, long)]
        watch: bool,
    },

    /// Show the latest scans recorded by the server
    Remote {
        #[arg(short, long, default_value = "20")]
        limit: u32,
    },

    /// Delete cached records of a dataset
    Clear {
        dataset_id: DatasetId,
    },
}

//! CLI command definitions for the `wpt` binary.
//!
//! Uses clap derive macros for argument parsing. Operation ids are always
//! the encoded form printed by `wpt start`.

pub mod init;
pub mod operation;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Run, pause and resume checkpointed operations.
#[derive(Parser)]
#[command(name = "wpt", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Export tracing spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true, env = "WAYPOINT_OTEL")]
    pub otel: bool,

    /// Requester recorded on new operations and used to filter listings.
    #[arg(long, global = true, env = "WAYPOINT_REQUESTER", default_value = "cli")]
    pub requester: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the data directory, run migrations and write a default config.
    Init,

    /// Start an operation and run it until it completes or pauses.
    Start {
        #[command(subcommand)]
        operation: StartOperation,
    },

    /// Request a pause; the operation stops at its next checkpoint.
    Pause {
        /// Encoded operation id.
        id: String,
    },

    /// Resume a paused operation and run it until it completes or pauses again.
    Resume {
        /// Encoded operation id.
        id: String,
    },

    /// Cancel a paused operation.
    Cancel {
        /// Encoded operation id.
        id: String,
    },

    /// Show status and result of an operation.
    Status {
        /// Encoded operation id.
        id: String,
    },

    /// List operations, newest first.
    #[command(alias = "ls")]
    List {
        /// List operations of every requester.
        #[arg(long)]
        all: bool,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum StartOperation {
    /// add(1, 2) | mult(4), completing with 12.
    Arith,

    /// Stream a CSV file and count `count_by` values per `group_by` key.
    Tally {
        /// CSV file with a header row.
        file: PathBuf,

        /// Column whose values become the tally keys.
        #[arg(long, default_value = "company")]
        group_by: String,

        /// Column whose values are counted per key.
        #[arg(long, default_value = "gender")]
        count_by: String,
    },
}

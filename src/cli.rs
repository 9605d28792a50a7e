//! CLI surface (`clap` derive). Output formatting and colorization are
//! left to the terminal and to `tracing`'s own formatter; this module
//! only declares the argument surface the commands in `commands/` are
//! invoked through.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "polyrun")]
#[command(about = "Local multi-service developer orchestrator", long_about = None)]
pub struct Cli {
    /// Explicit path to the manifest; otherwise located by walking
    /// upward from the current directory.
    #[arg(long, global = true)]
    pub manifest: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Detect, allocate ports for, and launch every service (or a subset)
    /// in parallel, then block until an operator signal.
    Run {
        /// Launch only these services; launches all of them when empty.
        services: Vec<String>,

        /// Write operator-approved flexible port reassignments back to
        /// the manifest. Off by default.
        #[arg(long)]
        write_ports: bool,

        /// Mirror every log entry to `.polyrun/logs/<service>.jsonl`.
        #[arg(long)]
        mirror_logs: bool,
    },
    /// Reconcile and print the current service registry.
    Status,
    /// Force-stop every registered service from a previous `run`
    /// invocation (this process holds no live `Child` handles of its
    /// own, so termination goes through `ports::holder`/PID signaling
    /// rather than the in-process `ShutdownCoordinator`).
    Stop,
    /// Print buffered logs for one service from its on-disk JSONL
    /// mirror, optionally following new lines.
    Logs {
        service: String,

        #[arg(short, long)]
        follow: bool,

        #[arg(short = 'n', long, default_value_t = 50)]
        lines: usize,
    },
}

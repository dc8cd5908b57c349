//! Consolidator: department upload consolidation.
//!
//! # Usage
//!
//! ```text
//! consolidator start [--config PATH]
//! consolidator cycle [--manual] [--json] [--config PATH]
//! consolidator scan [--config PATH]
//! consolidator audit [--date YYYYMMDD] [--json] [--config PATH]
//! consolidator config show|init [--config PATH]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    audit::AuditArgs, config::ConfigCommand, cycle::CycleArgs, scan::ScanArgs, start::StartArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "consolidator",
    version,
    about = "Consolidate department XML uploads into the reporting directory",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the control loop in the foreground until SIGTERM or ctrl-c.
    Start(StartArgs),

    /// Run one backup and transfer cycle now.
    Cycle(CycleArgs),

    /// Record every file in the upload area to the change log.
    Scan(ScanArgs),

    /// Check which departments delivered their file for a date.
    Audit(AuditArgs),

    /// Inspect or create the configuration file.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Start(args) => args.run(),
        Commands::Cycle(args) => args.run(),
        Commands::Scan(args) => args.run(),
        Commands::Audit(args) => args.run(),
        Commands::Config { command } => commands::config::run(command),
    }
}

//! `consolidator cycle`: one backup and transfer cycle, right now.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use consolidator_core::Trigger;
use consolidator_engine::{run_cycle, CycleOutcome, CycleState, CycleSummary, FsCycle, NullNotifier};

use super::ConfigArg;

#[derive(Args, Debug)]
pub struct CycleArgs {
    /// Skip the completeness check, as an operator-triggered cycle does.
    #[arg(long)]
    pub manual: bool,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub config: ConfigArg,
}

#[derive(Tabled)]
struct TransferRow {
    #[tabled(rename = "department")]
    department: String,
    #[tabled(rename = "file")]
    file: String,
    #[tabled(rename = "bytes")]
    bytes: u64,
}

impl CycleArgs {
    pub fn run(self) -> Result<()> {
        let config = self.config.prepare()?;
        let trigger = if self.manual {
            Trigger::Manual
        } else {
            Trigger::Scheduled
        };

        let mut steps = FsCycle::new(config.layout.clone(), Arc::new(NullNotifier));
        let mut state = CycleState::default();
        let summary = match run_cycle(&mut state, &mut steps, trigger, Local::now()) {
            CycleOutcome::Completed(summary) => summary,
            CycleOutcome::LockFailed(err) => {
                return Err(err).context("could not lock directories; nothing was transferred")
            }
            CycleOutcome::Skipped => bail!("another cycle is already running"),
        };

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&summary).context("failed to serialize cycle JSON")?
            );
            return Ok(());
        }

        print_summary(summary);
        Ok(())
    }
}

fn print_summary(summary: CycleSummary) {
    println!(
        "{} cycle finished in {} ms",
        summary.trigger.to_string().bold(),
        summary.duration_ms,
    );

    match &summary.snapshot {
        Some(snapshot) => println!(
            "backup: {} ({} files{})",
            snapshot.backup_dir.display(),
            snapshot.copied.len(),
            failure_note(snapshot.failures),
        ),
        None => println!("backup: {}", "failed".red()),
    }

    let rows: Vec<TransferRow> = summary
        .transfer
        .transferred
        .iter()
        .map(|file| TransferRow {
            department: file.department.to_string(),
            file: file.name.clone(),
            bytes: file.bytes,
        })
        .collect();
    if rows.is_empty() {
        println!("transfer: no uploads{}", failure_note(summary.transfer.failures));
    } else {
        println!(
            "transfer: {} files{}",
            rows.len(),
            failure_note(summary.transfer.failures)
        );
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
    }

    if let Some(report) = &summary.completeness {
        if report.is_complete() {
            println!("completeness: {}", "all departments delivered".green());
        } else {
            for missing in &report.missing {
                println!(
                    "completeness: {} {}",
                    "MISSING".red().bold(),
                    missing.expected
                );
            }
        }
    }

    if !summary.unlocked {
        println!(
            "{}",
            "directories could not be unlocked; see errors.log".red().bold()
        );
    }
}

fn failure_note(failures: usize) -> String {
    if failures == 0 {
        String::new()
    } else {
        format!(", {}", format!("{failures} failed").red())
    }
}

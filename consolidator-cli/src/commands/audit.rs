//! `consolidator audit`: completeness check for one date.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use consolidator_core::Department;
use consolidator_engine::{check_completeness, CompletenessReport};

use super::ConfigArg;

#[derive(Args, Debug)]
pub struct AuditArgs {
    /// Date to check, as YYYYMMDD (default: today).
    #[arg(long, value_parser = parse_date)]
    pub date: Option<NaiveDate>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub config: ConfigArg,
}

#[derive(Tabled)]
struct AuditRow {
    #[tabled(rename = "department")]
    department: String,
    #[tabled(rename = "expected file")]
    expected: String,
    #[tabled(rename = "status")]
    status: String,
}

impl AuditArgs {
    pub fn run(self) -> Result<()> {
        let config = self.config.prepare()?;
        let date = self.date.unwrap_or_else(|| Local::now().date_naive());

        let report = check_completeness(&config.layout.reporting_root, date);
        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize audit JSON")?
            );
            return Ok(());
        }

        print_table(&report);
        Ok(())
    }
}

fn parse_date(raw: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw, "%Y%m%d")
        .map_err(|err| format!("expected YYYYMMDD, got '{raw}': {err}"))
}

fn print_table(report: &CompletenessReport) {
    println!(
        "Uploads for {} | {} of {} departments delivered",
        report.date.format("%Y-%m-%d"),
        report.present.len(),
        Department::ALL.len(),
    );

    let rows: Vec<AuditRow> = Department::ALL
        .into_iter()
        .map(|department| {
            let delivered = report.present.contains(&department);
            AuditRow {
                department: department.to_string(),
                expected: department.expected_file_name(report.date),
                status: if delivered {
                    "present".green().to_string()
                } else {
                    "MISSING".red().bold().to_string()
                },
            }
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}

//! `consolidator scan`: one change scan over the last interval.

use std::time::SystemTime;

use anyhow::Result;
use clap::Args;

use consolidator_engine::ChangeAuditor;

use super::ConfigArg;

#[derive(Args, Debug)]
pub struct ScanArgs {
    #[command(flatten)]
    pub config: ConfigArg,
}

impl ScanArgs {
    pub fn run(self) -> Result<()> {
        let config = self.config.prepare()?;

        let mut auditor = ChangeAuditor::new(config.scan_interval());
        let Some(report) = auditor.scan(&config.layout, SystemTime::now()) else {
            return Ok(());
        };

        for record in &report.records {
            println!("{}", record.to_line());
        }
        println!(
            "{} files recorded in {}",
            report.records.len(),
            config.layout.change_log_path().display()
        );
        if report.failures > 0 {
            println!("{} errors; see errors.log", report.failures);
        }
        Ok(())
    }
}

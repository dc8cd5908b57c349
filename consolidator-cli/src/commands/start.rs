//! `consolidator start`: foreground control loop.

use anyhow::{Context, Result};
use clap::Args;

use consolidator_daemon::start_blocking;

use super::ConfigArg;

#[derive(Args, Debug)]
pub struct StartArgs {
    #[command(flatten)]
    pub config: ConfigArg,
}

impl StartArgs {
    pub fn run(self) -> Result<()> {
        let config = self.config.load()?;
        start_blocking(config).context("daemon exited with error")
    }
}

pub mod audit;
pub mod config;
pub mod cycle;
pub mod scan;
pub mod start;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use consolidator_core::{config as core_config, DaemonConfig};
use consolidator_daemon::{init_tracing, resolve_config_path};

/// `--config`, shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArg {
    /// Path to the YAML config (default: $CONSOLIDATOR_CONFIG, then
    /// /etc/consolidator/consolidator.yaml).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl ConfigArg {
    pub fn path(&self) -> PathBuf {
        resolve_config_path(self.config.as_deref())
    }

    /// An explicit path must exist; the implicit one falls back to defaults.
    pub fn load(&self) -> Result<DaemonConfig> {
        let path = self.path();
        let loaded = if self.config.is_some() {
            core_config::load_at(&path)
        } else {
            core_config::load_or_default_at(&path)
        };
        loaded.with_context(|| format!("failed to load config from {}", path.display()))
    }

    /// Load the config, provision the layout and install the tracing stack.
    pub fn prepare(&self) -> Result<DaemonConfig> {
        let config = self.load()?;
        config
            .layout
            .provision()
            .context("failed to provision directory layout")?;
        init_tracing(config.log_format, &config.layout.error_log_path());
        Ok(config)
    }
}

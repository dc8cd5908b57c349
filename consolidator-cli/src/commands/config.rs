//! `consolidator config`: show or create the configuration file.

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};

use consolidator_core::{config, DaemonConfig};

use super::ConfigArg;

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration as YAML.
    Show(ConfigArg),
    /// Write the default configuration.
    Init(ConfigInitArgs),
}

#[derive(Args, Debug)]
pub struct ConfigInitArgs {
    /// Overwrite an existing file.
    #[arg(long)]
    pub force: bool,

    #[command(flatten)]
    pub config: ConfigArg,
}

pub fn run(command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show(arg) => {
            let config = arg.load()?;
            print!(
                "{}",
                config::to_yaml(&config).context("failed to render config")?
            );
        }
        ConfigCommand::Init(args) => {
            let path = args.config.path();
            if path.exists() && !args.force {
                bail!(
                    "{} already exists; pass --force to overwrite",
                    path.display()
                );
            }
            config::save_at(&path, &DaemonConfig::default())
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("wrote default config to {}", path.display());
        }
    }
    Ok(())
}

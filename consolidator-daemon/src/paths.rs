use std::ffi::OsString;
use std::path::{Path, PathBuf};

use consolidator_core::config::DEFAULT_CONFIG_PATH;

pub const DAEMON_LABEL: &str = "consolidator";

/// Environment variable naming the config file when `--config` is absent.
pub const CONFIG_ENV: &str = "CONSOLIDATOR_CONFIG";

/// `--config` wins, then `$CONSOLIDATOR_CONFIG`, then the system default.
pub fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
    resolve_config_path_from(explicit, std::env::var_os(CONFIG_ENV))
}

fn resolve_config_path_from(explicit: Option<&Path>, env: Option<OsString>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    match env {
        Some(value) if !value.is_empty() => PathBuf::from(value),
        _ => PathBuf::from(DEFAULT_CONFIG_PATH),
    }
}

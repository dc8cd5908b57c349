//! Error types for consolidator-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from loading, saving, or provisioning configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure, annotated with the path involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML serialization error (save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load: includes file path and line context from serde_yaml.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The config file did not exist at the expected path.
    #[error("config not found at {path}")]
    ConfigNotFound { path: PathBuf },

    /// The daily trigger is not a valid wall-clock time.
    #[error("invalid schedule {hour:02}:{minute:02}; expected hour < 24 and minute < 60")]
    InvalidSchedule { hour: u32, minute: u32 },

    /// A tick or scan interval of zero seconds.
    #[error("{field} must be greater than zero")]
    InvalidInterval { field: &'static str },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}

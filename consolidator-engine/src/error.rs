//! Error types for consolidator-engine.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from engine operations.
///
/// Per-file failures inside transfer, snapshot and change scans are logged
/// and skipped; only whole-operation failures surface as an `EngineError`.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A permission change on a shared directory failed.
    #[error("failed to change lock mode of {path}: {source}")]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `chown` on a transferred file failed.
    #[error("failed to preserve ownership of {path}: {source}")]
    Ownership {
        path: PathBuf,
        #[source]
        source: nix::Error,
    },
}

/// Convenience constructor for [`EngineError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> EngineError {
    EngineError::Io {
        path: path.into(),
        source,
    }
}

/// Convenience constructor for [`EngineError::Lock`].
pub(crate) fn lock_err(path: impl Into<PathBuf>, source: std::io::Error) -> EngineError {
    EngineError::Lock {
        path: path.into(),
        source,
    }
}

//! Directory lock controller.
//!
//! The upload root and the reporting root are switched to `0555` for the
//! duration of a cycle and back to `0755` afterwards. The permission bits are
//! the exclusion primitive: they are visible to every process on the host and
//! survive a daemon restart.
//!
//! `lock` never leaves exactly one directory locked: if the reporting root
//! cannot be locked, the upload root is reset before the error is returned.
//! `unlock` only ever *sets* modes, so a later `lock` works no matter what
//! state a failed unlock left behind.

use std::path::{Path, PathBuf};

use consolidator_core::Layout;

use crate::error::{lock_err, EngineError};

/// Mode of a locked directory: traversal only.
pub const LOCKED_MODE: u32 = 0o555;

/// Mode of an unlocked directory.
pub const UNLOCKED_MODE: u32 = 0o755;

#[derive(Debug, Clone)]
pub struct DirectoryLock {
    upload: PathBuf,
    reporting: PathBuf,
}

impl DirectoryLock {
    pub fn new(upload: impl Into<PathBuf>, reporting: impl Into<PathBuf>) -> Self {
        Self {
            upload: upload.into(),
            reporting: reporting.into(),
        }
    }

    pub fn for_layout(layout: &Layout) -> Self {
        Self::new(&layout.upload_root, &layout.reporting_root)
    }

    /// Make both directories read-only, upload root first.
    pub fn lock(&self) -> Result<(), EngineError> {
        tracing::info!("locking directories");

        if let Err(err) = set_mode(&self.upload, LOCKED_MODE) {
            tracing::error!(
                path = %self.upload.display(),
                error = %err,
                "failed to lock upload directory",
            );
            return Err(lock_err(&self.upload, err));
        }

        if let Err(err) = set_mode(&self.reporting, LOCKED_MODE) {
            tracing::error!(
                path = %self.reporting.display(),
                error = %err,
                "failed to lock reporting directory",
            );
            if let Err(rollback) = set_mode(&self.upload, UNLOCKED_MODE) {
                tracing::error!(
                    path = %self.upload.display(),
                    error = %rollback,
                    "failed to reset upload directory after partial lock",
                );
            }
            return Err(lock_err(&self.reporting, err));
        }

        Ok(())
    }

    /// Make both directories writable again.
    ///
    /// Both directories are attempted; the first failure is returned.
    pub fn unlock(&self) -> Result<(), EngineError> {
        tracing::info!("unlocking directories");

        let mut first_failure = None;
        for (label, dir) in [("upload", &self.upload), ("reporting", &self.reporting)] {
            if let Err(err) = set_mode(dir, UNLOCKED_MODE) {
                tracing::error!(
                    path = %dir.display(),
                    error = %err,
                    "failed to unlock {label} directory",
                );
                first_failure.get_or_insert_with(|| lock_err(dir, err));
            }
        }

        match first_failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Unlock during shutdown cleanup, when a cycle never got to release.
    pub fn force_unlock(&self) -> Result<(), EngineError> {
        tracing::warn!("cycle still marked running at shutdown; forcing unlock");
        self.unlock()
    }
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    let mut perms = std::fs::metadata(path)?.permissions();
    perms.set_readonly(mode & 0o200 == 0);
    std::fs::set_permissions(path, perms)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Snapshot engine: reporting directory → fresh backup directory.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};
use serde::Serialize;

use consolidator_core::Layout;

use crate::copy::{copy_contents, regular_file_metadata};
use crate::error::{io_err, EngineError};
use crate::notify::{Notification, Notifier};

/// Upper bound on same-second suffixes tried before giving up.
const MAX_SAME_SECOND_SUFFIX: u32 = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotReport {
    pub backup_dir: PathBuf,
    pub copied: Vec<String>,
    /// Files that could not be copied. Each one was logged.
    pub failures: usize,
}

/// `backup_YYYYMMDD_HHMMSS` for the invocation time.
pub fn backup_dir_name<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("backup_{}", now.format("%Y%m%d_%H%M%S"))
}

/// Copy every regular file directly under the reporting root into a new
/// backup directory.
///
/// Fails only when the backup directory cannot be created or the reporting
/// directory cannot be listed.
pub fn snapshot_reporting<Tz: TimeZone>(
    layout: &Layout,
    now: &DateTime<Tz>,
    notifier: &dyn Notifier,
) -> Result<SnapshotReport, EngineError>
where
    Tz::Offset: std::fmt::Display,
{
    tracing::info!("starting backup of reporting directory");
    notifier.notify(Notification::BackupStarted);

    let result = snapshot_inner(layout, now);
    match &result {
        Ok(report) if report.failures == 0 => notifier.notify(Notification::BackupCompleted),
        Ok(_) => notifier.notify(Notification::BackupFailed),
        Err(err) => {
            tracing::error!(error = %err, "backup failed");
            notifier.notify(Notification::BackupFailed);
        }
    }
    result
}

fn snapshot_inner<Tz: TimeZone>(
    layout: &Layout,
    now: &DateTime<Tz>,
) -> Result<SnapshotReport, EngineError>
where
    Tz::Offset: std::fmt::Display,
{
    let backup_dir = create_backup_dir(&layout.backup_root, &backup_dir_name(now))?;

    let reporting = &layout.reporting_root;
    let entries = fs::read_dir(reporting).map_err(|e| io_err(reporting, e))?;

    let mut names = Vec::new();
    let mut failures = 0usize;
    for entry in entries {
        match entry {
            Ok(entry) => names.push(entry.file_name()),
            Err(err) => {
                tracing::error!(error = %err, "failed to read reporting directory entry");
                failures += 1;
            }
        }
    }
    names.sort();

    let mut copied = Vec::new();
    for name in names {
        let src = reporting.join(&name);
        if regular_file_metadata(&src).is_none() {
            continue;
        }
        let dst = backup_dir.join(&name);
        match copy_contents(&src, &dst) {
            Ok(_) => {
                let name = name.to_string_lossy().into_owned();
                tracing::info!("backed up {}", name);
                copied.push(name);
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to back up file");
                failures += 1;
            }
        }
    }

    tracing::info!(
        backup_dir = %backup_dir.display(),
        files = copied.len(),
        failures,
        "backup completed",
    );
    Ok(SnapshotReport {
        backup_dir,
        copied,
        failures,
    })
}

/// Create `<root>/<name>`, or `<root>/<name>_N` for the first free `N` when a
/// cycle in the same second already claimed the plain name.
fn create_backup_dir(root: &Path, name: &str) -> Result<PathBuf, EngineError> {
    let mut candidate = root.join(name);
    for suffix in 1..=MAX_SAME_SECOND_SUFFIX {
        match create_dir_exclusive(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                candidate = root.join(format!("{name}_{suffix}"));
            }
            Err(err) => return Err(io_err(&candidate, err)),
        }
    }
    Err(io_err(
        &candidate,
        std::io::Error::new(ErrorKind::AlreadyExists, "no free backup directory name"),
    ))
}

#[cfg(unix)]
fn create_dir_exclusive(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new().mode(0o755).create(path)
}

#[cfg(not(unix))]
fn create_dir_exclusive(path: &Path) -> std::io::Result<()> {
    fs::create_dir(path)
}

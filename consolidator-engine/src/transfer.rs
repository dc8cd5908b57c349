//! Transfer engine: department uploads → reporting directory.
//!
//! For every department, each regular file whose name contains `.xml` is
//! copied into the reporting root under the same (flattened) name, given the
//! source's owner, group, atime and mtime, then removed from the upload area.
//!
//! A failure on one file is logged and the loop moves on; a department whose
//! directory cannot be read is skipped without affecting the others.

use std::fs;
use std::path::PathBuf;

use serde::Serialize;

use consolidator_core::{Department, Layout};

use crate::copy::{copy_contents, preserve_provenance, regular_file_metadata};
use crate::notify::{Notification, Notifier};

/// Substring a file name must contain to be transferred.
pub const QUALIFYING_MARKER: &str = ".xml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferredFile {
    pub department: Department,
    pub name: String,
    pub destination: PathBuf,
    pub bytes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransferReport {
    pub transferred: Vec<TransferredFile>,
    /// Files (or department directories) that hit an error. Each one was logged.
    pub failures: usize,
}

pub fn is_qualifying_name(name: &str) -> bool {
    name.contains(QUALIFYING_MARKER)
}

/// Move every qualifying upload into the reporting directory.
pub fn transfer_uploads(layout: &Layout, notifier: &dyn Notifier) -> TransferReport {
    tracing::info!("starting transfer of uploads");
    notifier.notify(Notification::TransferStarted);

    let mut report = TransferReport::default();
    for department in Department::ALL {
        transfer_department(layout, department, &mut report);
    }

    notifier.notify(if report.failures == 0 {
        Notification::TransferCompleted
    } else {
        Notification::TransferFailed
    });
    tracing::info!(
        transferred = report.transferred.len(),
        failures = report.failures,
        "transfer completed",
    );
    report
}

fn transfer_department(layout: &Layout, department: Department, report: &mut TransferReport) {
    let dept_dir = layout.department_dir(department);
    let entries = match fs::read_dir(&dept_dir) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::error!(
                department = %department,
                path = %dept_dir.display(),
                error = %err,
                "failed to open department directory",
            );
            report.failures += 1;
            return;
        }
    };

    // `read_dir` never yields `.` or `..`.
    let mut names = Vec::new();
    for entry in entries {
        match entry {
            Ok(entry) => names.push(entry.file_name()),
            Err(err) => {
                tracing::error!(
                    department = %department,
                    error = %err,
                    "failed to read department directory entry",
                );
                report.failures += 1;
            }
        }
    }
    names.sort();

    for name in names {
        let display_name = name.to_string_lossy().into_owned();
        if !is_qualifying_name(&display_name) {
            continue;
        }

        let src = dept_dir.join(&name);
        let Some(meta) = regular_file_metadata(&src) else {
            continue;
        };
        let dst = layout.reporting_root.join(&name);

        let bytes = match copy_contents(&src, &dst) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::error!(department = %department, error = %err, "failed to copy upload");
                report.failures += 1;
                continue;
            }
        };

        if let Err(err) = preserve_provenance(&dst, &meta) {
            // The content is in place; keeping the source would re-send it every cycle.
            tracing::error!(department = %department, error = %err, "failed to preserve metadata");
            report.failures += 1;
        }

        if let Err(err) = fs::remove_file(&src) {
            tracing::error!(
                department = %department,
                path = %src.display(),
                error = %err,
                "failed to remove transferred upload",
            );
            report.failures += 1;
        }

        tracing::info!(
            "transferred {} from {} to reporting directory",
            display_name,
            department,
        );
        report.transferred.push(TransferredFile {
            department,
            name: display_name,
            destination: dst,
            bytes,
        });
    }
}

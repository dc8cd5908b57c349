//! Change auditor: periodic mtime scan of the upload area.
//!
//! A scan runs at most once per `interval`. It reports every regular file in
//! a department directory whose mtime is newer than `last_scan - interval`,
//! so consecutive windows overlap by one interval and a file can be reported
//! by two successive scans. The first scan looks back one interval from
//! its own start, so a restart does not replay old uploads.
//!
//! The auditor never takes the directory lock; files still being written by
//! a producer are reported like any other.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Local};
use serde::Serialize;

use consolidator_core::{Department, Layout};

use crate::copy::regular_file_metadata;

pub const UNKNOWN_USER: &str = "unknown";
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditRecord {
    pub modified_at: DateTime<Local>,
    pub user: String,
    pub path: PathBuf,
}

impl AuditRecord {
    /// `[YYYY-MM-DD HH:MM:SS] User '<name>' modified file '<path>'`
    pub fn to_line(&self) -> String {
        format!(
            "[{}] User '{}' modified file '{}'",
            self.modified_at.format("%Y-%m-%d %H:%M:%S"),
            self.user,
            self.path.display(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub records: Vec<AuditRecord>,
    /// Directories, entries or log writes that failed. Each one was logged.
    pub failures: usize,
}

#[derive(Debug, Clone)]
pub struct ChangeAuditor {
    interval: Duration,
    last_scan: Option<SystemTime>,
}

impl Default for ChangeAuditor {
    fn default() -> Self {
        Self::new(DEFAULT_SCAN_INTERVAL)
    }
}

impl ChangeAuditor {
    /// A never-scanned auditor.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_scan: None,
        }
    }

    #[cfg(test)]
    fn resumed(interval: Duration, last_scan: SystemTime) -> Self {
        Self {
            interval,
            last_scan: Some(last_scan),
        }
    }

    pub fn last_scan(&self) -> Option<SystemTime> {
        self.last_scan
    }

    pub fn is_due(&self, now: SystemTime) -> bool {
        match self.last_scan {
            None => true,
            // A clock that went backwards counts as "not yet".
            Some(last) => now
                .duration_since(last)
                .map(|elapsed| elapsed >= self.interval)
                .unwrap_or(false),
        }
    }

    /// Files with an mtime strictly after this instant are reported.
    pub fn window_start(&self, now: SystemTime) -> SystemTime {
        self.last_scan
            .unwrap_or(now)
            .checked_sub(self.interval)
            .unwrap_or(SystemTime::UNIX_EPOCH)
    }

    /// Scan the upload area and append one audit record per changed file.
    ///
    /// Returns `None` without touching the filesystem when the previous scan
    /// was less than one interval ago. Otherwise `last_scan` becomes `now`,
    /// whatever the outcome.
    pub fn scan(&mut self, layout: &Layout, now: SystemTime) -> Option<ScanReport> {
        if !self.is_due(now) {
            tracing::debug!("change scan not due yet");
            return None;
        }

        let window_start = self.window_start(now);
        let mut report = ScanReport {
            records: Vec::new(),
            failures: 0,
        };

        for department in Department::ALL {
            collect_changes(
                &layout.department_dir(department),
                window_start,
                &mut report,
            );
        }
        append_records(&layout.change_log_path(), &mut report);

        self.last_scan = Some(now);
        tracing::debug!(records = report.records.len(), "change scan finished");
        Some(report)
    }
}

fn collect_changes(dir: &Path, window_start: SystemTime, report: &mut ScanReport) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::error!(path = %dir.display(), error = %err, "failed to open upload directory for change scan");
            report.failures += 1;
            return;
        }
    };

    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in entries {
        match entry {
            Ok(entry) => paths.push(entry.path()),
            Err(err) => {
                tracing::error!(path = %dir.display(), error = %err, "failed to read upload directory entry");
                report.failures += 1;
            }
        }
    }
    paths.sort();

    for path in paths {
        let Some(meta) = regular_file_metadata(&path) else {
            continue;
        };
        let modified = match meta.modified() {
            Ok(modified) => modified,
            Err(err) => {
                tracing::error!(path = %path.display(), error = %err, "failed to read modification time");
                report.failures += 1;
                continue;
            }
        };
        if modified <= window_start {
            continue;
        }

        report.records.push(AuditRecord {
            modified_at: DateTime::<Local>::from(modified),
            user: owner_name(&meta),
            path: std::path::absolute(&path).unwrap_or(path),
        });
    }
}

fn append_records(change_log: &Path, report: &mut ScanReport) {
    if report.records.is_empty() {
        return;
    }

    let mut file = match OpenOptions::new().create(true).append(true).open(change_log) {
        Ok(file) => file,
        Err(err) => {
            tracing::error!(path = %change_log.display(), error = %err, "failed to open change log");
            report.failures += 1;
            return;
        }
    };

    for record in &report.records {
        if let Err(err) = writeln!(file, "{}", record.to_line()) {
            tracing::error!(path = %change_log.display(), error = %err, "failed to append audit record");
            report.failures += 1;
        }
    }
}

#[cfg(unix)]
fn owner_name(meta: &fs::Metadata) -> String {
    use std::os::unix::fs::MetadataExt;
    resolve_user_name(meta.uid())
}

#[cfg(not(unix))]
fn owner_name(_meta: &fs::Metadata) -> String {
    UNKNOWN_USER.to_string()
}

/// The account name for `uid`, or [`UNKNOWN_USER`].
#[cfg(unix)]
pub fn resolve_user_name(uid: u32) -> String {
    match nix::unistd::User::from_uid(nix::unistd::Uid::from_raw(uid)) {
        Ok(Some(user)) => user.name,
        _ => UNKNOWN_USER.to_string(),
    }
}

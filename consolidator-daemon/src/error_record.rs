//! Durable error records.
//!
//! [`ErrorRecordLayer`] appends every error-level `tracing` event to the
//! error log as `[YYYY-MM-DD HH:MM:SS] <message> <field>=<value> ...`. The
//! file is opened per event, so rotating or deleting it from outside is safe.

use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

pub const RECORD_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn format_record(at: DateTime<Local>, message: &str) -> String {
    format!("[{}] {}", at.format(RECORD_TIMESTAMP_FORMAT), message)
}

#[derive(Debug, Clone)]
pub struct ErrorRecordLayer {
    path: PathBuf,
}

impl ErrorRecordLayer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl<S: Subscriber> Layer<S> for ErrorRecordLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() != Level::ERROR {
            return;
        }

        let mut visitor = RecordVisitor::default();
        event.record(&mut visitor);
        let line = format_record(Local::now(), &visitor.finish());

        // Reporting through tracing here would recurse into this layer.
        if let Err(err) = append_line(&self.path, &line) {
            eprintln!("failed to append to {}: {err}", self.path.display());
        }
    }
}

fn append_line(path: &Path, line: &str) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{line}")
}

#[derive(Default)]
struct RecordVisitor {
    message: String,
    fields: Vec<String>,
}

impl RecordVisitor {
    fn finish(self) -> String {
        let mut line = self.message;
        for field in self.fields {
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(&field);
        }
        line
    }
}

impl Visit for RecordVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push(format!("{}={}", field.name(), value));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.fields.push(format!("{}={:?}", field.name(), value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs;
    use tempfile::TempDir;
    use tracing_subscriber::prelude::*;

    fn with_layer(path: &Path, f: impl FnOnce()) {
        let subscriber = tracing_subscriber::registry().with(ErrorRecordLayer::new(path));
        tracing::subscriber::with_default(subscriber, f);
    }

    #[test]
    fn record_line_format() {
        let at = Local.with_ymd_and_hms(2024, 7, 1, 23, 5, 9).unwrap();
        assert_eq!(
            format_record(at, "missing upload from department sales: sales_20240701.xml"),
            "[2024-07-01 23:05:09] missing upload from department sales: sales_20240701.xml"
        );
    }

    #[test]
    fn only_error_events_are_recorded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("errors.log");

        with_layer(&path, || {
            tracing::info!("locking directories");
            tracing::warn!("forcing unlock");
            tracing::error!("missing upload from department {}: {}", "sales", "sales_x.xml");
        });

        let log = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = log.lines().collect();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with('['));
        assert!(lines[0].ends_with("] missing upload from department sales: sales_x.xml"));
    }

    #[test]
    fn structured_fields_follow_the_message() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("errors.log");
        let target = PathBuf::from("/var/company/reporting");

        with_layer(&path, || {
            tracing::error!(path = %target.display(), error = "denied", "failed to lock reporting directory");
        });

        let log = fs::read_to_string(&path).unwrap();
        assert!(log.contains(
            "failed to lock reporting directory path=/var/company/reporting error=denied"
        ));
    }

    #[test]
    fn records_append_to_existing_log() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("errors.log");
        fs::write(&path, "[2024-01-01 00:00:00] earlier\n").unwrap();

        with_layer(&path, || tracing::error!("later"));

        let log = fs::read_to_string(&path).unwrap();
        assert_eq!(log.lines().count(), 2);
        assert!(log.starts_with("[2024-01-01 00:00:00] earlier\n"));
    }

    #[test]
    fn missing_log_directory_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent").join("errors.log");
        with_layer(&path, || tracing::error!("nowhere to go"));
        assert!(!path.exists());
    }
}

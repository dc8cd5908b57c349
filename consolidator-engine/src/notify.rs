//! Best-effort outbound notifications for backup and transfer progress.
//!
//! Nothing in the engine waits on, or reacts to, a notification.
//! Implementations must not block.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Notification {
    BackupStarted,
    BackupCompleted,
    BackupFailed,
    TransferStarted,
    TransferCompleted,
    TransferFailed,
}

impl Notification {
    pub fn as_str(self) -> &'static str {
        match self {
            Notification::BackupStarted => "backup started",
            Notification::BackupCompleted => "backup completed",
            Notification::BackupFailed => "backup failed",
            Notification::TransferStarted => "transfer started",
            Notification::TransferCompleted => "transfer completed",
            Notification::TransferFailed => "transfer failed",
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Drops every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _notification: Notification) {}
}

/// Keeps every notification in memory, in order.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    seen: std::sync::Mutex<Vec<Notification>>,
}

#[cfg(test)]
impl RecordingNotifier {
    pub fn take(&self) -> Vec<Notification> {
        match self.seen.lock() {
            Ok(mut seen) => std::mem::take(&mut *seen),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

#[cfg(test)]
impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(notification);
        }
    }
}

//! Broadcast-backed [`Notifier`].

use tokio::sync::broadcast;

use consolidator_engine::{Notification, Notifier};

/// Buffered notifications per subscriber before the oldest are dropped.
pub const NOTIFICATION_CAPACITY: usize = 64;

/// Fans notifications out to every subscriber. Sending never blocks, and a
/// channel without subscribers swallows the notification.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: broadcast::Sender<Notification>,
}

impl Default for ChannelNotifier {
    fn default() -> Self {
        Self::new(NOTIFICATION_CAPACITY)
    }
}

impl ChannelNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notification: Notification) {
        let _ = self.tx.send(notification);
    }
}

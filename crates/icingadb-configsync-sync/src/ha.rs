//! HA responsibility notifications.
//!
//! The HA component decides which instance may write. Every Operator
//! registers its own listener; listeners registered after a decision receive
//! the current state immediately.

use std::fmt;
use std::sync::{Mutex, MutexGuard};

use tokio::sync::mpsc;

/// A change in write responsibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaNotification {
    IsResponsible,
    IsNotResponsible,
}

impl fmt::Display for HaNotification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HaNotification::IsResponsible => f.write_str("responsible"),
            HaNotification::IsNotResponsible => f.write_str("not responsible"),
        }
    }
}

#[derive(Default)]
struct Listeners {
    current: Option<HaNotification>,
    senders: Vec<mpsc::UnboundedSender<HaNotification>>,
}

/// Fans HA decisions out to every registered listener.
#[derive(Default)]
pub struct HaNotifier {
    inner: Mutex<Listeners>,
}

impl HaNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Listeners> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a new listener.
    ///
    /// The returned channel closes once the notifier is dropped or
    /// [`close`](Self::close) is called.
    pub fn register_notification_listener(&self) -> mpsc::UnboundedReceiver<HaNotification> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut listeners = self.lock();
        if let Some(current) = listeners.current {
            let _ = tx.send(current);
        }
        listeners.senders.push(tx);
        rx
    }

    /// Publish a decision to every live listener.
    pub fn notify(&self, notification: HaNotification) {
        let mut listeners = self.lock();
        listeners.current = Some(notification);
        listeners
            .senders
            .retain(|tx| tx.send(notification).is_ok());
        tracing::info!(
            listeners = listeners.senders.len(),
            "HA: {}",
            notification
        );
    }

    /// The last published decision.
    pub fn current(&self) -> Option<HaNotification> {
        self.lock().current
    }

    /// Number of listeners still attached.
    pub fn listener_count(&self) -> usize {
        self.lock().senders.len()
    }

    /// Close every listener channel.
    pub fn close(&self) {
        self.lock().senders.clear();
    }
}

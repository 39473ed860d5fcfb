//! Per-document notification channel.
//!
//! Observers are called synchronously, inside the mutation that produced the
//! notification. Delivery works on a snapshot of the subscriber list taken
//! when the notification is sent, so a handler may unsubscribe itself (or
//! anyone else) and subscribe new observers without disturbing the delivery in
//! progress. New observers only see later notifications.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::debug;

use crate::path::DocPath;

/// A state transition announced to observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// A mutation was committed at `path`.
    Next { path: DocPath },
    /// A mutation at `path` was rejected.
    Error { path: DocPath, message: String },
}

impl Notification {
    /// The path of the node the notification concerns.
    pub fn path(&self) -> &DocPath {
        match self {
            Notification::Next { path } | Notification::Error { path, .. } => path,
        }
    }

    /// Returns true for a committed mutation.
    pub fn is_next(&self) -> bool {
        matches!(self, Notification::Next { .. })
    }
}

/// Receives document notifications.
///
/// Closures taking a `&Notification` implement this trait.
///
/// ```rust
/// use livedoc::{Document, Notification};
/// use serde_json::json;
///
/// let doc = Document::new(json!({"*": {"type": "*"}})).unwrap();
/// doc.subscribe(|n: &Notification| println!("{:?}", n));
/// ```
pub trait Observer: Send + Sync {
    /// Called after a mutation at `path` was committed.
    fn next(&self, path: &DocPath);

    /// Called after a mutation at `path` was rejected.
    fn error(&self, path: &DocPath, message: &str) {
        debug!(path = %path, message, "unhandled document error");
    }
}

impl<F> Observer for F
where
    F: Fn(&Notification) + Send + Sync,
{
    fn next(&self, path: &DocPath) {
        self(&Notification::Next { path: path.clone() })
    }

    fn error(&self, path: &DocPath, message: &str) {
        self(&Notification::Error {
            path: path.clone(),
            message: message.to_string(),
        })
    }
}

type SubscriberList = Vec<(u64, Arc<dyn Observer>)>;

/// Subscriber list of one document.
#[derive(Default)]
pub struct NotificationChannel {
    subscribers: RwLock<SubscriberList>,
    next_id: AtomicU64,
    sent: AtomicU64,
}

impl NotificationChannel {
    /// Creates a channel with no subscribers.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers an observer.
    pub fn subscribe(self: &Arc<Self>, observer: impl Observer + 'static) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.write().push((id, Arc::new(observer)));
        debug!(subscription = id, "observer subscribed");
        Subscription {
            id,
            channel: Arc::downgrade(self),
        }
    }

    /// Removes the observer registered under `id`. Returns false if it was already gone.
    pub fn unsubscribe(&self, id: u64) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        let removed = subscribers.len() != before;
        if removed {
            debug!(subscription = id, "observer unsubscribed");
        }
        removed
    }

    /// Number of registered observers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Number of notifications sent so far.
    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    /// Announces a committed mutation.
    pub fn send_next(&self, path: &DocPath) {
        self.sent.fetch_add(1, Ordering::Relaxed);
        for observer in self.snapshot() {
            observer.next(path);
        }
    }

    /// Announces a rejected mutation.
    pub fn send_error(&self, path: &DocPath, message: &str) {
        self.sent.fetch_add(1, Ordering::Relaxed);
        for observer in self.snapshot() {
            observer.error(path, message);
        }
    }

    /// Copies the subscriber list so no lock is held while observers run.
    fn snapshot(&self) -> Vec<Arc<dyn Observer>> {
        self.subscribers
            .read()
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect()
    }
}

/// Handle returned by [`NotificationChannel::subscribe`].
///
/// Dropping the handle keeps the observer registered; call
/// [`Subscription::unsubscribe`] to stop receiving notifications.
#[derive(Debug, Clone)]
pub struct Subscription {
    id: u64,
    channel: Weak<NotificationChannel>,
}

impl Subscription {
    /// Stops delivery to the observer. Calling it again is a no-op.
    pub fn unsubscribe(&self) {
        if let Some(channel) = self.channel.upgrade() {
            channel.unsubscribe(self.id);
        }
    }

    /// Returns true while the observer is still registered.
    pub fn is_active(&self) -> bool {
        self.channel
            .upgrade()
            .map(|channel| channel.subscribers.read().iter().any(|(id, _)| *id == self.id))
            .unwrap_or(false)
    }
}

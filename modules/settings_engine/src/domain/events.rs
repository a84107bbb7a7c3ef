//! Snapshot change subscriptions
//!
//! Subscribers are invoked after every (possibly coalesced) snapshot change
//! and always receive the full current snapshot, never a diff.

use crate::contract::Snapshot;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Callback invoked with the full snapshot
pub type SnapshotListener = Arc<dyn Fn(&Snapshot) + Send + Sync>;

/// Handle returned by `subscribe`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
pub struct Subscribers {
    next_id: AtomicU64,
    listeners: RwLock<Vec<(SubscriptionId, SnapshotListener)>>,
}

impl Subscribers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: SnapshotListener) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push((id, listener));
        id
    }

    /// Returns false if the id was not subscribed
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invoke every listener; the registry lock is released before calling out
    /// so listeners may subscribe or unsubscribe
    pub fn notify(&self, snapshot: &Snapshot) {
        let listeners: Vec<SnapshotListener> = self
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();

        tracing::debug!(listeners = listeners.len(), keys = snapshot.len(), "notifying subscribers");
        for listener in listeners {
            listener(snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::SettingValue;
    use parking_lot::Mutex;

    #[test]
    fn test_subscribers_receive_full_snapshot() {
        let subscribers = Subscribers::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        subscribers.subscribe(Arc::new(move |snapshot: &Snapshot| {
            sink.lock().push(snapshot.clone());
        }));

        let snapshot = Snapshot::from([
            ("a".to_string(), SettingValue::from(true)),
            ("b".to_string(), SettingValue::from(2)),
        ]);
        subscribers.notify(&snapshot);

        assert_eq!(*seen.lock(), vec![snapshot]);
    }

    #[test]
    fn test_unsubscribe() {
        let subscribers = Subscribers::new();
        let id = subscribers.subscribe(Arc::new(|_: &Snapshot| {}));
        assert_eq!(subscribers.len(), 1);
        assert!(subscribers.unsubscribe(id));
        assert!(!subscribers.unsubscribe(id));
        assert!(subscribers.is_empty());
    }
}

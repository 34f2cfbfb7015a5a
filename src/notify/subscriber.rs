//! Subscriber-based notifications for configuration snapshots.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::snapshot::Snapshot;

type Callback = Box<dyn Fn(Arc<Snapshot>) + Send + Sync>;

/// Handle for a subscription that can be dropped to unsubscribe.
///
/// When the handle is dropped, the subscription is removed and the callback
/// receives no further snapshots.
pub struct SubscriptionHandle {
    id: usize,
    registry: Arc<RwLock<SubscriberRegistryInner>>,
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        let id = self.id;
        let registry = Arc::clone(&self.registry);
        tokio::spawn(async move {
            let mut inner = registry.write().await;
            inner.subscribers.retain(|(sub_id, _)| *sub_id != id);
        });
    }
}

struct SubscriberRegistryInner {
    subscribers: Vec<(usize, Callback)>,
    next_id: usize,
}

/// Registry of consumer callbacks, invoked with each published snapshot.
pub struct SubscriberRegistry {
    inner: Arc<RwLock<SubscriberRegistryInner>>,
}

impl SubscriberRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(SubscriberRegistryInner {
                subscribers: Vec::new(),
                next_id: 0,
            })),
        }
    }

    /// Register a callback. Returns a handle that unsubscribes when dropped.
    pub async fn subscribe<F>(&self, callback: F) -> SubscriptionHandle
    where
        F: Fn(Arc<Snapshot>) + Send + Sync + 'static,
    {
        let mut inner = self.inner.write().await;
        let id = inner.next_id;
        inner.next_id += 1;
        inner.subscribers.push((id, Box::new(callback)));

        SubscriptionHandle {
            id,
            registry: Arc::clone(&self.inner),
        }
    }

    /// Invoke every registered callback with the snapshot, in subscription
    /// order.
    pub async fn notify_all(&self, snapshot: &Arc<Snapshot>) {
        let inner = self.inner.read().await;
        for (_id, callback) in &inner.subscribers {
            callback(Arc::clone(snapshot));
        }
    }

    /// Number of active subscribers.
    pub async fn subscriber_count(&self) -> usize {
        let inner = self.inner.read().await;
        inner.subscribers.len()
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for SubscriberRegistry {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

//! Per-key state of the client manager: active clients and rebuild locks.
//!
//! # Design Decisions
//! - One registry per manager instead of process-wide statics, so tests get
//!   isolated instances
//! - Lock entries are created lazily and removed after use only when no other
//!   caller holds a handle to them; a handle is taken before waiting, so a lock
//!   with queued waiters is never removed

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::client::adapter::AdapterClient;

pub type KeyLock = Arc<Mutex<()>>;

#[derive(Debug, Clone, Default)]
pub struct ClientRegistry {
    clients: Arc<DashMap<String, Arc<AdapterClient>>>,
    locks: Arc<DashMap<String, KeyLock>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The client currently served for `key`.
    pub fn active(&self, key: &str) -> Option<Arc<AdapterClient>> {
        self.clients.get(key).map(|entry| entry.value().clone())
    }

    /// Atomically replace the active client of its key.
    pub fn publish(&self, client: Arc<AdapterClient>) -> Option<Arc<AdapterClient>> {
        self.clients.insert(client.key().to_string(), client)
    }

    /// Handle to the rebuild lock of `key`, creating it on first use.
    pub fn lock_for(&self, key: &str) -> KeyLock {
        self.locks.entry(key.to_string()).or_default().value().clone()
    }

    /// Give back a handle from [`lock_for`](Self::lock_for) and drop the lock
    /// entry if nobody else holds it.
    pub fn release(&self, key: &str, lock: KeyLock) {
        drop(lock);
        self.locks.remove_if(key, |_, lock| Arc::strong_count(lock) == 1);
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.clients.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    pub fn lock_count(&self) -> usize {
        self.locks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_uncontended_lock_is_removed() {
        let registry = ClientRegistry::new();
        let lock = registry.lock_for("svc.v1");
        {
            let _guard = lock.lock().await;
            assert_eq!(registry.lock_count(), 1);
        }
        registry.release("svc.v1", lock);
        assert_eq!(registry.lock_count(), 0);
    }

    #[tokio::test]
    async fn test_lock_with_waiter_is_kept() {
        let registry = ClientRegistry::new();
        let holder = registry.lock_for("svc.v1");
        let guard = holder.clone().lock_owned().await;

        let waiter = registry.lock_for("svc.v1");
        assert!(Arc::ptr_eq(&holder, &waiter));
        let waiting = tokio::spawn(async move {
            drop(waiter.lock().await);
            waiter
        });

        drop(guard);
        registry.release("svc.v1", holder);
        // the waiter still holds a handle
        let waiter = waiting.await.unwrap();
        assert_eq!(registry.lock_count(), 1);

        registry.release("svc.v1", waiter);
        assert_eq!(registry.lock_count(), 0);
    }
}

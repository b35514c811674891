//! In-process Remote Store for tests and demos

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use serde_json::Value;

use super::{
    apply_batch, snapshot_of, Documents, RemoteError, RemoteStore, Subscribers, Subscription,
    WriteOp,
};

/// Remote Store kept entirely in memory
///
/// `set_online(false)` makes every call fail with
/// [`RemoteError::Unavailable`] and disconnects live subscriptions, which is
/// how tests simulate losing the network.
pub struct MemoryRemote {
    collections: Mutex<BTreeMap<String, Documents>>,
    subscribers: Subscribers,
    online: AtomicBool,
    commits: AtomicUsize,
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self {
            collections: Mutex::new(BTreeMap::new()),
            subscribers: Subscribers::default(),
            online: AtomicBool::new(true),
            commits: AtomicUsize::new(0),
        }
    }

    /// A remote that refuses every call
    pub fn offline() -> Self {
        let remote = Self::new();
        remote.set_online(false);
        remote
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
        if !online {
            self.subscribers.close_all();
        }
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Number of batches committed successfully
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    /// Current documents of a collection, ordered by key
    pub fn documents(&self, collection: &str) -> Vec<Value> {
        self.collections
            .lock()
            .map(|c| c.get(collection).map(snapshot_of).unwrap_or_default())
            .unwrap_or_default()
            .documents
    }

    /// Fetch one document
    pub fn document(&self, collection: &str, key: &str) -> Option<Value> {
        self.collections
            .lock()
            .ok()?
            .get(collection)?
            .get(key)
            .cloned()
    }

    /// Replace a collection wholesale, as another client would, and notify
    /// subscribers
    pub fn seed(&self, collection: &str, docs: impl IntoIterator<Item = (String, Value)>) {
        let docs: Documents = docs.into_iter().collect();
        let snapshot = snapshot_of(&docs);
        if let Ok(mut collections) = self.collections.lock() {
            collections.insert(collection.to_string(), docs);
        }
        if self.is_online() {
            self.subscribers.broadcast(collection, &snapshot);
        }
    }

    fn ensure_online(&self) -> Result<(), RemoteError> {
        if self.is_online() {
            Ok(())
        } else {
            Err(RemoteError::Unavailable("network is offline".to_string()))
        }
    }
}

impl RemoteStore for MemoryRemote {
    fn subscribe(&self, collection: &str) -> Result<Subscription, RemoteError> {
        self.ensure_online()?;
        let initial = self
            .collections
            .lock()
            .map_err(|_| RemoteError::Unavailable("remote state poisoned".to_string()))?
            .get(collection)
            .map(snapshot_of)
            .unwrap_or_default();
        Ok(self.subscribers.add(collection, initial))
    }

    fn keys(&self, collection: &str) -> Result<Vec<String>, RemoteError> {
        self.ensure_online()?;
        let collections = self
            .collections
            .lock()
            .map_err(|_| RemoteError::Unavailable("remote state poisoned".to_string()))?;
        Ok(collections
            .get(collection)
            .map(|docs| docs.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn commit(&self, collection: &str, batch: &[WriteOp]) -> Result<(), RemoteError> {
        self.ensure_online()?;
        let snapshot = {
            let mut collections = self
                .collections
                .lock()
                .map_err(|_| RemoteError::Unavailable("remote state poisoned".to_string()))?;
            let current = collections.get(collection).cloned().unwrap_or_default();
            let next = apply_batch(collection, &current, batch)?;
            let snapshot = snapshot_of(&next);
            collections.insert(collection.to_string(), next);
            snapshot
        };

        self.commits.fetch_add(1, Ordering::SeqCst);
        self.subscribers.broadcast(collection, &snapshot);
        Ok(())
    }
}

//! # Remote Store Adapter
//!
//! The remote side is an opaque, network-backed collection service. The
//! engine only needs two capabilities from it:
//!
//! - a realtime subscription delivering the **whole** current collection
//!   as a [`Snapshot`] every time it changes
//! - point and batched writes ([`WriteOp`]) committed all-or-nothing
//!
//! ## Implementations
//!
//! - [`memory::MemoryRemote`]: in-process, with an online/offline switch
//! - [`fs::FileRemote`]: a directory (local or network share) holding one
//!   `<collection>.json` document map per collection
//!
//! Snapshots are delivered through a channel owned by the [`Subscription`].
//! Nothing is applied until the owning store drains the channel, which keeps
//! snapshots and mutations on one queue.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};
use thiserror::Error;

pub mod fs;
pub mod memory;

pub use fs::FileRemote;
pub use memory::MemoryRemote;

/// Errors reported by a Remote Store
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote store unavailable: {0}")]
    Unavailable(String),

    #[error("permission denied for collection '{0}'")]
    PermissionDenied(String),

    #[error("no document '{key}' in collection '{collection}'")]
    NotFound { collection: String, key: String },

    #[error("remote I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("remote serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// One write inside a batch
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Create or fully overwrite a document
    Upsert { key: String, doc: Value },

    /// Overwrite the given fields of an existing document, then union each
    /// `(field, value)` of `append` into that field's array
    Patch {
        key: String,
        fields: Map<String, Value>,
        append: Vec<(String, Value)>,
    },

    /// Remove a document
    Delete { key: String },
}

impl WriteOp {
    pub fn key(&self) -> &str {
        match self {
            WriteOp::Upsert { key, .. } | WriteOp::Patch { key, .. } | WriteOp::Delete { key } => {
                key
            }
        }
    }
}

/// The entire contents of a collection at one point in time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub documents: Vec<Value>,
}

/// Handle on a live snapshot feed
pub struct Subscription {
    receiver: Receiver<Snapshot>,
    active: Arc<AtomicBool>,
}

/// Result of draining a subscription
#[derive(Debug, Default)]
pub struct Drained {
    pub snapshots: Vec<Snapshot>,
    /// The sending side is gone; no further snapshots will arrive
    pub disconnected: bool,
}

impl Subscription {
    /// Take every snapshot queued so far, in delivery order
    pub fn drain(&self) -> Drained {
        let mut drained = Drained::default();
        loop {
            match self.receiver.try_recv() {
                Ok(snapshot) => drained.snapshots.push(snapshot),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    drained.disconnected = true;
                    break;
                }
            }
        }
        drained
    }

    /// Stop receiving snapshots
    pub fn cancel(self) {
        self.active.store(false, Ordering::SeqCst);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

/// Abstract interface for the remote authoritative store
pub trait RemoteStore {
    /// Start a realtime feed; the current snapshot is queued immediately
    fn subscribe(&self, collection: &str) -> Result<Subscription, RemoteError>;

    /// Enumerate every key currently in a collection
    fn keys(&self, collection: &str) -> Result<Vec<String>, RemoteError>;

    /// Apply a batch of writes atomically
    fn commit(&self, collection: &str, batch: &[WriteOp]) -> Result<(), RemoteError>;

    /// Create or overwrite one document
    fn upsert(&self, collection: &str, key: &str, doc: Value) -> Result<(), RemoteError> {
        self.commit(
            collection,
            &[WriteOp::Upsert {
                key: key.to_string(),
                doc,
            }],
        )
    }

    /// Remove one document
    fn delete(&self, collection: &str, key: &str) -> Result<(), RemoteError> {
        self.commit(
            collection,
            &[WriteOp::Delete {
                key: key.to_string(),
            }],
        )
    }
}

impl<T: RemoteStore + ?Sized> RemoteStore for Arc<T> {
    fn subscribe(&self, collection: &str) -> Result<Subscription, RemoteError> {
        (**self).subscribe(collection)
    }

    fn keys(&self, collection: &str) -> Result<Vec<String>, RemoteError> {
        (**self).keys(collection)
    }

    fn commit(&self, collection: &str, batch: &[WriteOp]) -> Result<(), RemoteError> {
        (**self).commit(collection, batch)
    }
}

/// Documents of one collection, ordered by key
pub type Documents = BTreeMap<String, Value>;

/// Apply a batch to a copy of `docs`; `docs` is untouched if any op fails
pub(crate) fn apply_batch(
    collection: &str,
    docs: &Documents,
    batch: &[WriteOp],
) -> Result<Documents, RemoteError> {
    let mut next = docs.clone();

    for op in batch {
        match op {
            WriteOp::Upsert { key, doc } => {
                next.insert(key.clone(), doc.clone());
            }
            WriteOp::Patch {
                key,
                fields,
                append,
            } => {
                let doc = next
                    .get_mut(key)
                    .and_then(Value::as_object_mut)
                    .ok_or_else(|| RemoteError::NotFound {
                        collection: collection.to_string(),
                        key: key.clone(),
                    })?;

                for (field, value) in fields {
                    doc.insert(field.clone(), value.clone());
                }
                for (field, value) in append {
                    array_union(doc, field, value);
                }
            }
            WriteOp::Delete { key } => {
                next.remove(key);
            }
        }
    }

    Ok(next)
}

/// Append `value` to the array under `field` unless an equal element exists
fn array_union(doc: &mut Map<String, Value>, field: &str, value: &Value) {
    let slot = doc
        .entry(field.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));

    if !slot.is_array() {
        *slot = Value::Array(Vec::new());
    }
    if let Value::Array(items) = slot {
        if !items.contains(value) {
            items.push(value.clone());
        }
    }
}

pub(crate) fn snapshot_of(docs: &Documents) -> Snapshot {
    Snapshot {
        documents: docs.values().cloned().collect(),
    }
}

/// Fan-out of snapshots to live subscriptions, per collection
#[derive(Default)]
pub(crate) struct Subscribers {
    entries: Mutex<Vec<(String, Sender<Snapshot>, Arc<AtomicBool>)>>,
}

impl Subscribers {
    /// Register a subscription and queue its first snapshot
    pub fn add(&self, collection: &str, initial: Snapshot) -> Subscription {
        let (tx, rx) = mpsc::channel();
        let active = Arc::new(AtomicBool::new(true));
        // The receiver is alive right here, so this send cannot fail
        let _ = tx.send(initial);

        if let Ok(mut entries) = self.entries.lock() {
            entries.push((collection.to_string(), tx, active.clone()));
        }

        Subscription {
            receiver: rx,
            active,
        }
    }

    /// Deliver a snapshot to every live subscriber of `collection`
    pub fn broadcast(&self, collection: &str, snapshot: &Snapshot) {
        let Ok(mut entries) = self.entries.lock() else {
            return;
        };

        entries.retain(|(name, tx, active)| {
            if !active.load(Ordering::SeqCst) {
                return false;
            }
            if name != collection {
                return true;
            }
            tx.send(snapshot.clone()).is_ok()
        });
    }

    /// Drop every subscriber, which disconnects their channels
    pub fn close_all(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn docs() -> Documents {
        let mut docs = Documents::new();
        docs.insert("A".into(), json!({"code": "A", "log": [1]}));
        docs
    }

    #[test]
    fn test_patch_overwrites_fields_and_unions_array() {
        let mut fields = Map::new();
        fields.insert("name".into(), json!("x"));
        let batch = [WriteOp::Patch {
            key: "A".into(),
            fields,
            append: vec![("log".into(), json!(2)), ("log".into(), json!(1))],
        }];

        let next = apply_batch("c", &docs(), &batch).unwrap();
        assert_eq!(next["A"], json!({"code": "A", "log": [1, 2], "name": "x"}));
    }

    #[test]
    fn test_patch_missing_doc_fails_whole_batch() {
        let batch = [
            WriteOp::Delete { key: "A".into() },
            WriteOp::Patch {
                key: "B".into(),
                fields: Map::new(),
                append: Vec::new(),
            },
        ];
        let original = docs();
        let err = apply_batch("c", &original, &batch).unwrap_err();
        assert!(matches!(err, RemoteError::NotFound { .. }));
        assert!(original.contains_key("A"));
    }

    #[test]
    fn test_rename_batch() {
        let batch = [
            WriteOp::Upsert {
                key: "B".into(),
                doc: json!({"code": "B"}),
            },
            WriteOp::Delete { key: "A".into() },
        ];
        let next = apply_batch("c", &docs(), &batch).unwrap();
        assert_eq!(next.keys().collect::<Vec<_>>(), vec!["B"]);
    }

    #[test]
    fn test_subscribers_fan_out_per_collection() {
        let subs = Subscribers::default();
        let a = subs.add("a", Snapshot::default());
        let b = subs.add("b", Snapshot::default());

        subs.broadcast("a", &Snapshot {
            documents: vec![json!(1)],
        });

        assert_eq!(a.drain().snapshots.len(), 2);
        assert_eq!(b.drain().snapshots.len(), 1);
    }

    #[test]
    fn test_cancelled_subscription_stops_receiving() {
        let subs = Subscribers::default();
        let a = subs.add("a", Snapshot::default());
        let active = a.active.clone();
        a.cancel();
        assert!(!active.load(Ordering::SeqCst));
        subs.broadcast("a", &Snapshot::default());
        assert!(subs.entries.lock().unwrap().is_empty());
    }

    #[test]
    fn test_close_all_disconnects() {
        let subs = Subscribers::default();
        let a = subs.add("a", Snapshot::default());
        subs.close_all();
        let drained = a.drain();
        assert_eq!(drained.snapshots.len(), 1);
        assert!(drained.disconnected);
    }
}

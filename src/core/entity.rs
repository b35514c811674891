//! Entity trait - common interface for all synchronized record types

use serde::{de::DeserializeOwned, Serialize};

use crate::core::actor::ActivityEntry;

/// Remote field name that carries the Activity Log array
pub const ACTIVITY_LOG_FIELD: &str = "activityLog";

/// Common trait for all records held by an [`EntityStore`](crate::core::store::EntityStore)
///
/// A record belongs to exactly one collection and is addressed by a primary
/// key that is unique within it.
pub trait Entity: Serialize + DeserializeOwned + Clone {
    /// Collection name, used both as the Local Cache row and the remote path
    const COLLECTION: &'static str;

    /// Human-readable noun used in notifications (e.g. "phiếu")
    const LABEL: &'static str;

    /// Typed partial-update structure; `None` fields are left untouched
    type Patch: Serialize + Clone + Default;

    /// The primary key
    fn key(&self) -> &str;

    /// Merge the set fields of a patch into this record
    fn apply_patch(&mut self, patch: &Self::Patch);

    /// Summary line recorded in the Activity Log for this patch, if the patch
    /// touches a field worth naming
    fn describe_patch(_patch: &Self::Patch) -> Option<String> {
        None
    }

    /// Mutable access to the Activity Log, for record types that carry one
    fn activity_log_mut(&mut self) -> Option<&mut Vec<ActivityEntry>> {
        None
    }
}

/// Marker for collections whose primary key may be changed after creation
pub trait RenameKey: Entity {}

/// Replace the record sharing `entity`'s key, or append it
///
/// Returns true when an existing record was overwritten.
pub fn upsert_by_key<E: Entity>(items: &mut Vec<E>, entity: E) -> bool {
    match items.iter().position(|e| e.key() == entity.key()) {
        Some(pos) => {
            items[pos] = entity;
            true
        }
        None => {
            items.push(entity);
            false
        }
    }
}

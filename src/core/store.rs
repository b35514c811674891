//! # Entity Store
//!
//! One [`EntityStore`] owns one collection: an in-memory view, its Local
//! Cache mirror, and a subscription to the Remote Store.
//!
//! ## Lifecycle
//!
//! ```text
//! new() ──► Bootstrapping ──connect()──► Subscribed
//!              (view = cache)      └──► Degraded (subscribe failed / feed lost)
//! ```
//!
//! Mutations are accepted in every state.
//!
//! ## Mutation template
//!
//! Every mutation runs in two phases:
//!
//! 1. **Optimistic apply**: compute the new view, replace the in-memory view,
//!    write it through to the Local Cache. The caller's return value reflects
//!    only this phase.
//! 2. **Remote apply**: submit the matching write(s). Failure is logged and
//!    reported to the sink as an offline-qualified success. Local state is
//!    never rolled back.
//!
//! The only local rejection is [`StoreError::DuplicateKey`] from `rename`,
//! checked before anything is touched.
//!
//! ## Snapshots
//!
//! A snapshot drained by [`EntityStore::poll_remote`] **replaces** the view
//! and the cache wholesale. An optimistic change whose remote write has not
//! landed yet is overwritten by an older snapshot and reappears with the next
//! one. Entries are last-write-wins by key; there is no field merge.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::core::actor::{ActivityEntry, Actor};
use crate::core::cache::LocalCache;
use crate::core::entity::{upsert_by_key, Entity, RenameKey, ACTIVITY_LOG_FIELD};
use crate::core::identity::ReportId;
use crate::core::notify::{self, Action, Notice, NotificationSink};
use crate::core::remote::{RemoteError, RemoteStore, Snapshot, Subscription, WriteOp};
use crate::entities::Report;

/// Default maximum number of writes per remote batch
pub const DEFAULT_BATCH_LIMIT: usize = 500;

/// Log line used when an update names no field of its own
const GENERIC_UPDATE_LOG: &str = "Cập nhật thông tin";

/// Log line recorded when a report is created by a known actor
const CREATED_LOG: &str = "Tạo phiếu";

/// Errors a mutation can return to its caller
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("key '{0}' already exists")]
    DuplicateKey(String),
}

/// Connection state towards the Remote Store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Serving the Local Cache; no subscription attempted yet
    Bootstrapping,
    /// Receiving snapshots
    Subscribed,
    /// Subscription failed or was lost; serving the last known view
    Degraded,
}

impl std::fmt::Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncState::Bootstrapping => write!(f, "bootstrapping"),
            SyncState::Subscribed => write!(f, "subscribed"),
            SyncState::Degraded => write!(f, "degraded"),
        }
    }
}

/// Authoritative in-memory view of one collection plus its sync plumbing
pub struct EntityStore<E: Entity, R: RemoteStore> {
    items: Vec<E>,
    cache: LocalCache,
    remote: R,
    sink: Arc<dyn NotificationSink>,
    subscription: Option<Subscription>,
    state: SyncState,
    batch_limit: usize,
    last_snapshot_at: Option<DateTime<Utc>>,
}

impl<E: Entity, R: RemoteStore> EntityStore<E, R> {
    /// Build a store whose view is whatever the Local Cache holds
    pub fn new(cache: LocalCache, remote: R, sink: Arc<dyn NotificationSink>) -> Self {
        let items: Vec<E> = cache.load(E::COLLECTION);
        debug!(
            collection = E::COLLECTION,
            count = items.len(),
            "Bootstrapped from local cache"
        );

        Self {
            items,
            cache,
            remote,
            sink,
            subscription: None,
            state: SyncState::Bootstrapping,
            batch_limit: DEFAULT_BATCH_LIMIT,
            last_snapshot_at: None,
        }
    }

    /// Cap the number of writes sent in one remote batch
    pub fn with_batch_limit(mut self, limit: usize) -> Self {
        self.batch_limit = limit.max(1);
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn items(&self) -> &[E] {
        &self.items
    }

    pub fn get(&self, key: &str) -> Option<&E> {
        self.items.iter().find(|e| e.key() == key)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn last_snapshot_at(&self) -> Option<DateTime<Utc>> {
        self.last_snapshot_at
    }

    pub fn cache(&self) -> &LocalCache {
        &self.cache
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    // =========================================================================
    // Remote subscription
    // =========================================================================

    /// Subscribe to the remote collection
    ///
    /// Failure is not an error for the caller: the store stays Degraded and
    /// keeps serving its local view.
    pub fn connect(&mut self) -> SyncState {
        match self.remote.subscribe(E::COLLECTION) {
            Ok(subscription) => {
                info!(collection = E::COLLECTION, "Subscribed to remote store");
                self.subscription = Some(subscription);
                self.state = SyncState::Subscribed;
            }
            Err(e) => {
                warn!(
                    collection = E::COLLECTION,
                    error = %e,
                    "Remote subscription failed, serving local cache"
                );
                self.subscription = None;
                self.state = SyncState::Degraded;
            }
        }
        self.state
    }

    /// Cancel the subscription, if any
    pub fn disconnect(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.cancel();
            self.state = SyncState::Degraded;
        }
    }

    /// Apply every snapshot queued since the last poll, in delivery order
    ///
    /// Returns how many snapshots were applied.
    pub fn poll_remote(&mut self) -> usize {
        let Some(subscription) = self.subscription.as_ref() else {
            return 0;
        };

        let drained = subscription.drain();
        let applied = drained.snapshots.len();
        for snapshot in drained.snapshots {
            self.apply_snapshot(snapshot);
        }

        if drained.disconnected {
            warn!(
                collection = E::COLLECTION,
                "Remote feed disconnected, serving local cache"
            );
            self.subscription = None;
            self.state = SyncState::Degraded;
        }

        applied
    }

    /// Replace the view and the Local Cache with a remote snapshot
    ///
    /// Documents that do not deserialize are skipped.
    pub fn apply_snapshot(&mut self, snapshot: Snapshot) {
        let total = snapshot.documents.len();
        let items: Vec<E> = snapshot
            .documents
            .into_iter()
            .filter_map(|doc| match serde_json::from_value(doc) {
                Ok(item) => Some(item),
                Err(e) => {
                    warn!(collection = E::COLLECTION, error = %e, "Skipping malformed remote document");
                    None
                }
            })
            .collect();

        info!(
            collection = E::COLLECTION,
            count = items.len(),
            skipped = total - items.len(),
            "Applied remote snapshot"
        );

        self.items = items;
        self.last_snapshot_at = Some(Utc::now());
        self.persist();
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Create a record, or overwrite the one sharing its key
    pub fn create(&mut self, entity: E) {
        let key = entity.key().to_string();
        let doc = match serde_json::to_value(&entity) {
            Ok(doc) => Some(doc),
            Err(e) => {
                error!(collection = E::COLLECTION, key = %key, error = %e, "Cannot encode record");
                None
            }
        };

        let replaced = upsert_by_key(&mut self.items, entity);
        debug!(collection = E::COLLECTION, key = %key, replaced, "Applied create locally");
        self.persist();

        let synced = doc.is_some_and(|doc| {
            let result = self.remote.upsert(E::COLLECTION, &key, doc);
            self.accepted(result, 1)
        });
        self.report(notify::outcome(Action::Saved, E::LABEL, synced));
    }

    /// Merge a partial update into the record under `key`
    ///
    /// When `actor` is given and the record carries an Activity Log, one log
    /// entry is appended: `message` if provided, else a line derived from
    /// the patch. Returns false if no record has that key.
    pub fn update(
        &mut self,
        key: &str,
        patch: E::Patch,
        actor: Option<&Actor>,
        message: Option<&str>,
    ) -> bool {
        let Some(pos) = self.position(key) else {
            debug!(collection = E::COLLECTION, key, "Update skipped, no such record");
            return false;
        };

        let mut next = self.items[pos].clone();
        next.apply_patch(&patch);

        let mut appended = None;
        if let Some(actor) = actor {
            if let Some(log) = next.activity_log_mut() {
                let text = message
                    .map(str::to_string)
                    .or_else(|| E::describe_patch(&patch))
                    .unwrap_or_else(|| GENERIC_UPDATE_LOG.to_string());
                let entry = ActivityEntry::log(text, actor);
                log.push(entry.clone());
                appended = Some(entry);
            }
        }

        self.items[pos] = next;
        debug!(collection = E::COLLECTION, key, "Applied update locally");
        self.persist();

        let op = patch_op(key, &patch, appended.as_ref());
        let synced = op.is_some_and(|op| self.push(vec![op]));
        self.report(notify::outcome(Action::Updated, E::LABEL, synced));
        true
    }

    /// Append a comment to the record's Activity Log
    ///
    /// Returns false if the record is missing or carries no Activity Log.
    pub fn add_comment(&mut self, key: &str, text: &str, actor: &Actor) -> bool {
        let Some(pos) = self.position(key) else {
            return false;
        };

        let entry = ActivityEntry::comment(text, actor);
        match self.items[pos].activity_log_mut() {
            Some(log) => log.push(entry.clone()),
            None => return false,
        }
        self.persist();

        let op = patch_op(key, &E::Patch::default(), Some(&entry));
        let synced = op.is_some_and(|op| self.push(vec![op]));
        self.report(notify::outcome(Action::Commented, E::LABEL, synced));
        true
    }

    /// Remove the record under `key`; false if there was none
    pub fn delete(&mut self, key: &str) -> bool {
        let Some(pos) = self.position(key) else {
            return false;
        };

        self.items.remove(pos);
        debug!(collection = E::COLLECTION, key, "Applied delete locally");
        self.persist();

        let result = self.remote.delete(E::COLLECTION, key);
        let synced = self.accepted(result, 1);
        self.report(notify::outcome(Action::Deleted, E::LABEL, synced));
        true
    }

    /// Empty the collection locally, then delete every remote key
    ///
    /// The view is empty as soon as this returns. If the remote leg does not
    /// complete, the remote records come back with the next snapshot.
    pub fn delete_all(&mut self) {
        let count = self.items.len();
        self.items.clear();
        debug!(collection = E::COLLECTION, count, "Cleared collection locally");
        self.persist();

        let synced = match self.remote.keys(E::COLLECTION) {
            Ok(keys) => self.push(
                keys.into_iter()
                    .map(|key| WriteOp::Delete { key })
                    .collect(),
            ),
            Err(e) => {
                warn!(collection = E::COLLECTION, error = %e, "Could not enumerate remote keys");
                false
            }
        };
        self.report(notify::outcome(Action::Cleared, E::LABEL, synced));
    }

    /// Upsert many records in one pass
    ///
    /// Later records overwrite earlier ones with the same key, including
    /// earlier records of the same batch. Returns false for an empty input.
    pub fn bulk_import(&mut self, entities: Vec<E>) -> bool {
        if entities.is_empty() {
            return false;
        }

        let count = entities.len();
        let mut ops = Vec::with_capacity(count);
        let mut working = self.items.clone();

        for entity in entities {
            match serde_json::to_value(&entity) {
                Ok(doc) => ops.push(WriteOp::Upsert {
                    key: entity.key().to_string(),
                    doc,
                }),
                Err(e) => {
                    error!(collection = E::COLLECTION, key = entity.key(), error = %e, "Cannot encode record");
                }
            }
            upsert_by_key(&mut working, entity);
        }

        self.items = working;
        debug!(collection = E::COLLECTION, count, "Applied import locally");
        self.persist();

        let synced = ops.len() == count && self.push(ops);
        self.report(notify::outcome(Action::Imported(count), E::LABEL, synced));
        true
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn position(&self, key: &str) -> Option<usize> {
        self.items.iter().position(|e| e.key() == key)
    }

    /// Write the current view through to the Local Cache
    fn persist(&self) {
        if let Err(e) = self.cache.save(E::COLLECTION, &self.items) {
            error!(collection = E::COLLECTION, error = %e, "Failed to write local cache");
        }
    }

    /// Submit writes in batches of at most `batch_limit`
    ///
    /// Returns true only if every batch was accepted.
    fn push(&self, ops: Vec<WriteOp>) -> bool {
        if ops.is_empty() {
            return true;
        }

        ops.chunks(self.batch_limit).all(|chunk| {
            let result = self.remote.commit(E::COLLECTION, chunk);
            self.accepted(result, chunk.len())
        })
    }

    fn accepted(&self, result: Result<(), RemoteError>, ops: usize) -> bool {
        match result {
            Ok(()) => true,
            Err(e) => {
                log_remote_failure(E::COLLECTION, ops, &e);
                false
            }
        }
    }

    fn report(&self, notice: Notice) {
        self.sink.notify(&notice.message, notice.kind);
    }
}

impl<E: RenameKey, R: RemoteStore> EntityStore<E, R> {
    /// Move the record under `old_key` to `entity`'s key
    ///
    /// Fails without touching anything when another record already holds the
    /// new key. The remote side receives create-new and delete-old in one
    /// batch. When the key is unchanged this is a plain create.
    pub fn rename(&mut self, old_key: &str, entity: E) -> Result<(), StoreError> {
        let new_key = entity.key().to_string();
        if new_key == old_key {
            self.create(entity);
            return Ok(());
        }

        if self.position(&new_key).is_some() {
            warn!(collection = E::COLLECTION, key = %new_key, "Rename rejected, key in use");
            self.report(notify::duplicate_key(&new_key));
            return Err(StoreError::DuplicateKey(new_key));
        }

        let doc = serde_json::to_value(&entity);
        match self.position(old_key) {
            Some(pos) => self.items[pos] = entity,
            None => self.items.push(entity),
        }
        debug!(collection = E::COLLECTION, from = old_key, to = %new_key, "Applied rename locally");
        self.persist();

        let synced = match doc {
            Ok(doc) => self.push(vec![
                WriteOp::Upsert {
                    key: new_key.clone(),
                    doc,
                },
                WriteOp::Delete {
                    key: old_key.to_string(),
                },
            ]),
            Err(e) => {
                error!(collection = E::COLLECTION, key = %new_key, error = %e, "Cannot encode record");
                false
            }
        };
        self.report(notify::outcome(
            Action::Renamed {
                from: old_key,
                to: &new_key,
            },
            E::LABEL,
            synced,
        ));
        Ok(())
    }
}

impl<R: RemoteStore> EntityStore<Report, R> {
    /// Next free report id for `year`, from the current view
    pub fn next_report_id(&self, year: i32) -> String {
        ReportId::next(self.items.iter().map(|r| r.id.as_str()), year).to_string()
    }

    /// Create a report, assigning an id from its business date if blank
    ///
    /// Returns the id the report was stored under.
    pub fn create_report(&mut self, mut report: Report, actor: Option<&Actor>) -> String {
        use chrono::Datelike;

        if report.id.trim().is_empty() {
            report.id = self.next_report_id(report.date.year());
        }
        if let Some(actor) = actor {
            report.created_by.get_or_insert_with(|| actor.name.clone());
            report.activity_log.push(ActivityEntry::log(CREATED_LOG, actor));
        }

        let id = report.id.clone();
        self.create(report);
        id
    }
}

/// Remote patch for an update: changed fields plus an optional log append
fn patch_op<P: serde::Serialize>(
    key: &str,
    patch: &P,
    appended: Option<&ActivityEntry>,
) -> Option<WriteOp> {
    let fields = match serde_json::to_value(patch) {
        Ok(Value::Object(fields)) => fields,
        Ok(_) => Map::new(),
        Err(e) => {
            error!(key, error = %e, "Cannot encode patch");
            return None;
        }
    };

    let mut append = Vec::new();
    if let Some(entry) = appended {
        match serde_json::to_value(entry) {
            Ok(value) => append.push((ACTIVITY_LOG_FIELD.to_string(), value)),
            Err(e) => {
                error!(key, error = %e, "Cannot encode activity entry");
                return None;
            }
        }
    }

    Some(WriteOp::Patch {
        key: key.to_string(),
        fields,
        append,
    })
}

fn log_remote_failure(collection: &str, ops: usize, e: &RemoteError) {
    warn!(
        collection,
        ops,
        error = %e,
        "Remote write failed, keeping local change"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::actor::{ActivityKind, Role};
    use crate::core::notify::{NoticeKind, RecordingSink, OFFLINE_SUFFIX};
    use crate::core::remote::MemoryRemote;
    use crate::entities::{Customer, Product, ProductPatch, ReportPatch, ReportStatus};
    use chrono::NaiveDate;
    use serde_json::json;

    type Store<E> = EntityStore<E, Arc<MemoryRemote>>;

    fn store<E: Entity>(remote: &Arc<MemoryRemote>) -> (Store<E>, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::new());
        let store = EntityStore::new(LocalCache::in_memory().unwrap(), remote.clone(), sink.clone());
        (store, sink)
    }

    fn product(code: &str, name: &str) -> Product {
        Product {
            trade_name: name.to_string(),
            ..Product::new(code)
        }
    }

    fn customer(code: &str) -> Customer {
        Customer {
            company_name: format!("Công ty {}", code),
            ..Customer::new(code)
        }
    }

    fn report(year: i32) -> Report {
        Report::new(NaiveDate::from_ymd_opt(year, 6, 1).unwrap())
    }

    fn actor(name: &str) -> Actor {
        Actor::new(name, Role::Quality)
    }

    fn assert_write_through<E: Entity + PartialEq + std::fmt::Debug>(store: &Store<E>) {
        let cached: Vec<E> = store.cache().load(E::COLLECTION);
        assert_eq!(cached, store.items());
    }

    // =========================================================================
    // Bootstrapping and snapshots
    // =========================================================================

    #[test]
    fn test_bootstrap_from_cache() {
        let cache = LocalCache::in_memory().unwrap();
        cache.save("products", &[product("A", "x")]).unwrap();

        let store: Store<Product> = EntityStore::new(
            cache,
            Arc::new(MemoryRemote::offline()),
            Arc::new(RecordingSink::new()),
        );
        assert_eq!(store.state(), SyncState::Bootstrapping);
        assert_eq!(store.items(), &[product("A", "x")]);
    }

    #[test]
    fn test_connect_failure_degrades() {
        let remote = Arc::new(MemoryRemote::offline());
        let (mut store, _) = store::<Product>(&remote);
        assert_eq!(store.connect(), SyncState::Degraded);
        assert_eq!(store.poll_remote(), 0);
    }

    #[test]
    fn test_snapshot_replaces_view_wholesale() {
        let remote = Arc::new(MemoryRemote::new());
        let (mut store, _) = store::<Product>(&remote);
        remote.set_online(false);
        store.create(product("LOCAL", "only here"));
        store.create(product("A", "local name"));
        remote.set_online(true);

        remote.seed(
            "products",
            [("A".to_string(), json!({"code": "A", "tradeName": "remote name"}))],
        );
        assert_eq!(store.connect(), SyncState::Subscribed);
        assert_eq!(store.poll_remote(), 1);

        assert_eq!(store.items(), &[product("A", "remote name")]);
        assert!(store.last_snapshot_at().is_some());
        assert_write_through(&store);
    }

    #[test]
    fn test_malformed_remote_document_skipped() {
        let remote = Arc::new(MemoryRemote::new());
        remote.seed(
            "products",
            [
                ("A".to_string(), json!({"code": "A"})),
                ("B".to_string(), json!({"tradeName": "no code"})),
            ],
        );
        let (mut store, _) = store::<Product>(&remote);
        store.connect();
        store.poll_remote();
        assert_eq!(store.len(), 1);
        assert_eq!(store.items()[0].code, "A");
    }

    #[test]
    fn test_own_write_echoes_back_as_snapshot() {
        let remote = Arc::new(MemoryRemote::new());
        let (mut store, _) = store::<Product>(&remote);
        store.connect();
        store.create(product("A", "x"));

        // initial empty snapshot + the echo of our write
        assert_eq!(store.poll_remote(), 2);
        assert_eq!(store.items(), &[product("A", "x")]);
    }

    #[test]
    fn test_losing_feed_degrades_but_keeps_view() {
        let remote = Arc::new(MemoryRemote::new());
        let (mut store, _) = store::<Product>(&remote);
        store.connect();
        store.create(product("A", "x"));
        store.poll_remote();

        remote.set_online(false);
        store.poll_remote();
        assert_eq!(store.state(), SyncState::Degraded);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_disconnect_cancels() {
        let remote = Arc::new(MemoryRemote::new());
        let (mut store, _) = store::<Product>(&remote);
        store.connect();
        store.disconnect();
        assert_eq!(store.state(), SyncState::Degraded);

        remote.seed("products", [("A".to_string(), json!({"code": "A"}))]);
        assert_eq!(store.poll_remote(), 0);
        assert!(store.is_empty());
    }

    // =========================================================================
    // Create / upsert
    // =========================================================================

    #[test]
    fn test_create_twice_same_key_keeps_one() {
        let remote = Arc::new(MemoryRemote::new());
        let (mut store, sink) = store::<Product>(&remote);
        store.create(product("A", "first"));
        store.create(product("A", "second"));

        assert_eq!(store.items(), &[product("A", "second")]);
        assert_eq!(
            remote.document("products", "A"),
            Some(json!({
                "code": "A", "tradeName": "second", "deviceName": "", "productLine": "",
                "brand": "", "registrationNumber": ""
            }))
        );
        assert_eq!(sink.last().unwrap().kind, NoticeKind::Success);
        assert_write_through(&store);
    }

    #[test]
    fn test_create_offline_keeps_local_and_reports_offline() {
        let remote = Arc::new(MemoryRemote::offline());
        let (mut store, sink) = store::<Product>(&remote);
        store.create(product("A", "x"));

        assert_eq!(store.len(), 1);
        let notice = sink.last().unwrap();
        assert_eq!(notice.kind, NoticeKind::Info);
        assert!(notice.message.ends_with(OFFLINE_SUFFIX));
        assert_write_through(&store);
    }

    // =========================================================================
    // Update and Activity Log
    // =========================================================================

    #[test]
    fn test_update_missing_key_is_noop() {
        let remote = Arc::new(MemoryRemote::new());
        let (mut store, sink) = store::<Product>(&remote);
        assert!(!store.update("nope", ProductPatch::default(), None, None));
        assert!(sink.notices().is_empty());
    }

    #[test]
    fn test_update_merges_fields() {
        let remote = Arc::new(MemoryRemote::new());
        let (mut store, _) = store::<Product>(&remote);
        store.create(Product {
            brand: "Acme".into(),
            ..product("A", "x")
        });

        let patch = ProductPatch {
            trade_name: Some("y".into()),
            ..Default::default()
        };
        assert!(store.update("A", patch, Some(&actor("Lan")), None));

        let p = store.get("A").unwrap();
        assert_eq!(p.trade_name, "y");
        assert_eq!(p.brand, "Acme");
        assert_eq!(remote.document("products", "A").unwrap()["tradeName"], "y");
        assert_write_through(&store);
    }

    #[test]
    fn test_status_update_logs_status_line() {
        let remote = Arc::new(MemoryRemote::new());
        let (mut store, _) = store::<Report>(&remote);
        let id = store.create_report(report(2024), None);

        let patch = ReportPatch {
            status: Some(ReportStatus::Processing),
            ..Default::default()
        };
        store.update(&id, patch, Some(&actor("Lan")), None);

        let log = &store.get(&id).unwrap().activity_log;
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].text, "Trạng thái: Đang xử lý");
        assert_eq!(log[0].kind, ActivityKind::Log);
        assert_eq!(log[0].author, "Lan");
    }

    #[test]
    fn test_update_without_actor_adds_no_log() {
        let remote = Arc::new(MemoryRemote::new());
        let (mut store, _) = store::<Report>(&remote);
        let id = store.create_report(report(2024), None);
        let patch = ReportPatch {
            remediation: Some("Đổi hàng".into()),
            ..Default::default()
        };
        store.update(&id, patch, None, None);
        assert!(store.get(&id).unwrap().activity_log.is_empty());
    }

    #[test]
    fn test_update_message_overrides_log_text() {
        let remote = Arc::new(MemoryRemote::new());
        let (mut store, _) = store::<Report>(&remote);
        let id = store.create_report(report(2024), None);

        store.update(&id, ReportPatch::default(), Some(&actor("An")), None);
        store.update(
            &id,
            ReportPatch::default(),
            Some(&actor("An")),
            Some("Đã liên hệ nhà cung cấp"),
        );

        let log = &store.get(&id).unwrap().activity_log;
        assert_eq!(log[0].text, GENERIC_UPDATE_LOG);
        assert_eq!(log[1].text, "Đã liên hệ nhà cung cấp");
    }

    #[test]
    fn test_activity_log_append_only_in_call_order() {
        let remote = Arc::new(MemoryRemote::new());
        let (mut store, _) = store::<Report>(&remote);
        let id = store.create_report(report(2024), None);

        let actors = ["A", "B", "C", "D"];
        let mut seen: Vec<ActivityEntry> = Vec::new();
        for (i, name) in actors.iter().enumerate() {
            let patch = ReportPatch {
                quantity: Some(i as u32),
                ..Default::default()
            };
            store.update(&id, patch, Some(&actor(name)), None);

            let log = store.get(&id).unwrap().activity_log.clone();
            assert_eq!(log.len(), i + 1);
            assert_eq!(&log[..i], &seen[..]);
            seen = log;
        }

        let authors: Vec<_> = seen.iter().map(|e| e.author.as_str()).collect();
        assert_eq!(authors, actors);
    }

    #[test]
    fn test_remote_log_converges_with_local() {
        let remote = Arc::new(MemoryRemote::new());
        let (mut store, _) = store::<Report>(&remote);
        let id = store.create_report(report(2024), Some(&actor("An")));

        let patch = ReportPatch {
            status: Some(ReportStatus::Completed),
            ..Default::default()
        };
        store.update(&id, patch, Some(&actor("Lan")), None);
        store.add_comment(&id, "Khách đã nhận hàng", &actor("Lan"));

        let remote_doc = remote.document("reports", &id).unwrap();
        let remote_report: Report = serde_json::from_value(remote_doc).unwrap();
        assert_eq!(&remote_report, store.get(&id).unwrap());
        assert_eq!(remote_report.activity_log.len(), 3);
        assert_eq!(remote_report.activity_log[2].kind, ActivityKind::Comment);
    }

    #[test]
    fn test_update_of_record_missing_remotely_is_offline() {
        let remote = Arc::new(MemoryRemote::new());
        let (mut store, sink) = store::<Product>(&remote);
        remote.set_online(false);
        store.create(product("A", "x"));
        remote.set_online(true);

        let patch = ProductPatch {
            brand: Some("B".into()),
            ..Default::default()
        };
        assert!(store.update("A", patch, None, None));
        assert_eq!(store.get("A").unwrap().brand, "B");
        assert_eq!(sink.last().unwrap().kind, NoticeKind::Info);
    }

    #[test]
    fn test_comment_on_collection_without_log() {
        let remote = Arc::new(MemoryRemote::new());
        let (mut store, _) = store::<Product>(&remote);
        store.create(product("A", "x"));
        assert!(!store.add_comment("A", "hi", &actor("An")));
        assert!(!store.add_comment("B", "hi", &actor("An")));
    }

    // =========================================================================
    // Delete
    // =========================================================================

    #[test]
    fn test_delete() {
        let remote = Arc::new(MemoryRemote::new());
        let (mut store, _) = store::<Product>(&remote);
        store.create(product("A", "x"));
        store.create(product("B", "y"));

        assert!(store.delete("A"));
        assert!(!store.delete("A"));
        assert_eq!(store.items(), &[product("B", "y")]);
        assert_eq!(remote.keys("products").unwrap(), vec!["B"]);
        assert_write_through(&store);
    }

    #[test]
    fn test_delete_all() {
        let remote = Arc::new(MemoryRemote::new());
        remote.seed(
            "products",
            [
                ("A".to_string(), json!({"code": "A"})),
                ("Z".to_string(), json!({"code": "Z"})),
            ],
        );
        let (mut store, sink) = store::<Product>(&remote);
        store.connect();
        store.poll_remote();
        store.create(product("B", "y"));

        store.delete_all();
        assert!(store.is_empty());
        assert!(remote.keys("products").unwrap().is_empty());
        assert_eq!(sink.last().unwrap().kind, NoticeKind::Success);
        assert_write_through(&store);
    }

    #[test]
    fn test_delete_all_offline_resurrects_on_reconnect() {
        let remote = Arc::new(MemoryRemote::new());
        remote.seed("products", [("A".to_string(), json!({"code": "A"}))]);
        let (mut store, sink) = store::<Product>(&remote);
        store.connect();
        store.poll_remote();

        remote.set_online(false);
        store.delete_all();
        assert!(store.is_empty());
        assert_eq!(sink.last().unwrap().kind, NoticeKind::Info);

        remote.set_online(true);
        store.connect();
        store.poll_remote();
        assert_eq!(store.len(), 1);
    }

    // =========================================================================
    // Bulk import
    // =========================================================================

    #[test]
    fn test_bulk_import_overwrites_within_batch() {
        let remote = Arc::new(MemoryRemote::new());
        let (mut store, sink) = store::<Product>(&remote);
        store.create(product("B", "old"));

        assert!(store.bulk_import(vec![
            product("A", "x"),
            product("B", "new"),
            product("A", "y"),
        ]));

        assert_eq!(store.items(), &[product("B", "new"), product("A", "y")]);
        assert_eq!(remote.document("products", "A").unwrap()["tradeName"], "y");
        assert_eq!(sink.last().unwrap().message, "Đã nhập 3 sản phẩm");
        assert_write_through(&store);
    }

    #[test]
    fn test_bulk_import_empty() {
        let remote = Arc::new(MemoryRemote::new());
        let (mut store, sink) = store::<Product>(&remote);
        assert!(!store.bulk_import(Vec::new()));
        assert!(sink.notices().is_empty());
    }

    #[test]
    fn test_bulk_import_respects_batch_limit() {
        let remote = Arc::new(MemoryRemote::new());
        let (store, _) = store::<Product>(&remote);
        let mut store = store.with_batch_limit(2);

        let items: Vec<_> = (0..5).map(|i| product(&format!("P{}", i), "x")).collect();
        store.bulk_import(items);
        assert_eq!(remote.commit_count(), 3);
        assert_eq!(remote.keys("products").unwrap().len(), 5);
    }

    // =========================================================================
    // Rename
    // =========================================================================

    #[test]
    fn test_rename_moves_key() {
        let remote = Arc::new(MemoryRemote::new());
        let (mut store, sink) = store::<Customer>(&remote);
        store.create(customer("C1"));
        let commits = remote.commit_count();

        let renamed = store.get("C1").unwrap().with_code("C2");
        store.rename("C1", renamed).unwrap();

        assert!(store.get("C1").is_none());
        assert_eq!(store.get("C2").unwrap().company_name, "Công ty C1");
        assert_eq!(remote.keys("customers").unwrap(), vec!["C2"]);
        // one batch for both writes
        assert_eq!(remote.commit_count(), commits + 1);
        assert_eq!(sink.last().unwrap().kind, NoticeKind::Success);
        assert_write_through(&store);
    }

    #[test]
    fn test_rename_to_existing_key_fails_untouched() {
        let remote = Arc::new(MemoryRemote::new());
        let (mut store, sink) = store::<Customer>(&remote);
        store.create(customer("C1"));
        store.create(customer("C2"));
        let before = store.items().to_vec();
        let commits = remote.commit_count();

        let err = store.rename("C1", customer("C1").with_code("C2")).unwrap_err();
        assert_eq!(err, StoreError::DuplicateKey("C2".into()));
        assert_eq!(store.items(), &before[..]);
        assert_eq!(remote.commit_count(), commits);
        assert_eq!(sink.last().unwrap().kind, NoticeKind::Error);
    }

    #[test]
    fn test_rename_same_key_is_update() {
        let remote = Arc::new(MemoryRemote::new());
        let (mut store, _) = store::<Customer>(&remote);
        store.create(customer("C1"));
        let mut changed = customer("C1");
        changed.region = "Miền Bắc".into();
        store.rename("C1", changed).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("C1").unwrap().region, "Miền Bắc");
    }

    // =========================================================================
    // Report ids
    // =========================================================================

    #[test]
    fn test_create_report_assigns_sequential_ids() {
        let remote = Arc::new(MemoryRemote::new());
        let (mut store, _) = store::<Report>(&remote);

        assert_eq!(store.create_report(report(2024), None), "2024-001");
        assert_eq!(store.create_report(report(2024), None), "2024-002");
        assert_eq!(store.create_report(report(2025), None), "2025-001");
        assert_eq!(store.create_report(report(2024), None), "2024-003");
    }

    #[test]
    fn test_create_report_keeps_caller_id() {
        let remote = Arc::new(MemoryRemote::new());
        let (mut store, _) = store::<Report>(&remote);
        let mut r = report(2024);
        r.id = "2024-050".into();
        assert_eq!(store.create_report(r, None), "2024-050");
        assert_eq!(store.create_report(report(2024), None), "2024-051");
    }

    #[test]
    fn test_create_report_with_actor_logs_creation() {
        let remote = Arc::new(MemoryRemote::new());
        let (mut store, _) = store::<Report>(&remote);
        let id = store.create_report(report(2024), Some(&actor("An")));
        let r = store.get(&id).unwrap();
        assert_eq!(r.created_by.as_deref(), Some("An"));
        assert_eq!(r.activity_log[0].text, CREATED_LOG);
    }

    #[test]
    fn test_stale_views_collide_on_generated_id() {
        let remote = Arc::new(MemoryRemote::offline());
        let (mut a, _) = store::<Report>(&remote);
        let (mut b, _) = store::<Report>(&remote);
        assert_eq!(a.create_report(report(2024), None), b.create_report(report(2024), None));
    }

    #[test]
    fn test_create_report_after_huge_remote_sequence() {
        let remote = Arc::new(MemoryRemote::new());
        let mut huge = report(2024);
        huge.id = "2024-4294967295".into();
        remote.seed(
            "reports",
            [(huge.id.clone(), serde_json::to_value(&huge).unwrap())],
        );

        let (mut store, _) = store::<Report>(&remote);
        assert_eq!(store.connect(), SyncState::Subscribed);
        store.poll_remote();
        assert_eq!(store.len(), 1);

        assert_eq!(store.create_report(report(2024), None), "2024-4294967296");
    }

    // =========================================================================
    // Offline degradation across every mutation
    // =========================================================================

    #[test]
    fn test_every_mutation_offline_applies_locally() {
        let remote = Arc::new(MemoryRemote::offline());
        let (mut store, sink) = store::<Customer>(&remote);

        store.create(customer("C1"));
        assert_write_through(&store);
        store.update(
            "C1",
            crate::entities::CustomerPatch {
                region: Some("Nam".into()),
                ..Default::default()
            },
            None,
            None,
        );
        assert_write_through(&store);
        store.rename("C1", customer("C1").with_code("C9")).unwrap();
        assert_write_through(&store);
        store.bulk_import(vec![customer("C2"), customer("C3")]);
        assert_write_through(&store);
        store.delete("C2");
        assert_write_through(&store);

        let keys: Vec<_> = store.items().iter().map(|c| c.code.as_str()).collect();
        assert_eq!(keys, vec!["C9", "C3"]);

        store.delete_all();
        assert!(store.is_empty());
        assert_write_through(&store);

        let notices = sink.notices();
        assert_eq!(notices.len(), 6);
        assert!(notices
            .iter()
            .all(|n| n.kind == NoticeKind::Info && n.message.ends_with(OFFLINE_SUFFIX)));
    }
}

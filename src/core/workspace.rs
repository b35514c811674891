//! Workspace - the three Entity Stores, constructed once at startup

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::core::actor::Actor;
use crate::core::cache::{CacheError, LocalCache, CACHE_FILE};
use crate::core::config::Config;
use crate::core::notify::NotificationSink;
use crate::core::remote::{FileRemote, MemoryRemote, RemoteStore};
use crate::core::store::{EntityStore, SyncState};
use crate::entities::{Customer, Product, Report};

/// Remote handle shared by the three stores
pub type SharedRemote = Arc<dyn RemoteStore>;

/// Owner of every store the application uses
pub struct Workspace {
    pub reports: EntityStore<Report, SharedRemote>,
    pub products: EntityStore<Product, SharedRemote>,
    pub customers: EntityStore<Customer, SharedRemote>,
    actor: Actor,
}

impl Workspace {
    /// Build the stores described by `config`
    ///
    /// Without a `remote_dir` the stores run against a remote that refuses
    /// every call, so they stay Degraded and work purely from the cache.
    /// Stores are not connected yet; call [`Workspace::connect`].
    pub fn open(config: &Config, sink: Arc<dyn NotificationSink>) -> Result<Self, CacheError> {
        let remote: SharedRemote = match config.remote_dir {
            Some(ref dir) => Arc::new(FileRemote::new(dir)),
            None => Arc::new(MemoryRemote::offline()),
        };
        Self::with_remote(
            &config.data_dir(),
            remote,
            sink,
            config.batch_limit(),
            config.actor(),
        )
    }

    /// Build the stores over an explicit remote
    pub fn with_remote(
        data_dir: &Path,
        remote: SharedRemote,
        sink: Arc<dyn NotificationSink>,
        batch_limit: usize,
        actor: Actor,
    ) -> Result<Self, CacheError> {
        let db = data_dir.join(CACHE_FILE);
        debug!(path = %db.display(), "Opening local cache");

        Ok(Self {
            reports: EntityStore::new(LocalCache::open(&db)?, remote.clone(), sink.clone())
                .with_batch_limit(batch_limit),
            products: EntityStore::new(LocalCache::open(&db)?, remote.clone(), sink.clone())
                .with_batch_limit(batch_limit),
            customers: EntityStore::new(LocalCache::open(&db)?, remote, sink)
                .with_batch_limit(batch_limit),
            actor,
        })
    }

    /// Subscribe every store and apply the first snapshots
    pub fn connect(&mut self) {
        self.reports.connect();
        self.products.connect();
        self.customers.connect();
        self.poll();
    }

    /// Apply queued snapshots across all stores
    pub fn poll(&mut self) -> usize {
        self.reports.poll_remote() + self.products.poll_remote() + self.customers.poll_remote()
    }

    pub fn disconnect(&mut self) {
        self.reports.disconnect();
        self.products.disconnect();
        self.customers.disconnect();
    }

    /// True when every store holds a live subscription
    pub fn is_online(&self) -> bool {
        [
            self.reports.state(),
            self.products.state(),
            self.customers.state(),
        ]
        .iter()
        .all(|s| *s == SyncState::Subscribed)
    }

    /// Who mutations from this workspace are attributed to
    pub fn actor(&self) -> &Actor {
        &self.actor
    }
}

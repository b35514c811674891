//! Core module - the sync engine and its supporting types

pub mod actor;
pub mod cache;
pub mod config;
pub mod entity;
pub mod identity;
pub mod logging;
pub mod notify;
pub mod remote;
pub mod store;
pub mod workspace;

pub use actor::{ActivityEntry, ActivityKind, Actor, Role};
pub use cache::{CacheError, LocalCache};
pub use config::Config;
pub use entity::{Entity, RenameKey};
pub use identity::{IdParseError, ReportId};
pub use notify::{Notice, NoticeKind, NotificationSink, RecordingSink, TracingSink};
pub use remote::{FileRemote, MemoryRemote, RemoteError, RemoteStore, Snapshot, WriteOp};
pub use store::{EntityStore, StoreError, SyncState};
pub use workspace::Workspace;

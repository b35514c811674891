//! SQLite-backed Local Cache
//!
//! Each collection is stored as one JSON array blob keyed by collection name:
//! - `load` never fails; a missing, unreadable or malformed blob is an empty
//!   collection
//! - `save` replaces the whole blob, and is skipped when its hash is unchanged
//!
//! The cache is user-local. It only mirrors what the in-memory view held at
//! the last mutation or snapshot; the Remote Store is the source of truth.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::warn;

/// Cache file name within the data directory
pub const CACHE_FILE: &str = "cache.db";

/// Current schema version - cache is rebuilt on version mismatch
const SCHEMA_VERSION: i32 = 1;

/// Errors raised while writing the cache
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Durable key -> JSON blob store, one row per collection
pub struct LocalCache {
    conn: Connection,
}

impl LocalCache {
    /// Open or create the cache database at `path`
    pub fn open(path: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        // Enable WAL mode so the three stores can hold separate connections
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        let cache = Self { conn };
        cache.ensure_schema()?;
        Ok(cache)
    }

    /// Open a private in-memory cache (nothing survives the process)
    pub fn in_memory() -> Result<Self, CacheError> {
        let cache = Self {
            conn: Connection::open_in_memory()?,
        };
        cache.ensure_schema()?;
        Ok(cache)
    }

    fn ensure_schema(&self) -> Result<(), CacheError> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);
            "#,
        )?;

        let current: Option<i32> = self
            .conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .optional()?;

        if current != Some(SCHEMA_VERSION) {
            // No migrations: the cache is rebuilt from the remote on next snapshot
            self.conn.execute_batch(
                r#"
                DROP TABLE IF EXISTS collections;
                DELETE FROM schema_version;
                CREATE TABLE collections (
                    name       TEXT PRIMARY KEY,
                    body       TEXT NOT NULL,
                    hash       TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );
                "#,
            )?;
            self.conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                params![SCHEMA_VERSION],
            )?;
        }

        Ok(())
    }

    /// Load a collection, or an empty one if nothing usable is stored
    pub fn load<T: DeserializeOwned>(&self, name: &str) -> Vec<T> {
        let body: Option<String> = match self
            .conn
            .query_row(
                "SELECT body FROM collections WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()
        {
            Ok(body) => body,
            Err(e) => {
                warn!(collection = name, error = %e, "Failed to read cached collection");
                return Vec::new();
            }
        };

        let Some(body) = body else {
            return Vec::new();
        };

        match serde_json::from_str(&body) {
            Ok(items) => items,
            Err(e) => {
                warn!(collection = name, error = %e, "Discarding malformed cached collection");
                Vec::new()
            }
        }
    }

    /// Overwrite the stored blob for a collection
    ///
    /// Returns false when the stored content was already identical.
    pub fn save<T: Serialize>(&self, name: &str, items: &[T]) -> Result<bool, CacheError> {
        let body = serde_json::to_string(items)?;
        let hash = compute_hash(&body);

        let stored: Option<String> = self
            .conn
            .query_row(
                "SELECT hash FROM collections WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;

        if stored.as_deref() == Some(hash.as_str()) {
            return Ok(false);
        }

        self.conn.execute(
            r#"INSERT OR REPLACE INTO collections (name, body, hash, updated_at)
               VALUES (?1, ?2, ?3, ?4)"#,
            params![name, body, hash, Utc::now().to_rfc3339()],
        )?;
        Ok(true)
    }

    /// When the collection blob was last written, if ever
    pub fn last_updated(&self, name: &str) -> Option<DateTime<Utc>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT updated_at FROM collections WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()
            .ok()
            .flatten();

        raw.and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    #[cfg(test)]
    fn write_raw(&self, name: &str, body: &str) {
        self.conn
            .execute(
                r#"INSERT OR REPLACE INTO collections (name, body, hash, updated_at)
                   VALUES (?1, ?2, ?3, ?4)"#,
                params![name, body, compute_hash(body), Utc::now().to_rfc3339()],
            )
            .unwrap();
    }
}

/// Compute SHA256 hash of content
fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

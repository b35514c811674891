//! Remote Store on a shared directory
//!
//! Several processes may point at the same directory. Each commit holds an
//! exclusive advisory lock on `<collection>.lock` for its whole
//! read-apply-write cycle, and the new document map is written to a uniquely
//! named temp file that is renamed over `<collection>.json`.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tempfile::NamedTempFile;

use super::{
    apply_batch, snapshot_of, Documents, RemoteError, RemoteStore, Subscribers, Subscription,
    WriteOp,
};

/// Remote Store backed by a shared directory
///
/// ```text
/// <root>/
/// ├── reports.json      # {"2024-001": {...}, ...}
/// ├── products.json
/// └── customers.json
/// ```
///
/// Subscribers receive the collection as read at subscribe time and after
/// every commit made through this handle. Writes by other processes become
/// visible on the next subscribe.
pub struct FileRemote {
    root: PathBuf,
    subscribers: Subscribers,
}

impl FileRemote {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            subscribers: Subscribers::default(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn collection_path(&self, collection: &str) -> PathBuf {
        self.root.join(format!("{}.json", collection))
    }

    /// Block until this process holds the collection's write lock
    ///
    /// The lock is released when the returned file is closed.
    fn lock(&self, collection: &str) -> Result<File, RemoteError> {
        self.ensure_reachable()?;
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.root.join(format!("{}.lock", collection)))?;
        file.lock_exclusive()?;
        Ok(file)
    }

    fn ensure_reachable(&self) -> Result<(), RemoteError> {
        if self.root.is_dir() {
            Ok(())
        } else {
            Err(RemoteError::Unavailable(format!(
                "remote directory {} is not reachable",
                self.root.display()
            )))
        }
    }

    fn read(&self, collection: &str) -> Result<Documents, RemoteError> {
        self.ensure_reachable()?;
        let path = self.collection_path(collection);
        if !path.exists() {
            return Ok(Documents::new());
        }
        let content = fs::read_to_string(&path)?;
        if content.trim().is_empty() {
            return Ok(Documents::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn write(&self, collection: &str, docs: &Documents) -> Result<(), RemoteError> {
        let content = serde_json::to_string_pretty(docs)?;
        let mut tmp = NamedTempFile::new_in(&self.root)?;
        tmp.write_all(content.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.collection_path(collection)).map_err(|e| e.error)?;
        Ok(())
    }
}

impl RemoteStore for FileRemote {
    fn subscribe(&self, collection: &str) -> Result<Subscription, RemoteError> {
        let docs = self.read(collection)?;
        Ok(self.subscribers.add(collection, snapshot_of(&docs)))
    }

    fn keys(&self, collection: &str) -> Result<Vec<String>, RemoteError> {
        Ok(self.read(collection)?.into_keys().collect())
    }

    fn commit(&self, collection: &str, batch: &[WriteOp]) -> Result<(), RemoteError> {
        let _lock = self.lock(collection)?;

        let current = self.read(collection)?;
        let next = apply_batch(collection, &current, batch)?;
        self.write(collection, &next)?;
        self.subscribers.broadcast(collection, &snapshot_of(&next));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::thread;
    use tempfile::tempdir;

    #[test]
    fn test_missing_root_is_unavailable() {
        let remote = FileRemote::new("/nonexistent/qms/remote");
        assert!(matches!(
            remote.subscribe("products"),
            Err(RemoteError::Unavailable(_))
        ));
        assert!(remote.upsert("products", "A", json!({})).is_err());
    }

    #[test]
    fn test_commit_persists_and_broadcasts() {
        let dir = tempdir().unwrap();
        let remote = FileRemote::new(dir.path());
        let sub = remote.subscribe("customers").unwrap();

        remote
            .upsert("customers", "C1", json!({"code": "C1"}))
            .unwrap();

        let drained = sub.drain();
        assert_eq!(drained.snapshots.len(), 2);
        assert_eq!(drained.snapshots[1].documents, vec![json!({"code": "C1"})]);

        // A second handle on the same directory sees the write
        let other = FileRemote::new(dir.path());
        assert_eq!(other.keys("customers").unwrap(), vec!["C1"]);
        assert!(dir.path().join("customers.json").exists());
    }

    #[test]
    fn test_failed_batch_leaves_file_untouched() {
        let dir = tempdir().unwrap();
        let remote = FileRemote::new(dir.path());
        remote.upsert("reports", "2024-001", json!({"id": "2024-001"})).unwrap();

        let batch = [
            WriteOp::Delete {
                key: "2024-001".into(),
            },
            WriteOp::Patch {
                key: "missing".into(),
                fields: Default::default(),
                append: Vec::new(),
            },
        ];
        assert!(remote.commit("reports", &batch).is_err());
        assert_eq!(remote.keys("reports").unwrap(), vec!["2024-001"]);
    }

    #[test]
    fn test_concurrent_handles_keep_every_write() {
        let dir = tempdir().unwrap();
        let root = Arc::new(dir.path().to_path_buf());

        let writers: Vec<_> = (0..2)
            .map(|c| {
                let root = Arc::clone(&root);
                thread::spawn(move || {
                    let remote = FileRemote::new(root.as_path());
                    for i in 0..100 {
                        let key = format!("C{}-{}", c, i);
                        remote
                            .upsert("customers", &key, json!({"code": key}))
                            .unwrap();
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        let remote = FileRemote::new(dir.path());
        assert_eq!(remote.keys("customers").unwrap().len(), 200);

        // Only the collection document and its lock file are left behind
        let mut names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        assert_eq!(names, vec!["customers.json", "customers.lock"]);
    }
}

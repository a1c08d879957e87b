//! Deferred writes stored as JSON files in the node's data directory
//!
//! One file per write, named `{created}_{pid}_{seq}.xdb` so a lexical sort
//! is oldest first. Files are written to a `.tmp` sibling and renamed into
//! place, so a crash never leaves a half-written `.xdb` behind. Entries that
//! fail to parse are renamed to `.bad` and skipped from then on.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use application::ApplicationError;
use application::ports::{PendingWrite, PendingWriteId, PendingWriteStorePort};
use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

pub const PENDING_EXTENSION: &str = "xdb";
const QUARANTINE_EXTENSION: &str = "bad";
const TMP_EXTENSION: &str = "tmp";
const NAME_TIME_FORMAT: &str = "%Y%m%dT%H%M%S%6f";

#[derive(Debug)]
pub struct FilePendingWriteStore {
    dir: PathBuf,
    seq: AtomicU64,
}

impl FilePendingWriteStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            seq: AtomicU64::new(0),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_of(&self, id: &PendingWriteId) -> Result<PathBuf, ApplicationError> {
        // Ids come from `list`; anything with a separator is not ours
        if id.as_str().contains(['/', '\\']) || id.as_str().starts_with('.') {
            return Err(ApplicationError::NotFound(format!("Pending write {id}")));
        }
        Ok(self.dir.join(id.as_str()))
    }

    fn next_name(&self, write: &PendingWrite) -> String {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        format!(
            "{}_{}_{seq:04}.{PENDING_EXTENSION}",
            write.created_at.format(NAME_TIME_FORMAT),
            std::process::id()
        )
    }
}

fn io_error(path: &Path, e: &std::io::Error) -> ApplicationError {
    ApplicationError::Io(format!("{}: {e}", path.display()))
}

#[async_trait]
impl PendingWriteStorePort for FilePendingWriteStore {
    #[instrument(skip(self, write), fields(op = write.op.kind(), table = write.op.table()))]
    async fn stash(&self, write: &PendingWrite) -> Result<PendingWriteId, ApplicationError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| io_error(&self.dir, &e))?;

        let name = self.next_name(write);
        let path = self.dir.join(&name);
        let tmp = path.with_extension(TMP_EXTENSION);
        let body = serde_json::to_vec_pretty(write)?;

        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| io_error(&tmp, &e))?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            if let Err(cleanup) = tokio::fs::remove_file(&tmp).await {
                warn!(file = %tmp.display(), error = %cleanup, "Could not remove partial write");
            }
            return Err(io_error(&path, &e));
        }

        info!(file = %path.display(), "Write deferred");
        Ok(PendingWriteId::new(name))
    }

    async fn list(&self) -> Result<Vec<PendingWriteId>, ApplicationError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(&self.dir, &e)),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| io_error(&self.dir, &e))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == PENDING_EXTENSION) {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        debug!(count = names.len(), "Pending writes listed");
        Ok(names.into_iter().map(PendingWriteId::new).collect())
    }

    async fn load(&self, id: &PendingWriteId) -> Result<PendingWrite, ApplicationError> {
        let path = self.path_of(id)?;
        let body = match tokio::fs::read(&path).await {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ApplicationError::NotFound(format!("Pending write {id}")));
            },
            Err(e) => return Err(io_error(&path, &e)),
        };
        serde_json::from_slice(&body)
            .map_err(|e| ApplicationError::Serialization(format!("{}: {e}", path.display())))
    }

    async fn remove(&self, id: &PendingWriteId) -> Result<(), ApplicationError> {
        let path = self.path_of(id)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| io_error(&path, &e))?;
        debug!(file = %path.display(), "Pending write removed");
        Ok(())
    }

    async fn quarantine(&self, id: &PendingWriteId) -> Result<(), ApplicationError> {
        let path = self.path_of(id)?;
        let bad = path.with_extension(QUARANTINE_EXTENSION);
        tokio::fs::rename(&path, &bad)
            .await
            .map_err(|e| io_error(&path, &e))?;
        warn!(file = %bad.display(), "Pending write quarantined");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use application::ports::{StoreTarget, WriteOp};
    use chrono::NaiveDate;
    use domain::value_objects::Record;
    use tempfile::TempDir;

    fn write(minute: u32) -> PendingWrite {
        PendingWrite {
            op: WriteOp::Insert {
                table: "environment".into(),
                rows: vec![Record::new().with("temperature", 70.5).with("location", "attic")],
            },
            target: StoreTarget::new("sensor").with_application_name("SensorMgr"),
            created_at: NaiveDate::from_ymd_opt(2024, 2, 3)
                .unwrap()
                .and_hms_opt(4, minute, 10)
                .unwrap(),
        }
    }

    #[tokio::test]
    async fn stash_and_load() {
        let dir = TempDir::new().unwrap();
        let store = FilePendingWriteStore::new(dir.path());

        let id = store.stash(&write(5)).await.unwrap();
        assert!(id.as_str().starts_with("20240203T040510000000_"));
        assert!(id.as_str().ends_with(".xdb"));
        assert_eq!(store.load(&id).await.unwrap(), write(5));
    }

    #[tokio::test]
    async fn missing_directory_lists_nothing() {
        let dir = TempDir::new().unwrap();
        let store = FilePendingWriteStore::new(dir.path().join("absent"));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn stash_creates_directory() {
        let dir = TempDir::new().unwrap();
        let store = FilePendingWriteStore::new(dir.path().join("xdb"));
        store.stash(&write(1)).await.unwrap();
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_rename_leaves_no_tmp_file() {
        let dir = TempDir::new().unwrap();
        let store = FilePendingWriteStore::new(dir.path());
        // A fresh store numbers its first file the same way
        let name = FilePendingWriteStore::new(dir.path()).next_name(&write(5));
        let blocker = dir.path().join(&name);
        std::fs::create_dir(&blocker).unwrap();
        std::fs::write(blocker.join("occupied"), "x").unwrap();

        let err = store.stash(&write(5)).await.unwrap_err();
        assert!(matches!(err, ApplicationError::Io(_)), "{err}");

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == TMP_EXTENSION))
            .collect();
        assert!(leftovers.is_empty(), "{leftovers:?}");
    }

    #[tokio::test]
    async fn list_is_oldest_first_and_ignores_other_files() {
        let dir = TempDir::new().unwrap();
        let store = FilePendingWriteStore::new(dir.path());
        let late = store.stash(&write(30)).await.unwrap();
        let early = store.stash(&write(10)).await.unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();
        std::fs::write(dir.path().join("half.tmp"), "x").unwrap();

        assert_eq!(store.list().await.unwrap(), vec![early, late]);
    }

    #[tokio::test]
    async fn same_instant_gets_distinct_ids() {
        let dir = TempDir::new().unwrap();
        let store = FilePendingWriteStore::new(dir.path());
        let a = store.stash(&write(1)).await.unwrap();
        let b = store.stash(&write(1)).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(store.list().await.unwrap(), vec![a, b]);
    }

    #[tokio::test]
    async fn corrupt_entry_is_serialization_error_then_quarantined() {
        let dir = TempDir::new().unwrap();
        let store = FilePendingWriteStore::new(dir.path());
        std::fs::write(dir.path().join("20240101T000000000000_1_0000.xdb"), "{not json").unwrap();

        let ids = store.list().await.unwrap();
        let err = store.load(&ids[0]).await.unwrap_err();
        assert!(matches!(err, ApplicationError::Serialization(_)));

        store.quarantine(&ids[0]).await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
        assert!(dir.path().join("20240101T000000000000_1_0000.bad").exists());
    }

    #[tokio::test]
    async fn remove_and_missing_ids() {
        let dir = TempDir::new().unwrap();
        let store = FilePendingWriteStore::new(dir.path());
        let id = store.stash(&write(2)).await.unwrap();
        store.remove(&id).await.unwrap();
        assert!(store.list().await.unwrap().is_empty());

        let err = store.load(&id).await.unwrap_err();
        assert!(matches!(err, ApplicationError::NotFound(_)));
        assert!(store.load(&PendingWriteId::new("../etc/passwd")).await.is_err());
    }
}

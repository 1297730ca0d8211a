//! Store that keeps records in memory and mirrors them to a JSON snapshot file.
//!
//! Every mutation rewrites the snapshot atomically (temp file + rename), so a
//! crash leaves either the previous or the new snapshot on disk, never a torn one.
//! Mutations run against a staged copy that only becomes visible once its
//! snapshot is on disk, so a failed write leaves memory and file in agreement.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use parking_lot::Mutex;

use crate::data::memory::MemoryStore;
use crate::data::store::SeriesStore;
use crate::error::StoreError;
use crate::state::data_series::{SeriesField, SeriesFilter, SeriesRecord};

pub struct FileStore {
    path: PathBuf,
    inner: MemoryStore,
    /// Serializes mutate-then-flush so snapshots land in mutation order.
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open the snapshot at `path`. A missing file starts an empty store;
    /// an unreadable or corrupt one is an error.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, String> {
        let path = path.into();
        let records = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice::<Vec<SeriesRecord>>(&bytes)
                .map_err(|e| format!("Corrupt snapshot {}: {e}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(format!("Cannot read snapshot {}: {e}", path.display())),
        };
        let inner = MemoryStore::from_records(records);
        tracing::info!("Loaded {} signals from {:?}", inner.len(), path);
        Ok(Self {
            path,
            inner,
            write_lock: Mutex::new(()),
        })
    }

    fn mutate<T>(
        &self,
        op: impl FnOnce(&MemoryStore) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let _guard = self.write_lock.lock();
        let staged = MemoryStore::from_records(self.inner.snapshot());
        let out = op(&staged)?;
        self.flush(&staged.snapshot())?;
        self.inner.replace_with(staged);
        Ok(out)
    }

    fn flush(&self, records: &[SeriesRecord]) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(records)
            .map_err(|e| StoreError::Unavailable(format!("cannot encode snapshot: {e}")))?;
        let tmp = self.path.with_extension("json.tmp");
        let write = || -> std::io::Result<()> {
            if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
                fs::create_dir_all(dir)?;
            }
            let mut f = fs::File::create(&tmp)?;
            f.write_all(&bytes)?;
            f.sync_all()?;
            fs::rename(&tmp, &self.path)
        };
        write().map_err(|e| {
            tracing::error!("Failed to write snapshot {:?}: {e}", self.path);
            StoreError::Unavailable(format!("cannot write snapshot: {e}"))
        })
    }
}

impl SeriesStore for FileStore {
    fn get(&self, signal_id: &str) -> Result<Option<SeriesRecord>, StoreError> {
        self.inner.get(signal_id)
    }

    fn put(&self, record: SeriesRecord) -> Result<(), StoreError> {
        self.mutate(|s| s.put(record))
    }

    fn insert(&self, record: SeriesRecord) -> Result<(), StoreError> {
        self.mutate(|s| s.insert(record))
    }

    fn update_field(&self, signal_id: &str, field: SeriesField) -> Result<(), StoreError> {
        self.mutate(|s| s.update_field(signal_id, field))
    }

    fn append_values(&self, signal_id: &str, values: &[f64]) -> Result<usize, StoreError> {
        self.mutate(|s| s.append_values(signal_id, values))
    }

    fn value_count(&self, signal_id: &str) -> Result<Option<usize>, StoreError> {
        self.inner.value_count(signal_id)
    }

    fn delete(&self, signal_id: &str) -> Result<bool, StoreError> {
        self.mutate(|s| s.delete(signal_id))
    }

    fn list_all(&self) -> Result<Vec<SeriesRecord>, StoreError> {
        self.inner.list_all()
    }

    fn query(&self, filter: &SeriesFilter) -> Result<Vec<SeriesRecord>, StoreError> {
        self.inner.query(filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mutations_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signals.json");

        let store = FileStore::open(&path).unwrap();
        store
            .insert(SeriesRecord::new("1", Some("signal1".into()), 1000.0))
            .unwrap();
        assert_eq!(store.append_values("1", &[0.5, 0.25]), Ok(2));
        drop(store);

        let reopened = FileStore::open(&path).unwrap();
        let record = reopened.get("1").ok().flatten();
        assert_eq!(record.map(|r| r.signal_values), Some(vec![0.5, 0.25]));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn failed_mutation_does_not_rewrite_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signals.json");

        let store = FileStore::open(&path).unwrap();
        assert!(store.append_values("missing", &[1.0]).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn failed_snapshot_write_leaves_memory_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("data");
        let path = sub.join("signals.json");

        let store = FileStore::open(&path).unwrap();
        store.insert(SeriesRecord::new("1", None, 1000.0)).unwrap();
        assert_eq!(store.append_values("1", &[1.0, 2.0]), Ok(2));

        // A plain file where the snapshot directory was makes every write fail.
        fs::remove_dir_all(&sub).unwrap();
        fs::write(&sub, b"").unwrap();

        for _ in 0..2 {
            let err = store.append_values("1", &[3.0]);
            assert!(matches!(err, Err(StoreError::Unavailable(_))), "{err:?}");
            assert_eq!(store.value_count("1"), Ok(Some(2)));
        }
        assert!(matches!(store.delete("1"), Err(StoreError::Unavailable(_))));
        assert!(store.get("1").unwrap().is_some());
    }

    #[test]
    fn corrupt_snapshot_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signals.json");
        fs::write(&path, b"{ not json").unwrap();

        let err = FileStore::open(&path).err().unwrap_or_default();
        assert!(err.starts_with("Corrupt snapshot"), "{err}");
    }
}

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;

use crate::dataset::DatasetKind;
use crate::store::json_store::JsonStore;
use crate::store::schema::{DisabledSet, EXPORT_VERSION, ExportData};
use crate::store::writer::WriteQueue;
use crate::store::{KeyValueStorage, MemoryStorage, StoreError};

/// Per-dataset persistence of disabled sets.
///
/// Loads never fail: a missing or unreadable payload is an empty set. Saves
/// are queued and applied in the background; a failed save is logged and the
/// caller's in-memory set stays authoritative.
pub struct DisabledSetStore {
    storage: Arc<dyn KeyValueStorage>,
    queue: WriteQueue,
}

impl DisabledSetStore {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        let queue = WriteQueue::new(Arc::clone(&storage));
        Self { storage, queue }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// File-backed store keeping one JSON file per dataset in `dir`.
    pub fn open(dir: PathBuf) -> Result<Self, StoreError> {
        Ok(Self::new(Arc::new(JsonStore::with_base_dir(dir)?)))
    }

    pub fn load(&self, kind: DatasetKind) -> DisabledSet {
        // Pending writes for this key must land before we read it back.
        self.queue.flush();
        match self.read(kind) {
            Ok(set) => set.unwrap_or_default(),
            Err(e) => {
                tracing::warn!("{e}; starting {kind} with nothing disabled");
                DisabledSet::default()
            }
        }
    }

    pub fn save(&self, kind: DatasetKind, set: &DisabledSet) {
        match serde_json::to_vec(set) {
            Ok(bytes) => self.queue.put(kind.storage_key(), bytes),
            Err(e) => tracing::warn!("failed to encode {kind} disabled set: {e}"),
        }
    }

    pub fn flush(&self) {
        self.queue.flush();
    }

    fn read(&self, kind: DatasetKind) -> Result<Option<DisabledSet>, StoreError> {
        let key = kind.storage_key();
        let Some(bytes) = self.storage.read(key)? else {
            return Ok(None);
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StoreError::Parse {
                key: key.to_string(),
                source,
            })
    }

    pub fn export_all(&self) -> ExportData {
        let disabled = DatasetKind::ALL
            .into_iter()
            .map(|kind| (kind, self.load(kind)))
            .collect();
        ExportData {
            kanjiviet_export_version: EXPORT_VERSION,
            exported_at: Utc::now(),
            disabled,
        }
    }

    /// Replaces every dataset's disabled set with the export's. Datasets
    /// missing from the export are cleared.
    ///
    /// All payloads are encoded before anything is written. If a write fails,
    /// keys already overwritten are restored to their previous value on a
    /// best-effort basis and the error is returned.
    pub fn import_all(&self, data: &ExportData) -> Result<(), StoreError> {
        if data.kanjiviet_export_version != EXPORT_VERSION {
            return Err(StoreError::UnsupportedVersion {
                found: data.kanjiviet_export_version,
                expected: EXPORT_VERSION,
            });
        }

        let mut staged: Vec<(&'static str, Vec<u8>)> = Vec::new();
        for kind in DatasetKind::ALL {
            let set = data.disabled.get(&kind).cloned().unwrap_or_default();
            let bytes = serde_json::to_vec(&set).map_err(|source| StoreError::Parse {
                key: kind.storage_key().to_string(),
                source,
            })?;
            staged.push((kind.storage_key(), bytes));
        }

        self.queue.flush();
        let mut previous: BTreeMap<&'static str, Option<Vec<u8>>> = BTreeMap::new();
        for (key, _) in &staged {
            previous.insert(*key, self.storage.read(key)?);
        }

        let mut committed: Vec<&'static str> = Vec::new();
        for (key, bytes) in &staged {
            if let Err(e) = self.storage.write(key, bytes) {
                for done in &committed {
                    let restored = match &previous[done] {
                        Some(old) => self.storage.write(done, old),
                        None => self.storage.remove(done),
                    };
                    if let Err(restore_err) = restored {
                        tracing::error!("failed to restore {done} after import failure: {restore_err}");
                    }
                }
                return Err(e);
            }
            committed.push(*key);
        }
        tracing::info!("imported disabled sets for {} datasets", committed.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn set(keys: &[&str]) -> DisabledSet {
        keys.iter().copied().collect()
    }

    #[test]
    fn test_load_defaults_to_empty() {
        let store = DisabledSetStore::in_memory();
        for kind in DatasetKind::ALL {
            assert!(store.load(kind).is_empty());
        }
    }

    #[test]
    fn test_save_then_load() {
        let store = DisabledSetStore::in_memory();
        store.save(DatasetKind::Hsk, &set(&["1-5", "2-3"]));
        assert_eq!(store.load(DatasetKind::Hsk), set(&["1-5", "2-3"]));
    }

    #[test]
    fn test_datasets_are_isolated() {
        let store = DisabledSetStore::in_memory();
        store.save(DatasetKind::Hsk, &set(&["1-5"]));
        store.save(DatasetKind::Kanji, &set(&["山"]));
        store.save(DatasetKind::Hsk, &DisabledSet::new());

        assert!(store.load(DatasetKind::Hsk).is_empty());
        assert_eq!(store.load(DatasetKind::Kanji), set(&["山"]));
        assert!(store.load(DatasetKind::Tocfl).is_empty());
    }

    #[test]
    fn test_corrupt_payload_loads_as_empty() {
        let storage = Arc::new(MemoryStorage::new());
        storage
            .write(DatasetKind::Sentences.storage_key(), b"{not json")
            .unwrap();
        let store = DisabledSetStore::new(storage);
        assert!(store.load(DatasetKind::Sentences).is_empty());
    }

    #[test]
    fn test_export_import_round_trip() {
        let store = DisabledSetStore::in_memory();
        store.save(DatasetKind::Hsk, &set(&["1-5"]));
        store.save(DatasetKind::Kanji, &set(&["山", "川"]));
        let export = store.export_all();
        assert_eq!(export.kanjiviet_export_version, EXPORT_VERSION);

        let other = DisabledSetStore::in_memory();
        other.save(DatasetKind::Tocfl, &set(&["1-1"]));
        other.import_all(&export).unwrap();

        assert_eq!(other.load(DatasetKind::Hsk), set(&["1-5"]));
        assert_eq!(other.load(DatasetKind::Kanji), set(&["山", "川"]));
        assert!(other.load(DatasetKind::Tocfl).is_empty());
    }

    #[test]
    fn test_version_rejection() {
        let store = DisabledSetStore::in_memory();
        let mut export = store.export_all();
        export.kanjiviet_export_version = 99;

        let result = store.import_all(&export);
        let err_msg = result.unwrap_err().to_string();
        assert!(err_msg.contains("Unsupported export version"));
        assert!(err_msg.contains("99"));
    }

    /// Fails writes to one key, succeeds for the rest.
    struct FlakyStorage {
        inner: MemoryStorage,
        fail_key: &'static str,
        armed: Mutex<bool>,
    }

    impl KeyValueStorage for FlakyStorage {
        fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
            self.inner.read(key)
        }

        fn write(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
            if key == self.fail_key && *self.armed.lock().unwrap() {
                return Err(StoreError::Write {
                    key: key.to_string(),
                    source: std::io::Error::other("read-only"),
                });
            }
            self.inner.write(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StoreError> {
            self.inner.remove(key)
        }
    }

    #[test]
    fn test_import_failure_restores_committed_keys() {
        let storage = Arc::new(FlakyStorage {
            inner: MemoryStorage::new(),
            fail_key: DatasetKind::Kanji.storage_key(),
            armed: Mutex::new(false),
        });
        let store = DisabledSetStore::new(storage.clone());
        store.save(DatasetKind::Hsk, &set(&["1-1"]));
        store.flush();
        *storage.armed.lock().unwrap() = true;

        let source = DisabledSetStore::in_memory();
        source.save(DatasetKind::Hsk, &set(&["2-2"]));
        source.save(DatasetKind::Tocfl, &set(&["1-3"]));
        let export = source.export_all();

        assert!(store.import_all(&export).is_err());
        assert_eq!(store.load(DatasetKind::Hsk), set(&["1-1"]));
        assert!(store.load(DatasetKind::Tocfl).is_empty());
    }
}

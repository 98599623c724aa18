// Path: crates/storage/src/redb_store.rs
use cohort_api::storage::DkgStore;
use cohort_types::codec;
use cohort_types::error::StorageError;
use cohort_types::tdh::{DkgSessionId, DkgShareRecord};
use parking_lot::Mutex;
use redb::{Database, ReadableTable, TableDefinition};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// key = session id, value = SCALE(DkgShareRecord)
const DKG_SESSIONS: TableDefinition<&[u8; 32], &[u8]> = TableDefinition::new("DKG_SESSIONS");

fn backend(e: impl ToString) -> StorageError {
    StorageError::Backend(e.to_string())
}

/// A durable session store. Writes go to disk before the in-memory index.
#[derive(Clone)]
pub struct RedbDkgStore {
    db: Arc<Database>,
    index: Arc<Mutex<BTreeMap<DkgSessionId, DkgShareRecord>>>,
}

impl RedbDkgStore {
    /// Opens or creates the database at `path` and loads every stored session.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = Database::create(path.as_ref()).map_err(backend)?;

        // Ensure the table exists
        {
            let w = db.begin_write().map_err(backend)?;
            w.open_table(DKG_SESSIONS).map_err(backend)?;
            w.commit().map_err(backend)?;
        }

        let mut index = BTreeMap::new();
        {
            let r = db.begin_read().map_err(backend)?;
            let table = r.open_table(DKG_SESSIONS).map_err(backend)?;
            for entry in table.iter().map_err(backend)? {
                let (k, v) = entry.map_err(backend)?;
                let record: DkgShareRecord = codec::from_bytes_canonical(v.value())
                    .map_err(|e| StorageError::Decode(e.to_string()))?;
                index.insert(DkgSessionId(*k.value()), record);
            }
        }
        tracing::info!(
            target: "storage",
            path = %path.as_ref().display(),
            sessions = index.len(),
            "opened DKG session store"
        );

        Ok(Self {
            db: Arc::new(db),
            index: Arc::new(Mutex::new(index)),
        })
    }
}

impl DkgStore for RedbDkgStore {
    fn get(&self, id: &DkgSessionId) -> Result<Option<DkgShareRecord>, StorageError> {
        Ok(self.index.lock().get(id).cloned())
    }

    fn insert(&self, id: DkgSessionId, record: DkgShareRecord) -> Result<bool, StorageError> {
        let mut index = self.index.lock();
        if index.contains_key(&id) {
            return Ok(false);
        }
        let bytes = codec::to_bytes_canonical(&record);
        let w = self.db.begin_write().map_err(backend)?;
        {
            let mut table = w.open_table(DKG_SESSIONS).map_err(backend)?;
            table.insert(&id.0, bytes.as_slice()).map_err(backend)?;
        }
        w.commit().map_err(backend)?;
        index.insert(id, record);
        tracing::debug!(target: "storage", session = %id, "persisted DKG session");
        Ok(true)
    }

    fn sessions(&self) -> Result<Vec<DkgSessionId>, StorageError> {
        Ok(self.index.lock().keys().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(index: u32) -> DkgShareRecord {
        DkgShareRecord {
            index,
            n: 4,
            threshold: 3,
            secret_share: vec![index as u8; 32],
            commitments: vec![vec![2; 33], vec![3; 33], vec![2; 33]],
            public_key: vec![2; 33],
        }
    }

    #[test]
    fn test_sessions_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dkg.redb");
        let id = DkgSessionId([7; 32]);
        {
            let store = RedbDkgStore::open(&path).unwrap();
            assert!(store.insert(id, record(1)).unwrap());
        }
        let reopened = RedbDkgStore::open(&path).unwrap();
        assert_eq!(reopened.get(&id).unwrap(), Some(record(1)));
        assert_eq!(reopened.sessions().unwrap(), vec![id]);
    }

    #[test]
    fn test_insert_does_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbDkgStore::open(dir.path().join("dkg.redb")).unwrap();
        let id = DkgSessionId([1; 32]);
        assert!(store.insert(id, record(0)).unwrap());
        assert!(!store.insert(id, record(2)).unwrap());
        assert_eq!(store.get(&id).unwrap().map(|r| r.index), Some(0));
        assert_eq!(store.get(&DkgSessionId([2; 32])).unwrap(), None);
    }
}

// Path: crates/storage/src/memory.rs
use cohort_api::storage::DkgStore;
use cohort_types::error::StorageError;
use cohort_types::tdh::{DkgSessionId, DkgShareRecord};
use parking_lot::Mutex;
use std::collections::BTreeMap;

/// A volatile session store.
#[derive(Default)]
pub struct MemoryDkgStore {
    sessions: Mutex<BTreeMap<DkgSessionId, DkgShareRecord>>,
}

impl DkgStore for MemoryDkgStore {
    fn get(&self, id: &DkgSessionId) -> Result<Option<DkgShareRecord>, StorageError> {
        Ok(self.sessions.lock().get(id).cloned())
    }

    fn insert(&self, id: DkgSessionId, record: DkgShareRecord) -> Result<bool, StorageError> {
        let mut sessions = self.sessions.lock();
        if sessions.contains_key(&id) {
            return Ok(false);
        }
        sessions.insert(id, record);
        Ok(true)
    }

    fn sessions(&self) -> Result<Vec<DkgSessionId>, StorageError> {
        Ok(self.sessions.lock().keys().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_insert_wins() {
        let store = MemoryDkgStore::default();
        let id = DkgSessionId([3; 32]);
        let record = |index| DkgShareRecord {
            index,
            n: 1,
            threshold: 1,
            secret_share: vec![1; 32],
            commitments: vec![vec![2; 33]],
            public_key: vec![2; 33],
        };
        assert!(store.insert(id, record(0)).unwrap());
        assert!(!store.insert(id, record(5)).unwrap());
        assert_eq!(store.get(&id).unwrap().map(|r| r.index), Some(0));
        assert_eq!(store.sessions().unwrap(), vec![id]);
    }
}

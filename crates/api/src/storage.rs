// Path: crates/api/src/storage.rs
//! Durable per-node storage for DKG sessions.

use crate::error::StorageError;
use cohort_types::tdh::{DkgSessionId, DkgShareRecord};

/// Per-node DKG session storage, keyed by session id.
///
/// Implementations guard access internally; concurrent sessions may read and
/// write through a shared reference.
pub trait DkgStore: Send + Sync {
    /// The record for `id`, if set up.
    fn get(&self, id: &DkgSessionId) -> Result<Option<DkgShareRecord>, StorageError>;

    /// Stores the record for `id`. Returns `false` without writing if one exists.
    fn insert(&self, id: DkgSessionId, record: DkgShareRecord) -> Result<bool, StorageError>;

    /// Every stored session id.
    fn sessions(&self) -> Result<Vec<DkgSessionId>, StorageError>;
}

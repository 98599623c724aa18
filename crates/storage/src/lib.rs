// Path: crates/storage/src/lib.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! Per-node storage for DKG sessions.
//!
//! `RedbDkgStore` keeps one SCALE-encoded `DkgShareRecord` per session id in a
//! single redb table and serves reads from an in-memory index loaded at open.
//! `MemoryDkgStore` is the volatile variant used when no path is configured.

pub mod memory;
pub mod redb_store;

pub use memory::MemoryDkgStore;
pub use redb_store::RedbDkgStore;

use cohort_api::storage::DkgStore;
use cohort_types::config::StorageConfig;
use cohort_types::error::StorageError;
use std::sync::Arc;

/// Opens the store `config` describes: redb at `path`, or memory when unset.
pub fn open_store(config: &StorageConfig) -> Result<Arc<dyn DkgStore>, StorageError> {
    match &config.path {
        Some(path) => Ok(Arc::new(RedbDkgStore::open(path)?)),
        None => Ok(Arc::new(MemoryDkgStore::default())),
    }
}

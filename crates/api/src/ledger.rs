// Path: crates/api/src/ledger.rs
//! What the core consumes from the ledger collaborator.

use crate::error::StorageError;
use cohort_types::ledger::{Block, ForwardLink, InclusionProof};

/// Read access to an append-only authenticated key/value store.
pub trait Ledger: Send + Sync {
    /// The latest value stored under `key`.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>;

    /// The most recent block.
    fn latest_block(&self) -> Result<Block, StorageError>;

    /// The genesis block.
    fn genesis_block(&self) -> Result<Block, StorageError>;

    /// A proof that `key` is in the state of the latest block.
    fn inclusion_proof(&self, key: &[u8]) -> Result<InclusionProof, StorageError>;

    /// The forward links from genesis to the latest block, in chain order.
    fn forward_links(&self) -> Result<Vec<ForwardLink>, StorageError>;
}

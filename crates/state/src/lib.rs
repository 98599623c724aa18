// Path: crates/state/src/lib.rs
//! # Cohort State Crate Lints
//!
//! This crate enforces a strict set of lints to ensure high-quality,
//! panic-free, and well-documented code. Panics are disallowed in non-test
//! code to promote robust error handling.
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::indexing_slicing
    )
)]
//! # Cohort State
//!
//! Verification of ledger-backed inputs. A key/value read is authenticated
//! either by a `StateProof` (Merkle inclusion in a block plus the chain of
//! roster-signed forward links that leads to that block) or by a `ReadState`
//! snapshot carrying the state unit's threshold signature.
//!
//! `MemoryLedger` is a small in-process ledger that produces both kinds of
//! evidence. It stands in for the external ledger in tests and local runs.

pub mod memory;
pub mod merkle;
pub mod proof;
pub mod read_state;

/// A prelude for easily importing the most common types.
pub mod prelude {
    pub use crate::memory::MemoryLedger;
    pub use crate::merkle::MerkleTree;
    pub use crate::proof::verify_state_proof;
    pub use crate::read_state::{build_read_state, verify_read_state, ReadStateVerifier};
}

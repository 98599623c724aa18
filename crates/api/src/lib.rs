// Path: crates/api/src/lib.rs
#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::indexing_slicing
    )
)]

//! # Cohort API
//!
//! The traits that sit between the protocol core and its collaborators. The
//! ledger and the tree transport are external systems; this crate describes
//! only what the core consumes from them.

/// Key and signature traits.
pub mod crypto;
/// Read access to the ledger.
pub mod ledger;
/// Participant-side signing predicates.
pub mod protocol;
/// Persistent DKG session storage.
pub mod storage;
/// The tree broadcast/collect transport.
pub mod transport;

pub use cohort_types::error;

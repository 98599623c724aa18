// Path: crates/threshold/src/lib.rs
//! # Cohort Threshold Crate Lints
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
//! # Cohort Threshold
//!
//! The node runtime for a unit's protocol rounds. A `Node` owns its BLS key,
//! its DKG session store and a handle on the tree transport; it coordinates
//! rounds it starts and participates in rounds other nodes start.
//!
//! - `signing`: threshold BLS signing over one or more named messages.
//! - `dkg`: Joint-Feldman DKG setup, persisted per session id.
//! - `decrypt`: threshold decryption with per-share proofs.
//! - `attest`: receipts, plan co-signing and read-state signing on top of
//!   the signing round.
//! - `verify`: unit-wide dependency verification of an execution request.
//!
//! Each coordinator session runs until it reaches an outcome or its deadline
//! fires, whichever is first; see `completion`.

pub mod attest;
pub mod completion;
pub mod decrypt;
pub mod dkg;
pub mod messages;
pub mod node;
pub mod quorum;
pub mod signing;
pub mod verify;

pub use attest::{sign_plan, sign_read_state, ReceiptIssuer};
pub use node::Node;

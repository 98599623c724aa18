// Path: crates/types/src/lib.rs
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

//! # Cohort Types
//!
//! The foundational library for the cohort workspace: the execution-plan data
//! model, ledger proof structures, threshold-decryption wire types, canonical
//! hashing, configuration objects and every error enum.
//!
//! ## Architectural Role
//!
//! As the base crate, `cohort-types` has minimal dependencies and is itself a
//! dependency for every other crate in the workspace. Types here hold raw
//! bytes for keys, points and signatures; the cryptographic interpretation
//! lives in `cohort-crypto`.

/// A top-level, crate-wide `Result` type alias with a default error type.
pub type Result<T, E = crate::error::VerificationError> = std::result::Result<T, E>;

/// The canonical, deterministic binary codec for all wire and persisted data.
pub mod codec;
/// Shared configuration structures loaded from TOML.
pub mod config;
/// Canonical digests over plans, receipts and read-states.
pub mod digest;
/// A unified set of all error types used across the workspace.
pub mod error;
/// Ledger blocks, forward links, inclusion proofs and read-states.
pub mod ledger;
/// Contracts, workflows, execution plans, requests and receipts.
pub mod plan;
/// Signing requests and attestation artifacts.
pub mod signing;
/// Wire types for distributed key generation and threshold decryption.
pub mod tdh;

/// Length of every digest produced by the canonical hash functions.
pub const DIGEST_LEN: usize = 32;

/// A 32-byte SHA-256 digest.
pub type Digest = [u8; DIGEST_LEN];

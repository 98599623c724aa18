// Path: crates/crypto/src/lib.rs
//! # Cohort Crypto Crate Lints
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
//! # Cohort Cryptography
//!
//! - `sign`: BLS12-381 keys, participation masks and threshold aggregates.
//! - `dkg`: secp256k1 group helpers, polynomials and Feldman verifiable
//!   secret sharing for distributed key generation.
//! - `tdh`: threshold ElGamal decryption with per-share proofs.

pub mod dkg;
pub mod error;
pub mod sign;
pub mod tdh;


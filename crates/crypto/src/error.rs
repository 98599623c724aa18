// Path: crates/crypto/src/error.rs
//! Local error types for the `cohort-crypto` crate.

// Re-export the canonical error type from the types crate.
pub use cohort_types::error::CryptoError;

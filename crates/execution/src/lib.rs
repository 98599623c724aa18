// Path: crates/execution/src/lib.rs
//! # Cohort Execution Crate Lints
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
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]
//! # Cohort Execution
//!
//! The checks a functional unit runs on an `ExecutionRequest` before it
//! executes its opcode, and the extraction of verified ledger inputs into
//! key/value dictionaries for the opcode body.

pub mod kv;
pub mod verifier;

pub use crate::kv::prepare_kv_dicts;
pub use crate::verifier::DependencyVerifier;

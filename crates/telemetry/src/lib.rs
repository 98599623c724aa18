// Path: crates/telemetry/src/lib.rs
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

//! # Cohort Telemetry
//!
//! Installs the process-wide `tracing` subscriber every cohort node logs
//! through. Subsystems pick their own `target:` (`signing`, `dkg`, `tdh`,
//! `verifier`, `state_proof`, `storage`, `transport`) so operators can filter
//! them with `RUST_LOG`.

/// The initialization routine for global structured logging.
pub mod init;

pub use init::init_tracing;

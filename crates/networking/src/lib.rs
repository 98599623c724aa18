// Path: crates/networking/src/lib.rs
//! # Cohort Networking Crate Lints
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
//! # Cohort Networking
//!
//! Implementations of the `TreeTransport` seam. Discovery and real sockets
//! are out of scope; `memory` wires a fixed roster together with channels.

pub mod memory;

pub use memory::{MemoryEndpoint, MemoryNetwork};

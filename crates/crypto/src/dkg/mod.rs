// Path: crates/crypto/src/dkg/mod.rs
//! Distributed key generation over secp256k1.

pub mod group;
pub mod poly;
pub mod vss;

pub use vss::{Deal, DealShare, DistKeyShare};

#[cfg(test)]
mod tests;

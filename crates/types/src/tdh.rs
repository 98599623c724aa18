// Path: crates/types/src/tdh.rs
//! Wire and storage types for distributed key generation and threshold
//! decryption. Points are compressed SEC1 secp256k1 encodings (33 bytes) and
//! scalars are 32 big-endian bytes.

use parity_scale_codec::{Decode, Encode};
use std::fmt;

/// An opaque DKG session id agreed out of band by the requester.
#[derive(Encode, Decode, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DkgSessionId(pub [u8; 32]);

impl fmt::Display for DkgSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// An ElGamal-style ciphertext with a proof of well-formedness.
#[derive(Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct Ciphertext {
    /// `r·G`.
    pub u: Vec<u8>,
    /// `r·Ḡ` for the seed-derived generator `Ḡ`.
    pub ubar: Vec<u8>,
    /// Proof challenge.
    pub e: Vec<u8>,
    /// Proof response.
    pub f: Vec<u8>,
    /// `r·X + M`.
    pub c: Vec<u8>,
}

/// The result of one threshold decryption, handed to the client.
#[derive(Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct DecryptReply {
    /// The ciphertext's `C` component.
    pub c: Vec<u8>,
    /// The group public key `X`.
    pub x: Vec<u8>,
    /// The reconstructed blinding `x·U` (or `x·(U + Xc)`).
    pub xhat_enc: Vec<u8>,
}

/// Everything a node persists for one DKG session.
#[derive(Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct DkgShareRecord {
    /// This node's share index (zero-based roster index).
    pub index: u32,
    /// Number of nodes in the session.
    pub n: u32,
    /// Reconstruction threshold.
    pub threshold: u32,
    /// This node's secret share of the group key.
    pub secret_share: Vec<u8>,
    /// Commitments to the joint polynomial's coefficients.
    pub commitments: Vec<Vec<u8>>,
    /// The group public key `X`, equal to `commitments[0]`.
    pub public_key: Vec<u8>,
}

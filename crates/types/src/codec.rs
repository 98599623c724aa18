// Path: crates/types/src/codec.rs

//! The single binary codec for everything that crosses a process boundary.
//!
//! Protocol messages, persisted DKG sessions and ledger proofs are all encoded
//! with SCALE (`parity-scale-codec`). Decoding is strict: trailing bytes are
//! rejected so a message has exactly one accepted encoding.

use crate::error::CodecError;
use parity_scale_codec::{Decode, DecodeAll, Encode};

/// Encodes a value into its canonical SCALE bytes.
pub fn to_bytes_canonical<T: Encode>(v: &T) -> Vec<u8> {
    v.encode()
}

/// Decodes a value from canonical SCALE bytes, failing on trailing input.
pub fn from_bytes_canonical<T: Decode>(b: &[u8]) -> Result<T, CodecError> {
    T::decode_all(&mut &*b).map_err(|e| CodecError(e.to_string()))
}

// Path: crates/types/src/signing.rs
//! What a threshold signing round signs and what it produces.

use parity_scale_codec::{Decode, Encode};
use std::collections::BTreeMap;

/// The attestation a signing round produces. Participants pick their
/// verification predicate by purpose.
#[derive(Encode, Decode, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SigningPurpose {
    /// No predicate; every participant signs.
    Generic,
    /// Opcode receipts after execution.
    Receipt,
    /// A read of ledger-backed state.
    ReadState,
    /// An execution plan endorsed by the coordinating unit.
    Plan,
}

/// One message signed independently within a round.
#[derive(Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct NamedMessage {
    /// Name the aggregate is reported under (e.g. an output variable).
    pub name: String,
    /// The bytes signed.
    pub message: Vec<u8>,
}

/// The payload broadcast to participants.
#[derive(Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct SigningRequest {
    /// Selects the participant-side predicate.
    pub purpose: SigningPurpose,
    /// Messages to sign, all finalized together.
    pub messages: Vec<NamedMessage>,
    /// Opaque data the predicate needs to re-derive the messages.
    pub context: Vec<u8>,
}

impl SigningRequest {
    /// A request with a single message and no predicate context.
    pub fn single(purpose: SigningPurpose, name: &str, message: Vec<u8>) -> Self {
        Self {
            purpose,
            messages: vec![NamedMessage {
                name: name.to_string(),
                message,
            }],
            context: Vec::new(),
        }
    }
}

/// The result of a successful round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningOutcome {
    /// Final artifact per message name: `aggregate_signature || mask`.
    pub signatures: BTreeMap<String, Vec<u8>>,
    /// The participation mask shared by every artifact.
    pub mask: Vec<u8>,
}

impl SigningOutcome {
    /// The artifact for `name`.
    pub fn signature(&self, name: &str) -> Option<&[u8]> {
        self.signatures.get(name).map(Vec::as_slice)
    }
}

// Path: crates/types/src/ledger.rs
//! Data consumed from the ledger: blocks, forward links between them, Merkle
//! inclusion proofs and portable read-state snapshots.

use crate::plan::UnitIdentity;
use crate::Digest;
use parity_scale_codec::{Decode, Encode};

/// A ledger block header as seen by verifiers.
#[derive(Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Position in the chain, genesis is zero.
    pub index: u64,
    /// Hash of the previous block, zero for genesis.
    pub prev_hash: Digest,
    /// Merkle root of the key/value state after this block.
    pub state_root: Digest,
    /// The roster that signs forward links out of this block.
    pub roster: UnitIdentity,
}

/// A roster-signed pointer from one block to a later one.
#[derive(Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct ForwardLink {
    /// Hash of the source block.
    pub from: Digest,
    /// Hash of the target block.
    pub to: Digest,
    /// A roster change that takes effect after this link.
    pub new_roster: Option<UnitIdentity>,
    /// Threshold signature of the source block's roster over
    /// `ForwardLink::message()`: `sig || mask`.
    pub signature: Vec<u8>,
}

/// Which side of the running hash a sibling sits on.
#[derive(Encode, Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The sibling is the left child.
    Left,
    /// The sibling is the right child.
    Right,
}

/// One level of a Merkle path.
#[derive(Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct ProofStep {
    /// Position of the sibling.
    pub side: Side,
    /// Hash of the sibling subtree.
    pub sibling: Digest,
}

/// Proof that `key -> value` is a leaf of the tree with root `root`.
#[derive(Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct InclusionProof {
    /// The leaf key.
    pub key: Vec<u8>,
    /// The leaf value.
    pub value: Vec<u8>,
    /// Path from the leaf up to the root.
    pub path: Vec<ProofStep>,
    /// The root the proof claims.
    pub root: Digest,
}

/// Inclusion proof plus the hash chain that authenticates its block.
#[derive(Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct StateProof {
    /// Leaf inclusion in `latest.state_root`.
    pub inclusion: InclusionProof,
    /// Forward links from genesis to `latest`. The first link is synthetic and
    /// only carries the genesis roster.
    pub links: Vec<ForwardLink>,
    /// The block the inclusion proof anchors to.
    pub latest: Block,
    /// The genesis block, authenticated by the caller out of band.
    pub genesis: Block,
}

impl StateProof {
    /// The Merkle root the proof claims.
    pub fn root(&self) -> &Digest {
        &self.inclusion.root
    }
}

/// A single key/value pair from contract state.
#[derive(Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    /// The key.
    pub key: String,
    /// The value.
    pub value: Vec<u8>,
}

/// A quorum-signed snapshot of a subset of contract state.
#[derive(Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct ReadState {
    /// Root of the state the values were read from.
    pub root: Vec<u8>,
    /// The requested key/value pairs.
    pub data: Vec<KeyValue>,
    /// The state unit's threshold signature over the read-state hash.
    pub signature: Vec<u8>,
}

impl ReadState {
    /// Looks up a value by key.
    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.data
            .iter()
            .find(|kv| kv.key == key)
            .map(|kv| kv.value.as_slice())
    }
}

/// What a read-state signing round is asked to attest: the values of `keys`
/// in the storage of contract instance `cid`. Carried as the round's context
/// so every participant can repeat the read against its own ledger.
#[derive(Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct ReadStateQuery {
    /// Ledger key holding the contract instance's storage.
    pub cid: Vec<u8>,
    /// The storage keys to read.
    pub keys: Vec<String>,
}

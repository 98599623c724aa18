// Path: crates/state/src/merkle.rs
//! A binary Merkle tree over sorted key/value pairs and the stateless
//! inclusion-proof verifier.
//!
//! Leaves are ordered by key. Each level pairs neighbours left to right; an
//! odd node at the end of a level is carried up unchanged.

use cohort_types::digest::sha256;
use cohort_types::error::ProofError;
use cohort_types::ledger::{InclusionProof, ProofStep, Side};
use cohort_types::Digest;
use std::collections::BTreeMap;

const LEAF_TAG: u8 = 0x00;
const INNER_TAG: u8 = 0x01;

fn hash(data: &[u8]) -> Result<Digest, ProofError> {
    sha256(data).map_err(ProofError::from)
}

/// `H(0x00 || u32 len(key) || key || H(value))`
pub fn hash_leaf(key: &[u8], value: &[u8]) -> Result<Digest, ProofError> {
    let value_hash = hash(value)?;
    let mut data = Vec::with_capacity(1 + 4 + key.len() + value_hash.len());
    data.push(LEAF_TAG);
    data.extend_from_slice(&(key.len() as u32).to_le_bytes());
    data.extend_from_slice(key);
    data.extend_from_slice(&value_hash);
    hash(&data)
}

/// `H(0x01 || left || right)`
pub fn hash_inner(left: &Digest, right: &Digest) -> Result<Digest, ProofError> {
    let mut data = Vec::with_capacity(1 + left.len() + right.len());
    data.push(INNER_TAG);
    data.extend_from_slice(left);
    data.extend_from_slice(right);
    hash(&data)
}

/// The root an inclusion proof implies for its key and value.
pub fn compute_root(proof: &InclusionProof) -> Result<Digest, ProofError> {
    let mut current = hash_leaf(&proof.key, &proof.value)?;
    for step in &proof.path {
        current = match step.side {
            Side::Left => hash_inner(&step.sibling, &current)?,
            Side::Right => hash_inner(&current, &step.sibling)?,
        };
    }
    Ok(current)
}

/// Checks that the proof's path hashes to the root it claims.
pub fn verify_inclusion(proof: &InclusionProof) -> Result<(), ProofError> {
    if compute_root(proof)? == proof.root {
        Ok(())
    } else {
        Err(ProofError::InclusionMismatch)
    }
}

/// All levels of a tree, leaves first.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    leaves: BTreeMap<Vec<u8>, Vec<u8>>,
    levels: Vec<Vec<Digest>>,
}

impl MerkleTree {
    /// Builds the tree over `state`.
    pub fn build(state: &BTreeMap<Vec<u8>, Vec<u8>>) -> Result<Self, ProofError> {
        let mut level = state
            .iter()
            .map(|(k, v)| hash_leaf(k, v))
            .collect::<Result<Vec<_>, _>>()?;
        let mut levels = Vec::new();
        while level.len() > 1 {
            let next = level
                .chunks(2)
                .map(|pair| match pair {
                    [left, right] => hash_inner(left, right),
                    [single] => Ok(*single),
                    _ => Err(ProofError::Crypto("empty tree level".into())),
                })
                .collect::<Result<Vec<_>, _>>()?;
            levels.push(level);
            level = next;
        }
        levels.push(level);
        Ok(Self {
            leaves: state.clone(),
            levels,
        })
    }

    /// The tree root. The empty tree hashes to `H("")`.
    pub fn root(&self) -> Result<Digest, ProofError> {
        match self.levels.last().and_then(|top| top.first()) {
            Some(root) => Ok(*root),
            None => hash(&[]),
        }
    }

    /// An inclusion proof for `key`, or `None` if the key is absent.
    pub fn prove(&self, key: &[u8]) -> Result<Option<InclusionProof>, ProofError> {
        let Some(mut index) = self.leaves.keys().position(|k| k.as_slice() == key) else {
            return Ok(None);
        };
        let value = self.leaves.get(key).cloned().unwrap_or_default();

        let mut path = Vec::new();
        // The top level holds only the root.
        for level in self.levels.iter().take(self.levels.len().saturating_sub(1)) {
            let step = if index % 2 == 1 {
                level.get(index - 1).map(|s| ProofStep {
                    side: Side::Left,
                    sibling: *s,
                })
            } else {
                level.get(index + 1).map(|s| ProofStep {
                    side: Side::Right,
                    sibling: *s,
                })
            };
            path.extend(step);
            index /= 2;
        }

        Ok(Some(InclusionProof {
            key: key.to_vec(),
            value,
            path,
            root: self.root()?,
        }))
    }
}

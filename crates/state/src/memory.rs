// Path: crates/state/src/memory.rs
//! An in-process ledger that builds blocks, keeps a Merkle tree over its
//! state and signs a forward link for every new block with its roster.

use crate::merkle::MerkleTree;
use cohort_api::crypto::{SerializableKey, SigningKeyPair};
use cohort_api::ledger::Ledger;
use cohort_crypto::sign::bls::BlsKeyPair;
use cohort_crypto::sign::threshold::aggregate_partials;
use cohort_types::error::{ProofError, StorageError};
use cohort_types::ledger::{Block, ForwardLink, InclusionProof};
use cohort_types::plan::UnitIdentity;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use tracing::debug;

struct Signers {
    keys: Vec<BlsKeyPair>,
    identity: UnitIdentity,
}

impl Signers {
    fn new(keys: Vec<BlsKeyPair>, threshold: u32) -> Result<Self, ProofError> {
        let public_keys = keys.iter().map(|k| k.public_key().to_bytes()).collect();
        let identity = UnitIdentity::new(threshold, public_keys)
            .map_err(|e| ProofError::MalformedForwardLink(e.to_string()))?;
        Ok(Self { keys, identity })
    }

    /// Signs with the first `threshold` members.
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, ProofError> {
        let partials = self
            .keys
            .iter()
            .take(self.identity.threshold as usize)
            .enumerate()
            .map(|(i, k)| k.sign(message).map(|sig| (i, sig)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(aggregate_partials(self.keys.len(), partials)?.to_bytes())
    }
}

struct Chain {
    state: BTreeMap<Vec<u8>, Vec<u8>>,
    tree: MerkleTree,
    blocks: Vec<Block>,
    links: Vec<ForwardLink>,
    signers: Signers,
    next_signers: Option<Signers>,
}

/// A single-writer ledger held in memory.
pub struct MemoryLedger {
    chain: RwLock<Chain>,
}

impl MemoryLedger {
    /// Creates the genesis block over `state`, governed by `keys` with `threshold`.
    pub fn new(
        keys: Vec<BlsKeyPair>,
        threshold: u32,
        state: BTreeMap<Vec<u8>, Vec<u8>>,
    ) -> Result<Self, ProofError> {
        let signers = Signers::new(keys, threshold)?;
        let tree = MerkleTree::build(&state)?;
        let genesis = Block {
            index: 0,
            prev_hash: [0u8; 32],
            state_root: tree.root()?,
            roster: signers.identity.clone(),
        };
        Ok(Self {
            chain: RwLock::new(Chain {
                state,
                tree,
                blocks: vec![genesis],
                links: Vec::new(),
                signers,
                next_signers: None,
            }),
        })
    }

    /// Applies `writes` in a new block and links the previous block to it.
    pub fn commit(
        &self,
        writes: impl IntoIterator<Item = (Vec<u8>, Vec<u8>)>,
    ) -> Result<Block, ProofError> {
        let mut chain = self.chain.write();
        let mut state = chain.state.clone();
        state.extend(writes);
        let tree = MerkleTree::build(&state)?;

        let (prev_index, prev_hash) = match chain.blocks.last() {
            Some(prev) => (prev.index, prev.hash()?),
            None => return Err(ProofError::MissingForwardLinks),
        };
        let next_signers = chain.next_signers.take();
        let roster = next_signers
            .as_ref()
            .map(|s| s.identity.clone())
            .unwrap_or_else(|| chain.signers.identity.clone());
        let block = Block {
            index: prev_index + 1,
            prev_hash,
            state_root: tree.root()?,
            roster,
        };

        let mut link = ForwardLink {
            from: prev_hash,
            to: block.hash()?,
            new_roster: next_signers.as_ref().map(|s| s.identity.clone()),
            signature: Vec::new(),
        };
        link.signature = chain.signers.sign(&link.message()?)?;
        debug!(
            target: "state_proof",
            index = block.index,
            rotated = link.new_roster.is_some(),
            "ledger committed block"
        );

        chain.state = state;
        chain.tree = tree;
        chain.blocks.push(block.clone());
        chain.links.push(link);
        if let Some(next) = next_signers {
            chain.signers = next;
        }
        Ok(block)
    }

    /// Hands the roster over to `keys` with the next committed block.
    pub fn rotate_roster(&self, keys: Vec<BlsKeyPair>, threshold: u32) -> Result<(), ProofError> {
        let next = Signers::new(keys, threshold)?;
        self.chain.write().next_signers = Some(next);
        Ok(())
    }

    /// The roster currently signing forward links.
    pub fn roster(&self) -> UnitIdentity {
        self.chain.read().signers.identity.clone()
    }
}

impl Ledger for MemoryLedger {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.chain.read().state.get(key).cloned())
    }

    fn latest_block(&self) -> Result<Block, StorageError> {
        self.chain
            .read()
            .blocks
            .last()
            .cloned()
            .ok_or_else(|| StorageError::NotFound("latest block".into()))
    }

    fn genesis_block(&self) -> Result<Block, StorageError> {
        self.chain
            .read()
            .blocks
            .first()
            .cloned()
            .ok_or_else(|| StorageError::NotFound("genesis block".into()))
    }

    fn inclusion_proof(&self, key: &[u8]) -> Result<InclusionProof, StorageError> {
        self.chain
            .read()
            .tree
            .prove(key)
            .map_err(|e| StorageError::Backend(e.to_string()))?
            .ok_or_else(|| StorageError::NotFound(hex::encode(key)))
    }

    /// A synthetic link carrying the genesis roster, then one link per block.
    fn forward_links(&self) -> Result<Vec<ForwardLink>, StorageError> {
        let chain = self.chain.read();
        let genesis = chain
            .blocks
            .first()
            .ok_or_else(|| StorageError::NotFound("genesis block".into()))?;
        let synthetic = ForwardLink {
            from: [0u8; 32],
            to: genesis
                .hash()
                .map_err(|e| StorageError::Backend(e.to_string()))?,
            new_roster: Some(genesis.roster.clone()),
            signature: Vec::new(),
        };
        Ok(std::iter::once(synthetic)
            .chain(chain.links.iter().cloned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(n: u8, tag: u8) -> Vec<BlsKeyPair> {
        (0..n)
            .map(|i| BlsKeyPair::from_seed(&[tag, i]).unwrap())
            .collect()
    }

    #[test]
    fn test_commit_chains_blocks() {
        let ledger = MemoryLedger::new(keys(4, 1), 3, BTreeMap::new()).unwrap();
        let genesis = ledger.genesis_block().unwrap();
        let b1 = ledger.commit([(b"a".to_vec(), b"1".to_vec())]).unwrap();
        assert_eq!(b1.index, 1);
        assert_eq!(b1.prev_hash, genesis.hash().unwrap());
        assert_eq!(ledger.get(b"a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(ledger.latest_block().unwrap(), b1);

        let links = ledger.forward_links().unwrap();
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].new_roster.as_ref(), Some(&genesis.roster));
        assert_eq!(links[1].to, b1.hash().unwrap());
    }

    #[test]
    fn test_rotation_applies_to_next_block() {
        let ledger = MemoryLedger::new(keys(4, 1), 3, BTreeMap::new()).unwrap();
        let old = ledger.roster();
        ledger.rotate_roster(keys(3, 2), 2).unwrap();
        let block = ledger.commit(Vec::new()).unwrap();
        assert_ne!(block.roster, old);
        assert_eq!(ledger.roster(), block.roster);
        assert_eq!(
            ledger.forward_links().unwrap()[1].new_roster.as_ref(),
            Some(&block.roster)
        );
    }

    #[test]
    fn test_missing_key_has_no_proof() {
        let ledger = MemoryLedger::new(keys(1, 1), 1, BTreeMap::new()).unwrap();
        assert!(matches!(
            ledger.inclusion_proof(b"nope"),
            Err(StorageError::NotFound(_))
        ));
    }
}

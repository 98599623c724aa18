// Path: crates/state/src/proof.rs
//! Verification of a key/value read against a chain of authenticated blocks.

use crate::merkle::verify_inclusion;
use cohort_api::ledger::Ledger;
use cohort_crypto::sign::threshold::verify_threshold;
use cohort_types::error::{ProofError, StorageError};
use cohort_types::ledger::StateProof;
use cohort_types::plan::UnitIdentity;
use tracing::debug;

/// Verifies `proof` starting from the genesis block it carries.
///
/// The caller must have authenticated `proof.genesis` out of band and passes
/// the state unit's identity as `trusted`; link signatures are checked against
/// it until a link hands over to a new roster. The first link is synthetic: it
/// must carry a roster but its signature is never checked.
///
/// Checks, in order: the inclusion path hashes to its root and that root is
/// the latest block's state root; links are present and well formed; every
/// later link is signed by the current roster and extends the chain; the
/// chain ends at the latest block.
pub fn verify_state_proof(proof: &StateProof, trusted: &UnitIdentity) -> Result<(), ProofError> {
    verify_inclusion(&proof.inclusion)?;
    if proof.inclusion.root != proof.latest.state_root {
        return Err(ProofError::RootMismatch {
            expected: hex::encode(proof.latest.state_root),
            got: hex::encode(proof.inclusion.root),
        });
    }

    let (first, rest) = proof
        .links
        .split_first()
        .ok_or(ProofError::MissingForwardLinks)?;
    if first.new_roster.is_none() {
        return Err(ProofError::MalformedForwardLink(
            "first link carries no roster".into(),
        ));
    }

    let mut roster = trusted.clone();
    let mut block_id = proof.genesis.hash()?;
    for (offset, link) in rest.iter().enumerate() {
        let index = offset + 1;
        let message = link.message()?;
        verify_threshold(
            &message,
            &link.signature,
            &roster.public_keys,
            roster.threshold as usize,
        )
        .map_err(|e| {
            debug!(target: "state_proof", index, error = %e, "forward link signature rejected");
            ProofError::LinkSignature { index }
        })?;
        if link.from != block_id {
            return Err(ProofError::BrokenChain { index });
        }
        block_id = link.to;
        if let Some(next) = &link.new_roster {
            next.check()
                .map_err(|e| ProofError::MalformedForwardLink(e.to_string()))?;
            roster = next.clone();
        }
    }

    if proof.latest.hash()? != block_id {
        return Err(ProofError::LatestBlockMismatch);
    }
    Ok(())
}

/// Assembles a state proof for `key` from the ledger's latest block.
pub fn fetch_state_proof(ledger: &dyn Ledger, key: &[u8]) -> Result<StateProof, StorageError> {
    Ok(StateProof {
        inclusion: ledger.inclusion_proof(key)?,
        links: ledger.forward_links()?,
        latest: ledger.latest_block()?,
        genesis: ledger.genesis_block()?,
    })
}

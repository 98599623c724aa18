// Path: crates/api/src/protocol.rs
//! Hooks a participant runs before contributing to a round.

use cohort_types::signing::SigningRequest;

/// A boolean predicate a participant runs before signing, e.g. "does this
/// read-state match what I read from my own ledger?".
///
/// Returning `false` makes the participant refuse, which the coordinator
/// counts as a failure.
pub trait SignVerifier: Send + Sync {
    /// Whether the local node is willing to sign `request`.
    fn verify(&self, request: &SigningRequest) -> bool;
}

impl<F> SignVerifier for F
where
    F: Fn(&SigningRequest) -> bool + Send + Sync,
{
    fn verify(&self, request: &SigningRequest) -> bool {
        self(request)
    }
}

/// A local check that the contract state an execution plan was built on is
/// one this node accepts, e.g. that it matches its own ledger head.
///
/// Runs after dependency verification; `false` rejects the request.
pub trait UpdateVerifier: Send + Sync {
    /// Returns `true` if `state_root` for contract `cid` is acceptable.
    fn verify_update(&self, cid: &[u8], state_root: &[u8]) -> bool;
}

impl<F> UpdateVerifier for F
where
    F: Fn(&[u8], &[u8]) -> bool + Send + Sync,
{
    fn verify_update(&self, cid: &[u8], state_root: &[u8]) -> bool {
        self(cid, state_root)
    }
}

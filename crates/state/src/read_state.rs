// Path: crates/state/src/read_state.rs
//! Read-state snapshots: the state unit reads a set of keys from one contract
//! instance, every member repeats the read against its own ledger, and the
//! quorum signs `ReadState::hash()`.
//!
//! A contract instance keeps its storage under its id as a SCALE-encoded
//! list of `KeyValue` entries.

use cohort_api::ledger::Ledger;
use cohort_api::protocol::SignVerifier;
use cohort_crypto::sign::threshold::verify_threshold;
use cohort_types::codec::{from_bytes_canonical, to_bytes_canonical};
use cohort_types::error::{CodecError, CryptoError, StorageError};
use cohort_types::ledger::{KeyValue, ReadState, ReadStateQuery};
use cohort_types::plan::UnitIdentity;
use cohort_types::signing::{SigningPurpose, SigningRequest};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Encodes a contract instance's storage map.
pub fn encode_storage(entries: &BTreeMap<String, Vec<u8>>) -> Vec<u8> {
    let list: Vec<KeyValue> = entries
        .iter()
        .map(|(key, value)| KeyValue {
            key: key.clone(),
            value: value.clone(),
        })
        .collect();
    to_bytes_canonical(&list)
}

/// Decodes a contract instance's storage map.
pub fn decode_storage(bytes: &[u8]) -> Result<BTreeMap<String, Vec<u8>>, CodecError> {
    let list: Vec<KeyValue> = from_bytes_canonical(bytes)?;
    Ok(list.into_iter().map(|kv| (kv.key, kv.value)).collect())
}

/// Picks `keys` out of a storage map, failing on the first absent key.
pub fn select_keys(
    storage: &BTreeMap<String, Vec<u8>>,
    keys: &[String],
) -> Result<Vec<KeyValue>, StorageError> {
    keys.iter()
        .map(|key| {
            storage
                .get(key)
                .map(|value| KeyValue {
                    key: key.clone(),
                    value: value.clone(),
                })
                .ok_or_else(|| StorageError::NotFound(format!("storage key {key}")))
        })
        .collect()
}

/// Reads `query` from `ledger` at its latest block. The signature is left empty.
pub fn build_read_state(
    ledger: &dyn Ledger,
    query: &ReadStateQuery,
) -> Result<ReadState, StorageError> {
    let raw = ledger
        .get(&query.cid)?
        .ok_or_else(|| StorageError::NotFound(format!("contract {}", hex::encode(&query.cid))))?;
    let storage = decode_storage(&raw).map_err(|e| StorageError::Decode(e.to_string()))?;
    Ok(ReadState {
        root: ledger.latest_block()?.state_root.to_vec(),
        data: select_keys(&storage, &query.keys)?,
        signature: Vec::new(),
    })
}

/// Verifies the read-state's threshold signature against the state unit.
pub fn verify_read_state(rs: &ReadState, identity: &UnitIdentity) -> Result<(), CryptoError> {
    verify_threshold(
        &rs.hash()?,
        &rs.signature,
        &identity.public_keys,
        identity.threshold as usize,
    )
}

/// Refuses to sign a read-state unless the local ledger yields the same hash.
pub struct ReadStateVerifier {
    ledger: Arc<dyn Ledger>,
}

impl ReadStateVerifier {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self { ledger }
    }

    fn expected_hash(&self, request: &SigningRequest) -> Option<Vec<u8>> {
        let query: ReadStateQuery = from_bytes_canonical(&request.context).ok()?;
        let rs = match build_read_state(self.ledger.as_ref(), &query) {
            Ok(rs) => rs,
            Err(e) => {
                debug!(target: "state_proof", error = %e, "local read failed");
                return None;
            }
        };
        rs.hash().ok().map(|h| h.to_vec())
    }
}

impl SignVerifier for ReadStateVerifier {
    fn verify(&self, request: &SigningRequest) -> bool {
        if request.purpose != SigningPurpose::ReadState {
            return false;
        }
        let Some(expected) = self.expected_hash(request) else {
            return false;
        };
        let [only] = request.messages.as_slice() else {
            return false;
        };
        let agrees = only.message == expected;
        if !agrees {
            warn!(target: "state_proof", "read-state differs from local ledger, refusing");
        }
        agrees
    }
}

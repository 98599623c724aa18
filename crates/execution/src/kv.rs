// Path: crates/execution/src/kv.rs
//! Extraction of verified KeyValue inputs into per-input dictionaries.

use cohort_state::read_state::{decode_storage, select_keys};
use cohort_types::config::KeyValueMode;
use cohort_types::error::VerificationError;
use cohort_types::ledger::{ReadState, StateProof};
use cohort_types::plan::{DataDependency, ExecutionRequest, KvDict, VerificationData};
use std::collections::BTreeMap;

fn missing(input: &str, detail: String) -> VerificationError {
    VerificationError::MissingDependency {
        input: input.into(),
        detail,
    }
}

/// The KeyValue inputs of the addressed opcode with their declared keys.
fn key_value_inputs(
    request: &ExecutionRequest,
) -> Result<impl Iterator<Item = (&String, &Vec<String>)>, VerificationError> {
    Ok(request
        .opcode()?
        .dependencies
        .iter()
        .filter_map(|(input, dep)| match dep {
            DataDependency::KeyValue { keys } => Some((input, keys)),
            _ => None,
        }))
}

/// Reads every KeyValue input's declared keys out of the contract storage
/// its state proof carries. The proofs must already have been verified.
pub fn prepare_kv_dicts(
    request: &ExecutionRequest,
    proofs: &BTreeMap<String, StateProof>,
) -> Result<BTreeMap<String, KvDict>, VerificationError> {
    let mut dicts = BTreeMap::new();
    for (input, keys) in key_value_inputs(request)? {
        let proof = proofs
            .get(input)
            .ok_or_else(|| missing(input, "no state proof".into()))?;
        if proof.inclusion.key != request.plan.cid {
            return Err(missing(input, "state proof is not for this contract".into()));
        }
        let storage = decode_storage(&proof.inclusion.value)
            .map_err(|e| missing(input, format!("contract storage: {e}")))?;
        let data = select_keys(&storage, keys)
            .map_err(|e| missing(input, e.to_string()))?
            .into_iter()
            .map(|kv| (kv.key, kv.value))
            .collect();
        dicts.insert(input.clone(), KvDict { data });
    }
    Ok(dicts)
}

/// The read-state variant of `prepare_kv_dicts`.
pub fn prepare_kv_dicts_from_read_states(
    request: &ExecutionRequest,
    read_states: &BTreeMap<String, ReadState>,
) -> Result<BTreeMap<String, KvDict>, VerificationError> {
    let mut dicts = BTreeMap::new();
    for (input, keys) in key_value_inputs(request)? {
        let rs = read_states
            .get(input)
            .ok_or_else(|| missing(input, "no read-state".into()))?;
        let mut data = BTreeMap::new();
        for key in keys {
            let value = rs
                .get(key)
                .ok_or_else(|| missing(input, format!("read-state lacks key {key}")))?;
            data.insert(key.clone(), value.to_vec());
        }
        dicts.insert(input.clone(), KvDict { data });
    }
    Ok(dicts)
}

/// Dispatches on how KeyValue inputs were authenticated.
pub fn prepare_kv_dicts_for(
    mode: KeyValueMode,
    request: &ExecutionRequest,
    data: &VerificationData,
) -> Result<BTreeMap<String, KvDict>, VerificationError> {
    match mode {
        KeyValueMode::StateProof => prepare_kv_dicts(request, &data.state_proofs),
        KeyValueMode::ReadState => prepare_kv_dicts_from_read_states(request, &data.read_states),
    }
}

// Path: crates/execution/src/verifier/mod.rs
//! Dependency verification.
//!
//! A unit accepts a request only after it has checked, in order, that the
//! request addresses the opcode this unit is about to run, that the
//! coordinating unit signed the plan, and that every declared input is backed
//! by its evidence. The first failing check ends verification.

use cohort_crypto::sign::threshold::verify_threshold;
use cohort_state::proof::verify_state_proof;
use cohort_state::read_state::verify_read_state;
use cohort_types::config::{KeyValueMode, VerifierConfig};
use cohort_types::digest::sha256;
use cohort_types::error::{ProofError, VerificationError};
use cohort_types::plan::{
    ConstValue, DataDependency, ExecutionPlan, ExecutionRequest, Opcode, UnitIdentity,
    VerificationData,
};
use cohort_types::Digest;

/// The subject named when the plan signature fails.
pub const PLAN_SUBJECT: &str = "execution plan";

/// Runs the dependency checks for one unit.
#[derive(Debug, Clone, Default)]
pub struct DependencyVerifier {
    config: VerifierConfig,
}

impl DependencyVerifier {
    pub fn new(config: VerifierConfig) -> Self {
        Self { config }
    }

    /// Verifies `request` for the node described by `data`.
    pub fn verify(
        &self,
        request: &ExecutionRequest,
        data: &VerificationData,
    ) -> Result<(), VerificationError> {
        let opcode = check_identity(request, data)?;
        let plan_id = self.check_plan_signature(request)?;

        for (input, dep) in &opcode.dependencies {
            let outcome = match dep {
                DataDependency::Opcode { src_name, idx } => {
                    check_opcode_input(request, data, &plan_id, input, src_name, *idx)
                }
                DataDependency::KeyValue { .. } => {
                    self.check_key_value_input(request, data, input)
                }
                DataDependency::Precommit { keys } => check_precommit_input(data, input, keys),
                DataDependency::Const { value } => check_const_input(data, input, value),
            };
            if let Err(e) = outcome {
                tracing::debug!(
                    target: "verifier",
                    index = request.index,
                    input = %input,
                    source = dep.src_tag(),
                    error = %e,
                    "dependency rejected"
                );
                return Err(e);
            }
        }

        tracing::debug!(
            target: "verifier",
            index = request.index,
            opcode = %opcode.name,
            inputs = opcode.dependencies.len(),
            "request verified"
        );
        Ok(())
    }

    fn check_plan_signature(&self, request: &ExecutionRequest) -> Result<Digest, VerificationError> {
        let plan_id = plan_hash(&request.plan)?;
        let coordinator = unit(&request.plan, &self.config.coordinator_unit_id, PLAN_SUBJECT)?;
        verify_threshold(
            &plan_id,
            &request.plan_signature,
            &coordinator.public_keys,
            coordinator.threshold as usize,
        )
        .map_err(|e| VerificationError::SignatureInvalid {
            subject: PLAN_SUBJECT.into(),
            reason: e.to_string(),
        })?;
        Ok(plan_id)
    }

    fn check_key_value_input(
        &self,
        request: &ExecutionRequest,
        data: &VerificationData,
        input: &str,
    ) -> Result<(), VerificationError> {
        let plan = &request.plan;
        let state_unit = unit(plan, &self.config.state_unit_id, input)?;
        match self.config.key_value_mode {
            KeyValueMode::StateProof => {
                let proof = data
                    .state_proofs
                    .get(input)
                    .ok_or_else(|| missing(input, "no state proof"))?;
                check_root(input, &plan.state_root, proof.root())?;
                if proof.inclusion.key != plan.cid {
                    return Err(VerificationError::IdentityMismatch {
                        field: "cid",
                        expected: hex::encode(&plan.cid),
                        got: hex::encode(&proof.inclusion.key),
                    });
                }
                verify_state_proof(proof, state_unit).map_err(|source| {
                    VerificationError::ProofInvalid {
                        input: input.into(),
                        source,
                    }
                })
            }
            KeyValueMode::ReadState => {
                let rs = data
                    .read_states
                    .get(input)
                    .ok_or_else(|| missing(input, "no read-state"))?;
                check_root(input, &plan.state_root, &rs.root)?;
                verify_read_state(rs, state_unit).map_err(|e| {
                    VerificationError::SignatureInvalid {
                        subject: input.into(),
                        reason: e.to_string(),
                    }
                })
            }
        }
    }
}

fn plan_hash(plan: &ExecutionPlan) -> Result<Digest, VerificationError> {
    plan.hash()
        .map_err(|e| VerificationError::MalformedRequest(format!("plan hash: {e}")))
}

fn missing(input: &str, detail: &str) -> VerificationError {
    VerificationError::MissingDependency {
        input: input.into(),
        detail: detail.into(),
    }
}

/// Looks up `unit_id` in the plan's trust directory.
fn unit<'a>(
    plan: &'a ExecutionPlan,
    unit_id: &str,
    subject: &str,
) -> Result<&'a UnitIdentity, VerificationError> {
    plan.unit_data
        .get(unit_id)
        .ok_or_else(|| VerificationError::SignatureInvalid {
            subject: subject.into(),
            reason: format!("unit {unit_id} is not in the plan"),
        })
}

fn check_identity<'a>(
    request: &'a ExecutionRequest,
    data: &VerificationData,
) -> Result<&'a Opcode, VerificationError> {
    let opcode = request.opcode()?;
    if opcode.unit_id != data.unit_id {
        return Err(VerificationError::IdentityMismatch {
            field: "unit",
            expected: opcode.unit_id.clone(),
            got: data.unit_id.clone(),
        });
    }
    if opcode.name != data.opcode_name {
        return Err(VerificationError::IdentityMismatch {
            field: "opcode",
            expected: opcode.name.clone(),
            got: data.opcode_name.clone(),
        });
    }
    Ok(opcode)
}

fn check_root(input: &str, expected: &[u8], got: &[u8]) -> Result<(), VerificationError> {
    if expected == got {
        return Ok(());
    }
    Err(VerificationError::ProofInvalid {
        input: input.into(),
        source: ProofError::RootMismatch {
            expected: hex::encode(expected),
            got: hex::encode(got),
        },
    })
}

fn check_opcode_input(
    request: &ExecutionRequest,
    data: &VerificationData,
    plan_id: &Digest,
    input: &str,
    src_name: &str,
    idx: u32,
) -> Result<(), VerificationError> {
    let receipt = request
        .op_receipts
        .get(input)
        .ok_or_else(|| missing(input, &format!("no receipt for output {src_name}")))?;
    if receipt.name != src_name {
        return Err(VerificationError::IdentityMismatch {
            field: "src_name",
            expected: src_name.into(),
            got: receipt.name.clone(),
        });
    }
    if receipt.op_index != idx {
        return Err(VerificationError::IdentityMismatch {
            field: "op_index",
            expected: idx.to_string(),
            got: receipt.op_index.to_string(),
        });
    }
    if &receipt.plan_id != plan_id {
        return Err(VerificationError::IdentityMismatch {
            field: "plan_id",
            expected: hex::encode(plan_id),
            got: hex::encode(receipt.plan_id),
        });
    }
    let input_hash = data
        .input_hashes
        .get(input)
        .ok_or_else(|| missing(input, "no input data"))?;
    if input_hash != &receipt.digest {
        return Err(VerificationError::HashMismatch {
            input: input.into(),
        });
    }

    let producer = request
        .plan
        .txn
        .opcodes
        .get(idx as usize)
        .ok_or_else(|| VerificationError::IdentityMismatch {
            field: "op_index",
            expected: format!("< {}", request.plan.txn.opcodes.len()),
            got: idx.to_string(),
        })?;
    let producer_unit = unit(&request.plan, &producer.unit_id, input)?;
    let receipt_hash = receipt
        .hash()
        .map_err(|e| VerificationError::MalformedRequest(format!("receipt hash: {e}")))?;
    verify_threshold(
        &receipt_hash,
        &receipt.signature,
        &producer_unit.public_keys,
        producer_unit.threshold as usize,
    )
    .map_err(|e| VerificationError::SignatureInvalid {
        subject: input.into(),
        reason: e.to_string(),
    })
}

/// Presence only: no commitment to the precommitted values is checked.
fn check_precommit_input(
    data: &VerificationData,
    input: &str,
    keys: &[String],
) -> Result<(), VerificationError> {
    let precommits = data
        .precommits
        .as_ref()
        .ok_or_else(|| missing(input, "no precommits supplied"))?;
    match keys.iter().find(|k| !precommits.data.contains_key(*k)) {
        Some(key) => Err(missing(input, &format!("precommit key {key} absent"))),
        None => Ok(()),
    }
}

fn check_const_input(
    data: &VerificationData,
    input: &str,
    value: &ConstValue,
) -> Result<(), VerificationError> {
    let input_hash = data
        .input_hashes
        .get(input)
        .ok_or_else(|| missing(input, "no input data"))?;
    let expected = sha256(value.canonical_bytes())
        .map_err(|e| VerificationError::MalformedRequest(e.to_string()))?;
    if input_hash.as_slice() != expected.as_slice() {
        return Err(VerificationError::HashMismatch {
            input: input.into(),
        });
    }
    Ok(())
}

// Path: crates/threshold/src/attest.rs
//! The attestations units produce with a signing round: opcode receipts,
//! co-signed execution plans and read-state snapshots.

use crate::node::Node;
use cohort_api::ledger::Ledger;
use cohort_state::read_state::build_read_state;
use cohort_types::codec::to_bytes_canonical;
use cohort_types::digest::sha256;
use cohort_types::error::ProtocolError;
use cohort_types::ledger::{ReadState, ReadStateQuery};
use cohort_types::plan::{ExecutionPlan, ExecutionRequest, OpcodeReceipt};
use cohort_types::signing::{NamedMessage, SigningOutcome, SigningPurpose, SigningRequest};
use std::collections::BTreeMap;
use std::sync::Arc;

const PLAN_MESSAGE: &str = "plan";
const READ_STATE_MESSAGE: &str = "read_state";

fn artifact(outcome: &SigningOutcome, name: &str) -> Result<Vec<u8>, ProtocolError> {
    outcome
        .signature(name)
        .map(<[u8]>::to_vec)
        .ok_or_else(|| ProtocolError::InvalidRequest(format!("no signature for {name}")))
}

/// Issues the receipts of an executed opcode.
pub struct ReceiptIssuer {
    node: Arc<Node>,
}

impl ReceiptIssuer {
    pub fn new(node: Arc<Node>) -> Self {
        Self { node }
    }

    /// Builds one receipt per named output of the opcode `request` addresses
    /// and signs them all in a single round. Receipts are keyed by output name.
    ///
    /// The signing context is the SCALE-encoded request so participants can
    /// re-derive what they are asked to attest.
    pub async fn issue(
        &self,
        request: &ExecutionRequest,
        outputs: &BTreeMap<String, Vec<u8>>,
    ) -> Result<BTreeMap<String, OpcodeReceipt>, ProtocolError> {
        let opcode = request
            .opcode()
            .map_err(|e| ProtocolError::InvalidRequest(e.to_string()))?;
        let plan_id = request.plan.hash()?;

        let mut receipts = BTreeMap::new();
        let mut messages = Vec::with_capacity(outputs.len());
        for (name, value) in outputs {
            let receipt = OpcodeReceipt {
                plan_id,
                op_index: request.index,
                op_name: opcode.name.clone(),
                name: name.clone(),
                digest: sha256(value)?.to_vec(),
                signature: Vec::new(),
            };
            messages.push(NamedMessage {
                name: name.clone(),
                message: receipt.hash()?.to_vec(),
            });
            receipts.insert(name.clone(), receipt);
        }

        let outcome = self
            .node
            .sign(SigningRequest {
                purpose: SigningPurpose::Receipt,
                messages,
                context: to_bytes_canonical(request),
            })
            .await?;
        for (name, receipt) in receipts.iter_mut() {
            receipt.signature = artifact(&outcome, name)?;
        }
        Ok(receipts)
    }
}

/// Co-signs `hash(plan)`; the artifact is the request's `plan_signature`.
pub async fn sign_plan(node: &Arc<Node>, plan: &ExecutionPlan) -> Result<Vec<u8>, ProtocolError> {
    let mut request =
        SigningRequest::single(SigningPurpose::Plan, PLAN_MESSAGE, plan.hash()?.to_vec());
    request.context = to_bytes_canonical(plan);
    let outcome = node.sign(request).await?;
    artifact(&outcome, PLAN_MESSAGE)
}

/// Reads `query` from the local ledger and has the unit sign it.
///
/// Participants with a `ReadStateVerifier` installed repeat the read and
/// refuse on any difference.
pub async fn sign_read_state(
    node: &Arc<Node>,
    ledger: &dyn Ledger,
    query: &ReadStateQuery,
) -> Result<ReadState, ProtocolError> {
    let mut rs = build_read_state(ledger, query)?;
    let mut request = SigningRequest::single(
        SigningPurpose::ReadState,
        READ_STATE_MESSAGE,
        rs.hash()?.to_vec(),
    );
    request.context = to_bytes_canonical(query);
    let outcome = node.sign(request).await?;
    rs.signature = artifact(&outcome, READ_STATE_MESSAGE)?;
    Ok(rs)
}

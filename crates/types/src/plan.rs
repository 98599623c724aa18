// Path: crates/types/src/plan.rs
//! Contracts, workflows and the execution plan that binds one run of a
//! transaction to the functional units trusted for it.

use crate::error::VerificationError;
use crate::ledger::{ReadState, StateProof};
use crate::Digest;
use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tag written into the plan hash for a `Const` dependency.
pub const SRC_CONST: &str = "CONST";
/// Tag written into the plan hash for a `KeyValue` dependency.
pub const SRC_KEYVALUE: &str = "KEYVALUE";
/// Tag written into the plan hash for an `Opcode` dependency.
pub const SRC_OPCODE: &str = "OPCODE";
/// Tag written into the plan hash for a `Precommit` dependency.
pub const SRC_PRECOMMIT: &str = "PRECOMMIT";

/// A literal input value declared in the contract.
#[derive(Encode, Decode, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum ConstValue {
    /// An unsigned integer, hashed as 8 little-endian bytes.
    Int(u64),
    /// A string, hashed as its UTF-8 bytes.
    Text(String),
}

impl ConstValue {
    /// The bytes that represent this value inside every digest.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        match self {
            ConstValue::Int(v) => v.to_le_bytes().to_vec(),
            ConstValue::Text(s) => s.as_bytes().to_vec(),
        }
    }
}

/// Where an opcode input comes from.
#[derive(Encode, Decode, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "src", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataDependency {
    /// A literal baked into the contract.
    Const {
        /// The literal value.
        value: ConstValue,
    },
    /// Keys read from ledger-backed contract state.
    #[serde(rename = "KEYVALUE")]
    KeyValue {
        /// The state keys read.
        keys: Vec<String>,
    },
    /// An output of an earlier opcode in the same transaction.
    Opcode {
        /// Name of the producing opcode's output variable.
        src_name: String,
        /// Index of the producing opcode in the transaction.
        idx: u32,
    },
    /// Values committed before the workflow started.
    Precommit {
        /// The precommitted key names.
        keys: Vec<String>,
    },
}

impl DataDependency {
    /// Builds a `KeyValue` dependency from a comma-separated key list.
    pub fn key_value(keys: &str) -> Self {
        DataDependency::KeyValue {
            keys: split_key_list(keys),
        }
    }

    /// Builds a `Precommit` dependency from a comma-separated key list.
    pub fn precommit(keys: &str) -> Self {
        DataDependency::Precommit {
            keys: split_key_list(keys),
        }
    }

    /// The source tag fed into the plan hash.
    pub fn src_tag(&self) -> &'static str {
        match self {
            DataDependency::Const { .. } => SRC_CONST,
            DataDependency::KeyValue { .. } => SRC_KEYVALUE,
            DataDependency::Opcode { .. } => SRC_OPCODE,
            DataDependency::Precommit { .. } => SRC_PRECOMMIT,
        }
    }

    /// The producing output name, empty for non-opcode sources.
    pub fn src_name(&self) -> &str {
        match self {
            DataDependency::Opcode { src_name, .. } => src_name,
            _ => "",
        }
    }

    /// The producing opcode index, zero for non-opcode sources.
    pub fn src_index(&self) -> u32 {
        match self {
            DataDependency::Opcode { idx, .. } => *idx,
            _ => 0,
        }
    }

    /// The value bytes fed into the plan hash. Key lists are re-joined with commas.
    pub fn value_bytes(&self) -> Vec<u8> {
        match self {
            DataDependency::Const { value } => value.canonical_bytes(),
            DataDependency::KeyValue { keys } | DataDependency::Precommit { keys } => {
                keys.join(",").into_bytes()
            }
            DataDependency::Opcode { .. } => Vec::new(),
        }
    }
}

/// Splits a comma-separated key list, dropping surrounding whitespace and empty entries.
pub fn split_key_list(keys: &str) -> Vec<String> {
    keys.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

/// One step of a transaction, executed by a single functional unit.
#[derive(Encode, Decode, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Opcode {
    /// Opcode name.
    pub name: String,
    /// Id of the unit that executes it.
    #[serde(rename = "dfu_id")]
    pub unit_id: String,
    /// Declared inputs, keyed by input variable name.
    #[serde(rename = "deps", default)]
    pub dependencies: BTreeMap<String, DataDependency>,
}

/// An ordered list of opcodes.
#[derive(Encode, Decode, Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Transaction {
    /// Opcodes in execution order.
    pub opcodes: Vec<Opcode>,
}

/// Named transactions plus the keys a workflow precommits.
#[derive(Encode, Decode, Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Workflow {
    /// Transactions by name.
    pub txns: BTreeMap<String, Transaction>,
    /// Precommitted key names.
    #[serde(default)]
    pub precommits: Vec<String>,
}

/// A contract: named workflows and the units they may involve.
#[derive(Encode, Decode, Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Contract {
    /// Workflows by name.
    pub workflows: BTreeMap<String, Workflow>,
    /// Ids of every unit the contract relies on.
    #[serde(rename = "dfus", default)]
    pub units: Vec<String>,
}

/// A Byzantine quorum definition: at least `threshold` of `public_keys` must sign.
///
/// Mask bit `i` of a threshold signature refers to `public_keys[i]`, so the
/// order of the list is part of the identity.
#[derive(Encode, Decode, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UnitIdentity {
    /// Minimum number of distinct signers.
    pub threshold: u32,
    /// Compressed BLS public keys, in roster order.
    pub public_keys: Vec<Vec<u8>>,
}

impl UnitIdentity {
    /// Builds an identity, rejecting a zero threshold or one above the key count.
    pub fn new(threshold: u32, public_keys: Vec<Vec<u8>>) -> Result<Self, VerificationError> {
        let id = Self {
            threshold,
            public_keys,
        };
        id.check()?;
        Ok(id)
    }

    /// Checks `0 < threshold <= len(public_keys)`.
    pub fn check(&self) -> Result<(), VerificationError> {
        if self.threshold == 0 || self.threshold as usize > self.public_keys.len() {
            return Err(VerificationError::MalformedRequest(format!(
                "threshold {} invalid for {} keys",
                self.threshold,
                self.public_keys.len()
            )));
        }
        Ok(())
    }
}

/// Registry entry describing a deployed unit.
#[derive(Encode, Decode, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UnitInfo {
    /// Number of nodes in the unit.
    pub num_nodes: u32,
    /// Signing threshold.
    pub threshold: u32,
    /// Opcodes the unit can execute.
    pub opcodes: Vec<String>,
    /// Compressed BLS public keys of its nodes.
    #[serde(default)]
    pub public_keys: Vec<Vec<u8>>,
}

/// The directory of deployed units.
#[derive(Encode, Decode, Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct UnitRegistry {
    /// Units by id.
    #[serde(rename = "registry")]
    pub units: BTreeMap<String, UnitInfo>,
}

/// The signed description of one transaction run.
#[derive(Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
    /// Contract instance id.
    pub cid: Vec<u8>,
    /// Ledger state root every KeyValue read must anchor to.
    pub state_root: Vec<u8>,
    /// Hash of the contract code.
    pub code_hash: Vec<u8>,
    /// Workflow being run.
    pub workflow_name: String,
    /// Transaction being run.
    pub txn_name: String,
    /// The transaction's opcodes.
    pub txn: Transaction,
    /// Trust directory for this run, keyed by unit id.
    pub unit_data: BTreeMap<String, UnitIdentity>,
}

impl ExecutionPlan {
    /// Instantiates a plan for `workflow_name`/`txn_name` of `contract`.
    ///
    /// The trust directory holds every unit listed by the contract plus every
    /// unit an opcode of the transaction names, each resolved in `registry`.
    pub fn from_workflow(
        contract: &Contract,
        registry: &UnitRegistry,
        cid: Vec<u8>,
        state_root: Vec<u8>,
        code_hash: Vec<u8>,
        workflow_name: &str,
        txn_name: &str,
    ) -> Result<Self, VerificationError> {
        let workflow = contract.workflows.get(workflow_name).ok_or_else(|| {
            VerificationError::MalformedRequest(format!("unknown workflow {workflow_name}"))
        })?;
        let txn = workflow.txns.get(txn_name).ok_or_else(|| {
            VerificationError::MalformedRequest(format!("unknown transaction {txn_name}"))
        })?;

        let mut unit_data = BTreeMap::new();
        let referenced = contract
            .units
            .iter()
            .chain(txn.opcodes.iter().map(|op| &op.unit_id));
        for unit_id in referenced {
            if unit_data.contains_key(unit_id) {
                continue;
            }
            let info = registry.units.get(unit_id).ok_or_else(|| {
                VerificationError::MalformedRequest(format!("unit {unit_id} is not registered"))
            })?;
            let identity = UnitIdentity::new(info.threshold, info.public_keys.clone())?;
            unit_data.insert(unit_id.clone(), identity);
        }

        Ok(Self {
            cid,
            state_root,
            code_hash,
            workflow_name: workflow_name.to_string(),
            txn_name: txn_name.to_string(),
            txn: txn.clone(),
            unit_data,
        })
    }
}

/// A quorum-signed attestation of one opcode output.
#[derive(Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct OpcodeReceipt {
    /// Hash of the execution plan the opcode ran under.
    pub plan_id: Digest,
    /// Index of the producing opcode.
    pub op_index: u32,
    /// Name of the producing opcode.
    pub op_name: String,
    /// Name of the output variable.
    pub name: String,
    /// `H(output)`.
    pub digest: Vec<u8>,
    /// Threshold signature over the receipt hash: `sig || mask`.
    pub signature: Vec<u8>,
}

/// A request to execute one opcode of a plan.
#[derive(Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    /// Index of the opcode to run.
    pub index: u32,
    /// The plan.
    pub plan: ExecutionPlan,
    /// The coordinating unit's threshold signature over the plan hash.
    pub plan_signature: Vec<u8>,
    /// Receipts for opcode inputs, keyed by input name.
    pub op_receipts: BTreeMap<String, OpcodeReceipt>,
}

impl ExecutionRequest {
    /// The opcode this request addresses.
    pub fn opcode(&self) -> Result<&Opcode, VerificationError> {
        self.plan
            .txn
            .opcodes
            .get(self.index as usize)
            .ok_or_else(|| VerificationError::IdentityMismatch {
                field: "index",
                expected: format!("< {}", self.plan.txn.opcodes.len()),
                got: self.index.to_string(),
            })
    }
}

/// A precommitted key/value dictionary.
#[derive(Encode, Decode, Debug, Clone, PartialEq, Eq, Default)]
pub struct KvDict {
    /// Values by key.
    pub data: BTreeMap<String, Vec<u8>>,
}

/// What the executing node supplies alongside a request.
#[derive(Encode, Decode, Debug, Clone, PartialEq, Eq, Default)]
pub struct VerificationData {
    /// The unit id the executing node belongs to.
    pub unit_id: String,
    /// The opcode the node is about to run.
    pub opcode_name: String,
    /// Digest of each received input value, keyed by input name.
    pub input_hashes: BTreeMap<String, Vec<u8>>,
    /// Ledger proofs for KeyValue inputs.
    pub state_proofs: BTreeMap<String, StateProof>,
    /// Signed read-states for KeyValue inputs.
    pub read_states: BTreeMap<String, ReadState>,
    /// Precommitted values, if the workflow has any.
    pub precommits: Option<KvDict>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_lists_split_on_commas() {
        let dep = DataDependency::precommit("a, b,,c");
        assert_eq!(
            dep,
            DataDependency::Precommit {
                keys: vec!["a".into(), "b".into(), "c".into()]
            }
        );
        assert_eq!(dep.value_bytes(), b"a,b,c".to_vec());
    }

    #[test]
    fn test_contract_json_uses_source_tags() {
        let json = r#"{
            "workflows": {
                "lottery": {
                    "txns": {
                        "close": {
                            "opcodes": [
                                { "name": "read", "dfu_id": "state",
                                  "deps": { "tickets": { "src": "KEYVALUE", "keys": ["tickets"] } } },
                                { "name": "pick", "dfu_id": "easyrand",
                                  "deps": {
                                      "round": { "src": "CONST", "value": 3 },
                                      "tickets": { "src": "OPCODE", "src_name": "tickets", "idx": 0 }
                                  } }
                            ]
                        }
                    },
                    "precommits": ["seed"]
                }
            },
            "dfus": ["ceu", "state", "easyrand"]
        }"#;
        let contract: Contract = serde_json::from_str(json).unwrap();
        let txn = &contract.workflows["lottery"].txns["close"];
        assert_eq!(txn.opcodes.len(), 2);
        assert_eq!(
            txn.opcodes[1].dependencies["round"],
            DataDependency::Const {
                value: ConstValue::Int(3)
            }
        );
        assert_eq!(txn.opcodes[1].dependencies["tickets"].src_index(), 0);
    }

    #[test]
    fn test_plan_from_workflow_collects_units() {
        let mut contract = Contract::default();
        let mut wf = Workflow::default();
        wf.txns.insert(
            "t".into(),
            Transaction {
                opcodes: vec![Opcode {
                    name: "op".into(),
                    unit_id: "worker".into(),
                    dependencies: BTreeMap::new(),
                }],
            },
        );
        contract.workflows.insert("wf".into(), wf);
        contract.units = vec!["ceu".into()];

        let mut registry = UnitRegistry::default();
        for id in ["ceu", "worker"] {
            registry.units.insert(
                id.into(),
                UnitInfo {
                    num_nodes: 1,
                    threshold: 1,
                    opcodes: vec![],
                    public_keys: vec![vec![1u8; 96]],
                },
            );
        }

        let plan =
            ExecutionPlan::from_workflow(&contract, &registry, vec![1], vec![2], vec![3], "wf", "t")
                .unwrap();
        assert_eq!(
            plan.unit_data.keys().cloned().collect::<Vec<_>>(),
            vec!["ceu".to_string(), "worker".to_string()]
        );

        registry.units.remove("worker");
        assert!(
            ExecutionPlan::from_workflow(&contract, &registry, vec![], vec![], vec![], "wf", "t")
                .is_err()
        );
    }

    #[test]
    fn test_unit_identity_threshold_bounds() {
        assert!(UnitIdentity::new(0, vec![vec![0]]).is_err());
        assert!(UnitIdentity::new(2, vec![vec![0]]).is_err());
        assert!(UnitIdentity::new(1, vec![vec![0]]).is_ok());
    }
}

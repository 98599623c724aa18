// Path: crates/threshold/tests/attest.rs
mod common;

use anyhow::Result;
use cohort_api::ledger::Ledger;
use cohort_execution::DependencyVerifier;
use cohort_state::memory::MemoryLedger;
use cohort_state::proof::fetch_state_proof;
use cohort_state::read_state::{encode_storage, verify_read_state, ReadStateVerifier};
use cohort_threshold::{sign_plan, sign_read_state, ReceiptIssuer};
use cohort_types::config::{KeyValueMode, VerifierConfig};
use cohort_types::digest::sha256;
use cohort_types::error::{ProtocolError, VerificationError};
use cohort_types::ledger::ReadStateQuery;
use cohort_types::plan::{
    DataDependency, ExecutionPlan, ExecutionRequest, Opcode, Transaction, VerificationData,
};
use cohort_types::signing::SigningPurpose;
use common::{identity, unit_keys, Cluster, ClusterBuilder};
use std::collections::BTreeMap;
use std::sync::Arc;

const CID: &[u8] = b"lottery-1";

fn ledgers(state: &Cluster) -> Result<Vec<Arc<MemoryLedger>>> {
    let mut storage = BTreeMap::new();
    storage.insert("tickets".to_string(), b"alice,bob".to_vec());
    storage.insert("pot".to_string(), 100u64.to_le_bytes().to_vec());
    let mut genesis = BTreeMap::new();
    genesis.insert(CID.to_vec(), encode_storage(&storage));

    state
        .nodes
        .iter()
        .map(|_| -> Result<Arc<MemoryLedger>> {
            Ok(Arc::new(MemoryLedger::new(state.keys.clone(), 3, genesis.clone())?))
        })
        .collect()
}

fn install_read_state_verifiers(state: &Cluster, ledgers: &[Arc<MemoryLedger>]) {
    for (node, ledger) in state.nodes.iter().zip(ledgers) {
        let ledger: Arc<dyn Ledger> = ledger.clone();
        node.register_verifier(
            SigningPurpose::ReadState,
            Arc::new(ReadStateVerifier::new(ledger)),
        );
    }
}

fn plan(ceu: &Cluster, state: &Cluster, producer: &Cluster, state_root: Vec<u8>) -> ExecutionPlan {
    let opcodes = vec![
        Opcode {
            name: "pick".into(),
            unit_id: "easyrand".into(),
            dependencies: BTreeMap::new(),
        },
        Opcode {
            name: "close".into(),
            unit_id: "lottery".into(),
            dependencies: [
                (
                    "winner".to_string(),
                    DataDependency::Opcode {
                        src_name: "winner".into(),
                        idx: 0,
                    },
                ),
                ("tickets".to_string(), DataDependency::key_value("tickets,pot")),
            ]
            .into_iter()
            .collect(),
        },
    ];
    let mut unit_data = BTreeMap::new();
    unit_data.insert("ceu".to_string(), ceu.roster.clone());
    unit_data.insert("state".to_string(), state.roster.clone());
    unit_data.insert("easyrand".to_string(), producer.roster.clone());
    unit_data.insert("lottery".to_string(), identity(&unit_keys(33, 3), 2));
    ExecutionPlan {
        cid: CID.to_vec(),
        state_root,
        code_hash: vec![0xc0; 32],
        workflow_name: "lottery".into(),
        txn_name: "close".into(),
        txn: Transaction { opcodes },
        unit_data,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn unit_signed_evidence_passes_dependency_checks() -> Result<()> {
    let ceu = ClusterBuilder::new(4, 3).tag(30).build();
    let producer = ClusterBuilder::new(4, 3).tag(31).build();
    let state = ClusterBuilder::new(4, 3).tag(32).build();
    let ledgers = ledgers(&state)?;
    install_read_state_verifiers(&state, &ledgers);

    let root = ledgers[0].latest_block()?.state_root.to_vec();
    let plan = plan(&ceu, &state, &producer, root);
    let plan_signature = sign_plan(ceu.node(0), &plan).await?;

    // the producer runs opcode 0 and issues a receipt for its output
    let produce = ExecutionRequest {
        index: 0,
        plan: plan.clone(),
        plan_signature: plan_signature.clone(),
        op_receipts: BTreeMap::new(),
    };
    let mut outputs = BTreeMap::new();
    outputs.insert("winner".to_string(), b"bob".to_vec());
    let receipts = ReceiptIssuer::new(Arc::clone(producer.node(1)))
        .issue(&produce, &outputs)
        .await?;
    assert_eq!(receipts["winner"].op_name, "pick");

    let query = ReadStateQuery {
        cid: CID.to_vec(),
        keys: vec!["tickets".into(), "pot".into()],
    };
    let rs = sign_read_state(state.node(0), ledgers[0].as_ref(), &query).await?;
    verify_read_state(&rs, &state.roster)?;
    assert_eq!(rs.get("tickets"), Some(&b"alice,bob"[..]));

    let consume = ExecutionRequest {
        index: 1,
        plan,
        plan_signature,
        op_receipts: receipts,
    };
    let mut data = VerificationData {
        unit_id: "lottery".into(),
        opcode_name: "close".into(),
        ..Default::default()
    };
    data.input_hashes
        .insert("winner".into(), sha256(b"bob")?.to_vec());
    data.read_states.insert("tickets".into(), rs);
    data.state_proofs
        .insert("tickets".into(), fetch_state_proof(ledgers[0].as_ref(), CID)?);

    DependencyVerifier::default().verify(&consume, &data)?;
    let read_state_mode = DependencyVerifier::new(VerifierConfig {
        key_value_mode: KeyValueMode::ReadState,
        ..VerifierConfig::default()
    });
    read_state_mode.verify(&consume, &data)?;

    data.input_hashes
        .insert("winner".into(), sha256(b"alice")?.to_vec());
    assert_eq!(
        read_state_mode.verify(&consume, &data),
        Err(VerificationError::HashMismatch {
            input: "winner".into()
        })
    );

    for cluster in [ceu, producer, state] {
        cluster.shutdown().await;
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn diverged_ledgers_refuse_to_sign_a_read_state() -> Result<()> {
    let state = ClusterBuilder::new(4, 3).tag(34).build();
    let ledgers = ledgers(&state)?;
    install_read_state_verifiers(&state, &ledgers);
    let query = ReadStateQuery {
        cid: CID.to_vec(),
        keys: vec!["pot".into()],
    };

    // a lagging coordinator is outvoted by nodes that moved on
    for ledger in &ledgers[1..] {
        ledger.commit([(b"noise".to_vec(), vec![1])])?;
    }
    let err = sign_read_state(state.node(0), ledgers[0].as_ref(), &query)
        .await
        .unwrap_err();
    assert!(
        matches!(err, ProtocolError::InsufficientQuorum { .. }),
        "unexpected error: {err}"
    );

    // once it catches up the unit agrees again
    ledgers[0].commit([(b"noise".to_vec(), vec![1])])?;
    let rs = sign_read_state(state.node(0), ledgers[0].as_ref(), &query).await?;
    assert_eq!(rs.root, ledgers[3].latest_block()?.state_root.to_vec());
    verify_read_state(&rs, &state.roster)?;

    state.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn reading_an_absent_key_fails_before_signing() -> Result<()> {
    let state = ClusterBuilder::new(4, 3).tag(35).build();
    let ledgers = ledgers(&state)?;
    let query = ReadStateQuery {
        cid: CID.to_vec(),
        keys: vec!["jackpot".into()],
    };
    assert!(matches!(
        sign_read_state(state.node(0), ledgers[0].as_ref(), &query).await,
        Err(ProtocolError::Storage(_))
    ));
    state.shutdown().await;
    Ok(())
}

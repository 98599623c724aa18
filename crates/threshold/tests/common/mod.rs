// Path: crates/threshold/tests/common/mod.rs
#![allow(dead_code)]

use cohort_api::crypto::{SerializableKey, SigningKeyPair};
use cohort_api::storage::DkgStore;
use cohort_api::transport::{Envelope, TreeTransport};
use cohort_crypto::sign::bls::BlsKeyPair;
use cohort_networking::MemoryNetwork;
use cohort_storage::MemoryDkgStore;
use cohort_threshold::Node;
use cohort_types::config::{CohortConfig, TelemetryConfig};
use cohort_types::plan::UnitIdentity;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub fn unit_keys(tag: u8, n: usize) -> Vec<BlsKeyPair> {
    (0..n)
        .map(|i| BlsKeyPair::from_seed(&[tag, i as u8, 0x5a]).unwrap())
        .collect()
}

pub fn identity(keys: &[BlsKeyPair], threshold: u32) -> UnitIdentity {
    UnitIdentity::new(
        threshold,
        keys.iter().map(|k| k.public_key().to_bytes()).collect(),
    )
    .unwrap()
}

/// A unit of nodes wired together over one in-memory network.
pub struct Cluster {
    pub net: Arc<MemoryNetwork>,
    pub keys: Vec<BlsKeyPair>,
    pub roster: UnitIdentity,
    pub nodes: Vec<Arc<Node>>,
    pub stores: Vec<Arc<dyn DkgStore>>,
    /// Inboxes of nodes whose loop the test drives itself.
    pub manual: HashMap<u32, mpsc::Receiver<Envelope>>,
    handles: Vec<JoinHandle<()>>,
}

pub struct ClusterBuilder {
    tag: u8,
    n: usize,
    threshold: u32,
    config: CohortConfig,
    manual: Vec<u32>,
    stores: Option<Vec<Arc<dyn DkgStore>>>,
}

impl ClusterBuilder {
    pub fn new(n: usize, threshold: u32) -> Self {
        Self {
            tag: 0,
            n,
            threshold,
            config: CohortConfig::default(),
            manual: Vec::new(),
            stores: None,
        }
    }

    pub fn tag(mut self, tag: u8) -> Self {
        self.tag = tag;
        self
    }

    pub fn config(mut self, config: CohortConfig) -> Self {
        self.config = config;
        self
    }

    pub fn manual(mut self, indices: &[u32]) -> Self {
        self.manual = indices.to_vec();
        self
    }

    pub fn stores(mut self, stores: Vec<Arc<dyn DkgStore>>) -> Self {
        self.stores = Some(stores);
        self
    }

    pub fn build(self) -> Cluster {
        cohort_telemetry::init_tracing(&TelemetryConfig {
            log_level: "warn".into(),
            json: false,
        })
        .unwrap();
        let keys = unit_keys(self.tag, self.n);
        let roster = identity(&keys, self.threshold);
        let (net, inboxes) = MemoryNetwork::new(self.n);
        let stores = self.stores.unwrap_or_else(|| {
            (0..self.n)
                .map(|_| Arc::new(MemoryDkgStore::default()) as Arc<dyn DkgStore>)
                .collect()
        });

        let mut nodes = Vec::new();
        let mut handles = Vec::new();
        let mut manual = HashMap::new();
        for (i, inbox) in inboxes.into_iter().enumerate() {
            let index = i as u32;
            let transport: Arc<dyn TreeTransport> = Arc::new(net.endpoint(index));
            let node = Node::new(
                keys[i].clone(),
                roster.clone(),
                transport,
                stores[i].clone(),
                self.config.clone(),
            )
            .unwrap();
            if self.manual.contains(&index) {
                manual.insert(index, inbox);
            } else {
                handles.push(node.spawn(inbox));
            }
            nodes.push(node);
        }
        Cluster {
            net,
            keys,
            roster,
            nodes,
            stores,
            manual,
            handles,
        }
    }
}

impl Cluster {
    pub fn node(&self, index: usize) -> &Arc<Node> {
        &self.nodes[index]
    }

    pub fn take_inbox(&mut self, index: u32) -> mpsc::Receiver<Envelope> {
        self.manual.remove(&index).unwrap()
    }

    /// Stops every node loop and waits until they have released their nodes.
    pub async fn shutdown(self) {
        for handle in &self.handles {
            handle.abort();
        }
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}

pub fn config_with_timeouts(ms: u64) -> CohortConfig {
    let mut config = CohortConfig::default();
    config.signing.timeout_ms = ms;
    config.dkg.timeout_ms = ms;
    config
}

// Path: crates/networking/src/memory.rs
//! A star tree over in-process channels.
//!
//! For an envelope rooted at `r`, node `r` is the parent of every other node
//! and nobody else has children. Nodes can be taken offline: delivery to an
//! offline node fails with `Unreachable`, and whatever it sends is dropped.

use async_trait::async_trait;
use cohort_api::transport::{Envelope, TreeTransport};
use cohort_types::error::TransportError;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Per-node inbox depth.
const INBOX_CAPACITY: usize = 1024;

/// The shared fabric: one inbox per roster index.
pub struct MemoryNetwork {
    inboxes: Vec<mpsc::Sender<Envelope>>,
    offline: RwLock<HashSet<u32>>,
}

impl MemoryNetwork {
    /// Builds a network of `n` nodes and returns the receiving half of each inbox.
    pub fn new(n: usize) -> (Arc<Self>, Vec<mpsc::Receiver<Envelope>>) {
        let (inboxes, receivers) = (0..n).map(|_| mpsc::channel(INBOX_CAPACITY)).unzip();
        let net = Arc::new(Self {
            inboxes,
            offline: RwLock::new(HashSet::new()),
        });
        (net, receivers)
    }

    /// The transport handle for node `index`.
    pub fn endpoint(self: &Arc<Self>, index: u32) -> MemoryEndpoint {
        MemoryEndpoint {
            net: Arc::clone(self),
            index,
        }
    }

    /// Takes a node offline or brings it back.
    pub fn set_offline(&self, index: u32, offline: bool) {
        let mut set = self.offline.write();
        if offline {
            set.insert(index);
        } else {
            set.remove(&index);
        }
    }

    pub fn is_offline(&self, index: u32) -> bool {
        self.offline.read().contains(&index)
    }

    pub fn len(&self) -> usize {
        self.inboxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inboxes.is_empty()
    }

    /// `from` is the sending endpoint; it overwrites whatever the envelope claims.
    async fn deliver(
        &self,
        from: u32,
        to: u32,
        mut envelope: Envelope,
    ) -> Result<(), TransportError> {
        if self.is_offline(from) {
            tracing::trace!(target: "transport", from, to, "sender offline, dropped");
            return Ok(());
        }
        if self.is_offline(to) {
            return Err(TransportError::Unreachable(to));
        }
        let inbox = self
            .inboxes
            .get(to as usize)
            .ok_or(TransportError::UnknownPeer(to))?;
        envelope.from = from;
        inbox
            .send(envelope)
            .await
            .map_err(|_| TransportError::Unreachable(to))
    }
}

/// One node's view of a `MemoryNetwork`.
#[derive(Clone)]
pub struct MemoryEndpoint {
    net: Arc<MemoryNetwork>,
    index: u32,
}

#[async_trait]
impl TreeTransport for MemoryEndpoint {
    fn local_index(&self) -> u32 {
        self.index
    }

    fn roster_len(&self) -> usize {
        self.net.len()
    }

    async fn broadcast_to_children(&self, envelope: Envelope) -> Vec<(u32, TransportError)> {
        if envelope.root != self.index {
            return Vec::new();
        }
        let mut failures = Vec::new();
        for to in (0..self.net.len() as u32).filter(|i| *i != self.index) {
            if let Err(e) = self.net.deliver(self.index, to, envelope.clone()).await {
                tracing::debug!(target: "transport", to, error = %e, "broadcast failed");
                failures.push((to, e));
            }
        }
        failures
    }

    async fn send_to_parent(&self, envelope: Envelope) -> Result<(), TransportError> {
        if envelope.root == self.index {
            return Err(TransportError::NoParent(self.index));
        }
        let root = envelope.root;
        self.net.deliver(self.index, root, envelope).await
    }

    async fn send_to(&self, to: u32, envelope: Envelope) -> Result<(), TransportError> {
        self.net.deliver(self.index, to, envelope).await
    }
}

// Path: crates/api/src/transport.rs
//! The tree broadcast/collect primitive the protocols run over.

use async_trait::async_trait;
use cohort_types::error::TransportError;
use parity_scale_codec::{Decode, Encode};

/// Identifies one protocol instance across every node taking part in it.
pub type InstanceId = [u8; 32];

/// A protocol message in flight.
#[derive(Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// The protocol instance this message belongs to.
    pub instance: InstanceId,
    /// Roster index of the tree's root for this instance.
    pub root: u32,
    /// Roster index of the sender. Transports set this on delivery; the
    /// value a sender puts here is not trusted.
    pub from: u32,
    /// SCALE-encoded protocol message.
    pub payload: Vec<u8>,
}

/// A tree overlay on a fixed roster. Delivery is reliable within a timeout
/// but not exactly-once; protocols tolerate duplicates and gaps.
#[async_trait]
pub trait TreeTransport: Send + Sync {
    /// This node's roster index.
    fn local_index(&self) -> u32;

    /// Number of nodes in the roster.
    fn roster_len(&self) -> usize;

    /// Sends to every child of this node in the tree rooted at `envelope.root`.
    /// Returns the failures; an empty vector means every child was reached.
    async fn broadcast_to_children(&self, envelope: Envelope) -> Vec<(u32, TransportError)>;

    /// Sends to this node's parent in the tree rooted at `envelope.root`.
    async fn send_to_parent(&self, envelope: Envelope) -> Result<(), TransportError>;

    /// Sends directly to one node.
    async fn send_to(&self, to: u32, envelope: Envelope) -> Result<(), TransportError>;
}

// Path: crates/threshold/src/node.rs
//! The per-node actor.
//!
//! A node drains its transport inbox in one loop. Replies are routed by
//! instance id to the coordinator session that is waiting for them; every
//! other message is handled in place as a participant. A session owns its
//! routing entry for as long as it runs, so replies that arrive after it
//! finished find no entry and are discarded.

use crate::completion::Completion;
use crate::messages::Message;
use cohort_api::crypto::SigningKeyPair;
use cohort_api::protocol::{SignVerifier, UpdateVerifier};
use cohort_api::storage::DkgStore;
use cohort_api::transport::{Envelope, InstanceId, TreeTransport};
use cohort_crypto::dkg::DealShare;
use cohort_crypto::sign::bls::{BlsKeyPair, BlsPublicKey};
use cohort_crypto::sign::threshold::decode_public_keys;
use cohort_execution::DependencyVerifier;
use cohort_types::config::CohortConfig;
use cohort_types::error::ProtocolError;
use cohort_types::plan::UnitIdentity;
use cohort_types::signing::SigningPurpose;
use cohort_types::tdh::DkgSessionId;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Replies delivered to a running session, tagged with the sender's index.
pub(crate) type SessionInbox = mpsc::UnboundedReceiver<(u32, Message)>;

pub struct Node {
    pub(crate) keys: BlsKeyPair,
    pub(crate) roster: UnitIdentity,
    pub(crate) roster_keys: Vec<BlsPublicKey>,
    pub(crate) transport: Arc<dyn TreeTransport>,
    pub(crate) store: Arc<dyn DkgStore>,
    pub(crate) config: CohortConfig,
    verifiers: RwLock<HashMap<SigningPurpose, Arc<dyn SignVerifier>>>,
    pub(crate) dependencies: DependencyVerifier,
    update_verifier: RwLock<Option<Arc<dyn UpdateVerifier>>>,
    sessions: Mutex<HashMap<InstanceId, mpsc::UnboundedSender<(u32, Message)>>>,
    /// Deal shares received per DKG session until the session is qualified
    /// or its setup deadline passes.
    pub(crate) deals: Arc<Mutex<HashMap<DkgSessionId, PendingDeals>>>,
}

/// Deal shares received for one DKG session, by dealer.
pub(crate) struct PendingDeals {
    pub(crate) opened: Instant,
    pub(crate) shares: BTreeMap<u32, DealShare>,
}

impl Node {
    /// Builds a node whose key sits at the transport's local index in `roster`.
    pub fn new(
        keys: BlsKeyPair,
        roster: UnitIdentity,
        transport: Arc<dyn TreeTransport>,
        store: Arc<dyn DkgStore>,
        config: CohortConfig,
    ) -> Result<Arc<Self>, ProtocolError> {
        roster
            .check()
            .map_err(|e| ProtocolError::InvalidRequest(e.to_string()))?;
        if roster.public_keys.len() != transport.roster_len() {
            return Err(ProtocolError::InvalidRequest(format!(
                "roster lists {} keys but the transport connects {} nodes",
                roster.public_keys.len(),
                transport.roster_len()
            )));
        }
        let roster_keys = decode_public_keys(&roster.public_keys)?;
        let index = transport.local_index();
        if roster_keys.get(index as usize) != Some(&keys.public_key()) {
            return Err(ProtocolError::InvalidRequest(format!(
                "local key is not at roster index {index}"
            )));
        }
        Ok(Arc::new(Self {
            keys,
            roster,
            roster_keys,
            transport,
            store,
            dependencies: DependencyVerifier::new(config.verifier.clone()),
            config,
            verifiers: RwLock::new(HashMap::new()),
            update_verifier: RwLock::new(None),
            sessions: Mutex::new(HashMap::new()),
            deals: Arc::new(Mutex::new(HashMap::new())),
        }))
    }

    pub fn index(&self) -> u32 {
        self.transport.local_index()
    }

    pub fn roster(&self) -> &UnitIdentity {
        &self.roster
    }

    /// Installs the predicate this node runs before signing requests of `purpose`.
    /// Purposes without one are signed unconditionally.
    pub fn register_verifier(&self, purpose: SigningPurpose, verifier: Arc<dyn SignVerifier>) {
        self.verifiers.write().insert(purpose, verifier);
    }

    pub(crate) fn verifier(&self, purpose: SigningPurpose) -> Option<Arc<dyn SignVerifier>> {
        self.verifiers.read().get(&purpose).cloned()
    }

    /// Installs the state check this node runs after verifying an execution
    /// request's dependencies.
    pub fn set_update_verifier(&self, verifier: Arc<dyn UpdateVerifier>) {
        *self.update_verifier.write() = Some(verifier);
    }

    pub(crate) fn update_verifier(&self) -> Option<Arc<dyn UpdateVerifier>> {
        self.update_verifier.read().clone()
    }

    /// Drains `inbox` until the transport closes it.
    pub fn spawn(self: &Arc<Self>, mut inbox: mpsc::Receiver<Envelope>) -> JoinHandle<()> {
        let node = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(envelope) = inbox.recv().await {
                node.handle(envelope).await;
            }
            debug!(target: "transport", index = node.index(), "inbox closed");
        })
    }

    /// Processes one inbound envelope.
    pub async fn handle(&self, envelope: Envelope) {
        let message = match Message::open(&envelope) {
            Ok(m) => m,
            Err(e) => {
                warn!(target: "transport", from = envelope.from, error = %e, "dropping undecodable envelope");
                return;
            }
        };
        if message.is_reply() {
            self.route(envelope.instance, envelope.from, message);
            return;
        }
        match message {
            Message::SignRequest(request) => self.on_sign_request(&envelope, request).await,
            Message::DkgStart(start) => self.on_dkg_start(&envelope, start).await,
            Message::DkgDeal(deal) => self.on_dkg_deal(envelope.from, deal),
            Message::DkgQualify(qualify) => self.on_dkg_qualify(&envelope, qualify).await,
            Message::DecryptRequest(request) => self.on_decrypt_request(&envelope, request).await,
            Message::VerifyRequest(request) => self.on_verify_request(&envelope, request).await,
            other => {
                debug!(target: "transport", from = envelope.from, kind = other.kind(), "unexpected message");
            }
        }
    }

    /// Answers the coordinator of `request`'s instance.
    pub(crate) async fn reply(&self, request: &Envelope, message: Message) {
        let envelope = message.seal(request.instance, request.root, self.index());
        if let Err(e) = self.transport.send_to_parent(envelope).await {
            warn!(target: "transport", root = request.root, kind = message.kind(), error = %e, "reply not delivered");
        }
    }

    fn route(&self, instance: InstanceId, from: u32, message: Message) {
        let sessions = self.sessions.lock();
        match sessions.get(&instance) {
            Some(inbox) => {
                if inbox.send((from, message)).is_err() {
                    debug!(target: "transport", from, "session collector already gone");
                }
            }
            None => {
                debug!(
                    target: "transport",
                    from,
                    kind = message.kind(),
                    instance = %hex::encode(instance),
                    "late reply for finished session discarded"
                );
            }
        }
    }

    /// Runs one coordinator session: registers a fresh instance id, drives
    /// `collect` until it returns or `timeout` elapses, and unregisters.
    pub(crate) async fn run_session<T, F, Fut>(
        &self,
        timeout: Duration,
        collect: F,
    ) -> Result<T, ProtocolError>
    where
        T: Send + 'static,
        F: FnOnce(InstanceId, SessionInbox) -> Fut,
        Fut: Future<Output = Result<T, ProtocolError>> + Send + 'static,
    {
        let instance: InstanceId = rand::random();
        let (tx, inbox) = mpsc::unbounded_channel();
        self.sessions.lock().insert(instance, tx);
        let _registration = Registration {
            sessions: &self.sessions,
            instance,
        };

        let (gate, done) = Completion::new();
        let deadline = gate.arm_deadline(timeout, || Err(ProtocolError::ProtocolTimeout));
        let collector = {
            let gate = Arc::clone(&gate);
            let fut = collect(instance, inbox);
            tokio::spawn(async move {
                gate.finish(fut.await);
            })
        };

        let outcome = done.await.unwrap_or(Err(ProtocolError::Aborted));
        deadline.abort();
        collector.abort();
        outcome
    }
}

/// Removes a session's routing entry when the session ends.
struct Registration<'a> {
    sessions: &'a Mutex<HashMap<InstanceId, mpsc::UnboundedSender<(u32, Message)>>>,
    instance: InstanceId,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.sessions.lock().remove(&self.instance);
    }
}

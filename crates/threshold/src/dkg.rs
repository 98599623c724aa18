// Path: crates/threshold/src/dkg.rs
//! DKG setup rounds.
//!
//! Joint-Feldman over the star tree, in two phases:
//!
//! 1. The coordinator broadcasts `DkgStart`. Every node, the coordinator
//!    included, deals a random polynomial: it sends each node its share
//!    directly and then tells the coordinator it dealt.
//! 2. Once every node has answered, the dealers that dealt form the qualified
//!    set. The coordinator broadcasts it; every node combines the shares it
//!    received from those dealers, persists the result and acknowledges with
//!    the group key it derived.
//!
//! Both phases wait for the whole roster and fail as soon as more than
//! `n - threshold` nodes failed.

use crate::messages::{DkgAck, DkgDeal, DkgDealt, DkgQualify, DkgStart, Message};
use crate::node::{Node, PendingDeals, SessionInbox};
use crate::quorum::{Progress, Quorum};
use cohort_api::transport::{Envelope, InstanceId};
use cohort_crypto::dkg::group::encode_point;
use cohort_crypto::dkg::{Deal, DealShare, DistKeyShare};
use cohort_types::error::ProtocolError;
use cohort_types::tdh::DkgSessionId;
use k256::ProjectivePoint;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

impl Node {
    /// Runs DKG setup for `session` as coordinator and returns the group key `X`.
    ///
    /// Fails with `SessionExists` if this node already holds a share for it.
    pub async fn setup_dkg(
        self: &Arc<Self>,
        session: DkgSessionId,
    ) -> Result<ProjectivePoint, ProtocolError> {
        if self.store.get(&session)?.is_some() {
            return Err(ProtocolError::SessionExists(session.to_string()));
        }
        let n = self.roster_keys.len();
        let threshold = self.config.dkg.threshold_for(n);
        if threshold == 0 || threshold > n {
            return Err(ProtocolError::InvalidRequest(format!(
                "threshold {threshold} invalid for {n} nodes"
            )));
        }

        let node = Arc::clone(self);
        let outcome = self
            .run_session(self.config.dkg.timeout(), move |instance, inbox| async move {
                node.collect_dkg(instance, inbox, session, threshold).await
            })
            .await;
        self.deals.lock().remove(&session);
        match &outcome {
            Ok(x) => info!(target: "dkg", %session, public_key = %hex::encode(encode_point(x)), "DKG setup finished"),
            Err(e) => warn!(target: "dkg", %session, error = %e, "DKG setup failed"),
        }
        outcome
    }

    /// The group key of a session this node holds a share for.
    pub fn dkg_public_key(&self, session: &DkgSessionId) -> Result<ProjectivePoint, ProtocolError> {
        Ok(self.load_share(session)?.public_key())
    }

    pub(crate) fn load_share(&self, session: &DkgSessionId) -> Result<DistKeyShare, ProtocolError> {
        let record = self
            .store
            .get(session)?
            .ok_or_else(|| ProtocolError::UnknownSession(session.to_string()))?;
        Ok(DistKeyShare::from_record(&record)?)
    }

    async fn collect_dkg(
        self: Arc<Self>,
        instance: InstanceId,
        mut inbox: SessionInbox,
        session: DkgSessionId,
        threshold: usize,
    ) -> Result<ProjectivePoint, ProtocolError> {
        let me = self.index();
        let n = self.roster_keys.len();
        info!(target: "dkg", %session, n, threshold, "DKG setup started");

        let mut dealt = Quorum::new(n, threshold);
        match self.deal(instance, me, session, threshold).await {
            Ok(()) => dealt.accept(me),
            Err(e) => {
                warn!(target: "dkg", %session, error = %e, "coordinator could not deal");
                dealt.fail(me)
            }
        };
        let start = Message::DkgStart(DkgStart {
            session,
            threshold: threshold as u32,
        });
        for (to, e) in self.transport.broadcast_to_children(start.seal(instance, me, me)).await {
            debug!(target: "dkg", to, error = %e, "participant unreachable");
            dealt.fail(to);
        }
        loop {
            match dealt.progress_all() {
                Progress::Reached => break,
                Progress::Lost => return Err(dealt.insufficient()),
                Progress::Pending => {}
            }
            let (from, message) = inbox.recv().await.ok_or(ProtocolError::Aborted)?;
            match message {
                Message::DkgDealt(DkgDealt { dealt: true }) => {
                    dealt.accept(from);
                }
                Message::DkgDealt(_) => {
                    info!(target: "dkg", %session, from, "participant did not deal");
                    dealt.fail(from);
                }
                other => debug!(target: "dkg", from, kind = other.kind(), "ignoring reply"),
            }
        }

        let dealers: Vec<u32> = dealt.acceptors().collect();
        let key = self.combine_deals(session, threshold, &dealers)?;
        let group_key = encode_point(&key.public_key());
        debug!(target: "dkg", %session, dealers = dealers.len(), "deals qualified");

        let mut acked = Quorum::new(n, threshold);
        acked.accept(me);
        let qualify = Message::DkgQualify(DkgQualify {
            session,
            threshold: threshold as u32,
            dealers,
        });
        for (to, e) in self.transport.broadcast_to_children(qualify.seal(instance, me, me)).await {
            debug!(target: "dkg", to, error = %e, "participant unreachable");
            acked.fail(to);
        }
        loop {
            match acked.progress_all() {
                Progress::Reached => break,
                Progress::Lost => return Err(acked.insufficient()),
                Progress::Pending => {}
            }
            let (from, message) = inbox.recv().await.ok_or(ProtocolError::Aborted)?;
            match message {
                Message::DkgAck(DkgAck {
                    public_key: Some(pk),
                }) if pk == group_key => {
                    acked.accept(from);
                }
                Message::DkgAck(ack) => {
                    info!(
                        target: "dkg",
                        %session,
                        from,
                        derived = ack.public_key.is_some(),
                        "participant did not confirm the group key"
                    );
                    acked.fail(from);
                }
                other => debug!(target: "dkg", from, kind = other.kind(), "ignoring reply"),
            }
        }

        self.persist(session, &key)?;
        Ok(key.public_key())
    }

    /// Deals a fresh polynomial: each share goes straight to its node, ours is kept.
    async fn deal(
        &self,
        instance: InstanceId,
        root: u32,
        session: DkgSessionId,
        threshold: usize,
    ) -> Result<(), ProtocolError> {
        if threshold == 0 {
            return Err(ProtocolError::InvalidRequest("threshold must be positive".into()));
        }
        let me = self.index();
        let deal = Deal::generate(me, self.roster_keys.len(), threshold)?;
        for to in 0..self.roster_keys.len() as u32 {
            let Some(share) = deal.share_for(to) else {
                continue;
            };
            if to == me {
                self.keep_deal(session, share);
                continue;
            }
            let envelope = Message::DkgDeal(DkgDeal { session, share }).seal(instance, root, me);
            if let Err(e) = self.transport.send_to(to, envelope).await {
                debug!(target: "dkg", %session, to, error = %e, "deal share not delivered");
            }
        }
        Ok(())
    }

    fn keep_deal(&self, session: DkgSessionId, share: DealShare) {
        let mut deals = self.deals.lock();
        let pending = deals.entry(session).or_insert_with(|| {
            let opened = Instant::now();
            self.expire_deals(session, opened);
            PendingDeals {
                opened,
                shares: BTreeMap::new(),
            }
        });
        pending.shares.insert(share.dealer, share);
    }

    /// Drops `session`'s deal shares once a setup deadline has passed since
    /// the first one arrived, unless the session was qualified meanwhile.
    fn expire_deals(&self, session: DkgSessionId, opened: Instant) {
        let deals = Arc::clone(&self.deals);
        let ttl = self.config.dkg.timeout();
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            let mut deals = deals.lock();
            if deals.get(&session).is_some_and(|p| p.opened == opened) {
                deals.remove(&session);
                debug!(target: "dkg", %session, "abandoned deal shares evicted");
            }
        });
    }

    /// Combines the qualified dealers' shares, consuming everything received for `session`.
    fn combine_deals(
        &self,
        session: DkgSessionId,
        threshold: usize,
        dealers: &[u32],
    ) -> Result<DistKeyShare, ProtocolError> {
        let received = self
            .deals
            .lock()
            .remove(&session)
            .map(|p| p.shares)
            .unwrap_or_default();
        let shares = dealers
            .iter()
            .map(|d| {
                received.get(d).cloned().ok_or_else(|| {
                    ProtocolError::MalformedShare(format!("no deal from dealer {d}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        DistKeyShare::combine(self.index(), self.roster_keys.len(), threshold, &shares)
            .map_err(|e| ProtocolError::MalformedShare(e.to_string()))
    }

    fn persist(&self, session: DkgSessionId, key: &DistKeyShare) -> Result<(), ProtocolError> {
        if !self.store.insert(session, key.to_record())? {
            return Err(ProtocolError::SessionExists(session.to_string()));
        }
        info!(target: "dkg", %session, index = key.index, "DKG share persisted");
        Ok(())
    }

    pub(crate) async fn on_dkg_start(&self, envelope: &Envelope, start: DkgStart) {
        let session = start.session;
        let dealt = match self.store.get(&session) {
            Ok(Some(_)) => {
                warn!(target: "dkg", %session, "session already set up, not dealing");
                false
            }
            Ok(None) => {
                match self
                    .deal(envelope.instance, envelope.root, session, start.threshold as usize)
                    .await
                {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(target: "dkg", %session, error = %e, "could not deal");
                        false
                    }
                }
            }
            Err(e) => {
                warn!(target: "dkg", %session, error = %e, "session store unavailable");
                false
            }
        };
        self.reply(envelope, Message::DkgDealt(DkgDealt { dealt }))
            .await;
    }

    pub(crate) fn on_dkg_deal(&self, from: u32, deal: DkgDeal) {
        if deal.share.dealer != from {
            warn!(
                target: "dkg",
                session = %deal.session,
                from,
                claimed = deal.share.dealer,
                "deal share from the wrong sender dropped"
            );
            return;
        }
        self.keep_deal(deal.session, deal.share);
    }

    pub(crate) async fn on_dkg_qualify(&self, envelope: &Envelope, qualify: DkgQualify) {
        let session = qualify.session;
        let public_key = match self.qualify(&qualify) {
            Ok(pk) => Some(pk),
            Err(e) => {
                warn!(target: "dkg", %session, error = %e, "could not derive a share");
                None
            }
        };
        self.reply(envelope, Message::DkgAck(DkgAck { public_key }))
            .await;
    }

    fn qualify(&self, qualify: &DkgQualify) -> Result<Vec<u8>, ProtocolError> {
        let key = self.combine_deals(
            qualify.session,
            qualify.threshold as usize,
            &qualify.dealers,
        )?;
        self.persist(qualify.session, &key)?;
        Ok(encode_point(&key.public_key()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cohort_api::crypto::{SerializableKey, SigningKeyPair};
    use cohort_api::storage::DkgStore;
    use cohort_api::transport::TreeTransport;
    use cohort_crypto::sign::bls::BlsKeyPair;
    use cohort_networking::MemoryNetwork;
    use cohort_storage::MemoryDkgStore;
    use cohort_types::config::CohortConfig;
    use cohort_types::plan::UnitIdentity;
    use std::time::Duration;
    use tokio::sync::mpsc;

    const TIMEOUT_MS: u64 = 300;

    /// Four nodes, threshold 3; every inbox is handed back undrained.
    fn unit() -> (Vec<Arc<Node>>, Vec<mpsc::Receiver<Envelope>>) {
        let keys: Vec<_> = (0..4u8)
            .map(|i| BlsKeyPair::from_seed(&[0x44, i]).unwrap())
            .collect();
        let roster =
            UnitIdentity::new(3, keys.iter().map(|k| k.public_key().to_bytes()).collect())
                .unwrap();
        let mut config = CohortConfig::default();
        config.dkg.timeout_ms = TIMEOUT_MS;
        let (net, inboxes) = MemoryNetwork::new(4);
        let nodes = keys
            .into_iter()
            .enumerate()
            .map(|(i, k)| {
                let transport: Arc<dyn TreeTransport> = Arc::new(net.endpoint(i as u32));
                let store: Arc<dyn DkgStore> = Arc::new(MemoryDkgStore::default());
                Node::new(k, roster.clone(), transport, store, config.clone()).unwrap()
            })
            .collect();
        (nodes, inboxes)
    }

    fn pending(node: &Node) -> usize {
        node.deals.lock().len()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn abandoned_setup_releases_deal_shares() {
        let (nodes, inboxes) = unit();
        let mut handles = Vec::new();
        let mut silent = Vec::new();
        for (node, inbox) in nodes.iter().zip(inboxes) {
            // node 3 never answers, so setup stalls after the deal phase
            if node.index() == 3 {
                silent.push(inbox);
            } else {
                handles.push(node.spawn(inbox));
            }
        }

        let sid = DkgSessionId([0x33; 32]);
        let coordinator = Arc::clone(&nodes[0]);
        let setup = tokio::spawn(async move { coordinator.setup_dkg(sid).await });
        tokio::time::sleep(Duration::from_millis(100)).await;
        for node in &nodes[1..3] {
            assert_eq!(pending(node), 1);
            assert_eq!(node.deals.lock()[&sid].shares.len(), 3);
        }

        assert!(matches!(
            setup.await.unwrap(),
            Err(ProtocolError::ProtocolTimeout)
        ));
        assert_eq!(pending(&nodes[0]), 0);

        tokio::time::sleep(Duration::from_millis(2 * TIMEOUT_MS)).await;
        for node in &nodes[1..3] {
            assert_eq!(pending(node), 0);
            assert!(node.store.get(&sid).unwrap().is_none());
        }
        for handle in handles {
            handle.abort();
        }
    }

    #[tokio::test]
    async fn unsolicited_deal_expires() {
        let (nodes, _inboxes) = unit();
        let share = Deal::generate(2, 4, 3).unwrap().share_for(1).unwrap();
        let session = DkgSessionId([0x34; 32]);
        nodes[1].on_dkg_deal(2, DkgDeal { session, share });
        assert_eq!(pending(&nodes[1]), 1);

        tokio::time::sleep(Duration::from_millis(2 * TIMEOUT_MS)).await;
        assert_eq!(pending(&nodes[1]), 0);
    }
}

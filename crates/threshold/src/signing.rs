// Path: crates/threshold/src/signing.rs
//! Threshold signing rounds.
//!
//! The coordinator signs first, broadcasts the request and adds every valid
//! partial into one running aggregate per named message. It finishes as soon
//! as `threshold` signers are in, or as soon as more than `n - threshold`
//! participants have failed or refused.

use crate::messages::{Message, SignReply};
use crate::node::{Node, SessionInbox};
use crate::quorum::{Progress, Quorum};
use cohort_api::crypto::{AggregateSignature, SerializableKey, SigningKeyPair, VerifyingKey};
use cohort_api::transport::{Envelope, InstanceId};
use cohort_crypto::sign::bls::BlsSignature;
use cohort_crypto::sign::mask::ParticipationMask;
use cohort_crypto::sign::threshold::ThresholdSignature;
use cohort_types::error::{CryptoError, ProtocolError};
use cohort_types::signing::{SigningOutcome, SigningRequest};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Running state of one round on the coordinator.
struct Round {
    quorum: Quorum,
    n: usize,
    aggregates: Vec<Option<BlsSignature>>,
}

impl Round {
    fn new(n: usize, threshold: usize, messages: usize) -> Self {
        Self {
            quorum: Quorum::new(n, threshold),
            n,
            aggregates: vec![None; messages],
        }
    }

    fn add(&mut self, signer: u32, partials: Vec<BlsSignature>) {
        if !self.quorum.accept(signer) {
            return;
        }
        for (slot, partial) in self.aggregates.iter_mut().zip(partials) {
            match slot {
                Some(acc) => acc.aggregate(&partial),
                None => *slot = Some(partial),
            }
        }
    }

    fn finalize(self, request: &SigningRequest) -> Result<SigningOutcome, ProtocolError> {
        let mut mask = ParticipationMask::new(self.n);
        for signer in self.quorum.acceptors() {
            mask.set(signer as usize)?;
        }
        let mut signatures = BTreeMap::new();
        for (named, aggregate) in request.messages.iter().zip(self.aggregates) {
            let signature = aggregate.ok_or_else(|| self.quorum.insufficient())?;
            let artifact = ThresholdSignature {
                signature,
                mask: mask.clone(),
            };
            signatures.insert(named.name.clone(), artifact.to_bytes());
        }
        Ok(SigningOutcome {
            signatures,
            mask: mask.as_bytes().to_vec(),
        })
    }
}

impl Node {
    /// Coordinates a signing round over every message of `request`.
    pub async fn sign(
        self: &Arc<Self>,
        request: SigningRequest,
    ) -> Result<SigningOutcome, ProtocolError> {
        if request.messages.is_empty() {
            return Err(ProtocolError::InvalidRequest("nothing to sign".into()));
        }
        let node = Arc::clone(self);
        let outcome = self
            .run_session(self.config.signing.timeout(), move |instance, inbox| async move {
                node.collect_signatures(instance, inbox, request).await
            })
            .await;
        match &outcome {
            Ok(done) => info!(
                target: "signing",
                signers = ParticipationMask::from_bytes(&done.mask, self.roster_keys.len())
                    .map(|m| m.count())
                    .unwrap_or_default(),
                "signing round finished"
            ),
            Err(e) => warn!(target: "signing", error = %e, "signing round failed"),
        }
        outcome
    }

    fn sign_all(&self, request: &SigningRequest) -> Result<Vec<BlsSignature>, CryptoError> {
        request
            .messages
            .iter()
            .map(|m| self.keys.sign(&m.message))
            .collect()
    }

    async fn collect_signatures(
        self: Arc<Self>,
        instance: InstanceId,
        mut inbox: SessionInbox,
        request: SigningRequest,
    ) -> Result<SigningOutcome, ProtocolError> {
        let me = self.index();
        let n = self.roster_keys.len();
        let mut round = Round::new(n, self.roster.threshold as usize, request.messages.len());

        match self.sign_all(&request) {
            Ok(partials) => round.add(me, partials),
            Err(e) => {
                warn!(target: "signing", error = %e, "coordinator could not sign its own partial");
                round.quorum.fail(me);
            }
        }

        info!(
            target: "signing",
            instance = %hex::encode(instance),
            purpose = ?request.purpose,
            messages = request.messages.len(),
            n,
            threshold = self.roster.threshold,
            "signing round started"
        );
        let envelope = Message::SignRequest(request.clone()).seal(instance, me, me);
        for (to, e) in self.transport.broadcast_to_children(envelope).await {
            debug!(target: "signing", to, error = %e, "participant unreachable");
            round.quorum.fail(to);
        }

        loop {
            match round.quorum.progress() {
                Progress::Reached => return round.finalize(&request),
                Progress::Lost => return Err(round.quorum.insufficient()),
                Progress::Pending => {}
            }
            let Some((from, message)) = inbox.recv().await else {
                return Err(ProtocolError::Aborted);
            };
            let reply = match message {
                Message::SignReply(reply) => reply,
                other => {
                    debug!(target: "signing", from, kind = other.kind(), "ignoring non-signing reply");
                    continue;
                }
            };
            if round.quorum.has_responded(from) {
                debug!(target: "signing", from, "duplicate reply ignored");
                continue;
            }
            match self.check_partials(from, &request, reply) {
                Ok(partials) => round.add(from, partials),
                Err(reason) => {
                    info!(target: "signing", from, %reason, "participant failed");
                    round.quorum.fail(from);
                }
            }
        }
    }

    /// Decodes a reply and checks each partial against the sender's key.
    fn check_partials(
        &self,
        from: u32,
        request: &SigningRequest,
        reply: SignReply,
    ) -> Result<Vec<BlsSignature>, String> {
        let partials = reply.partials.ok_or_else(|| "refused".to_string())?;
        if partials.len() != request.messages.len() {
            return Err(format!(
                "{} partials for {} messages",
                partials.len(),
                request.messages.len()
            ));
        }
        let key = self
            .roster_keys
            .get(from as usize)
            .ok_or_else(|| format!("index {from} is not in the roster"))?;
        request
            .messages
            .iter()
            .zip(partials)
            .map(|(named, bytes)| -> Result<BlsSignature, String> {
                let partial = BlsSignature::from_bytes(&bytes).map_err(|e| e.to_string())?;
                key.verify(&named.message, &partial)
                    .map_err(|e| format!("partial for {}: {e}", named.name))?;
                Ok(partial)
            })
            .collect()
    }

    pub(crate) async fn on_sign_request(&self, envelope: &Envelope, request: SigningRequest) {
        let willing = match self.verifier(request.purpose) {
            Some(verifier) => verifier.verify(&request),
            None => true,
        };
        let partials = if willing {
            match self.sign_all(&request) {
                Ok(sigs) => Some(sigs.iter().map(SerializableKey::to_bytes).collect()),
                Err(e) => {
                    warn!(target: "signing", error = %e, "signing failed");
                    None
                }
            }
        } else {
            info!(target: "signing", root = envelope.root, purpose = ?request.purpose, "refusing to sign");
            None
        };
        self.reply(envelope, Message::SignReply(SignReply { partials }))
            .await;
    }
}

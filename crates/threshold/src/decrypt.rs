// Path: crates/threshold/src/decrypt.rs
//! Threshold decryption rounds.
//!
//! The coordinator contributes its own share unproved, broadcasts the `U`
//! points and checks every participant's proofs against the session's public
//! polynomial. A participant whose shares do not verify is discarded and
//! counted as a failure; the round completes with the first `threshold`
//! contributors and interpolates `x·U'` for every ciphertext.
//!
//! Nodes do not check the ciphertexts' own well-formedness proofs.

use crate::messages::{DecryptRequest, DecryptShares, Message};
use crate::node::{Node, SessionInbox};
use crate::quorum::{Progress, Quorum};
use cohort_api::transport::{Envelope, InstanceId};
use cohort_crypto::dkg::group::{decode_point, encode_point};
use cohort_crypto::dkg::DistKeyShare;
use cohort_crypto::tdh::{
    blinded_base, combine_shares, create_share, recover_plaintext, verify_share, ProvedShare,
};
use cohort_types::error::ProtocolError;
use cohort_types::tdh::{Ciphertext, DecryptReply, DkgSessionId};
use k256::ProjectivePoint;
use std::sync::Arc;
use tracing::{debug, info, warn};

impl Node {
    /// Decrypts a batch of ciphertexts under `session`, one reply per ciphertext.
    ///
    /// With a recipient key `xc` the replies stay blinded by `xc·X` and only
    /// the holder of `xc` can recover the plaintexts.
    pub async fn decrypt_batch(
        self: &Arc<Self>,
        session: DkgSessionId,
        ciphertexts: Vec<Ciphertext>,
        xc: Option<ProjectivePoint>,
    ) -> Result<Vec<DecryptReply>, ProtocolError> {
        if ciphertexts.is_empty() {
            return Err(ProtocolError::InvalidRequest("no ciphertexts".into()));
        }
        let key = self.load_share(&session)?;
        let points = ciphertexts
            .iter()
            .map(|ct| decode_point(&ct.u))
            .collect::<Result<Vec<_>, _>>()?;

        let node = Arc::clone(self);
        let outcome = self
            .run_session(self.config.dkg.timeout(), move |instance, inbox| async move {
                node.collect_decryption(instance, inbox, session, key, ciphertexts, points, xc)
                    .await
            })
            .await;
        match &outcome {
            Ok(replies) => info!(target: "tdh", %session, ciphertexts = replies.len(), "decryption finished"),
            Err(e) => warn!(target: "tdh", %session, error = %e, "decryption failed"),
        }
        outcome
    }

    /// Decrypts one ciphertext.
    pub async fn decrypt(
        self: &Arc<Self>,
        session: DkgSessionId,
        ciphertext: &Ciphertext,
        xc: Option<ProjectivePoint>,
    ) -> Result<DecryptReply, ProtocolError> {
        self.decrypt_batch(session, vec![ciphertext.clone()], xc)
            .await?
            .pop()
            .ok_or(ProtocolError::Aborted)
    }

    /// Decrypts one ciphertext without a recipient key and returns the plaintext.
    pub async fn decrypt_plaintext(
        self: &Arc<Self>,
        session: DkgSessionId,
        ciphertext: &Ciphertext,
    ) -> Result<Vec<u8>, ProtocolError> {
        let reply = self.decrypt(session, ciphertext, None).await?;
        Ok(recover_plaintext(&reply, None)?)
    }

    #[allow(clippy::too_many_arguments)]
    async fn collect_decryption(
        self: Arc<Self>,
        instance: InstanceId,
        mut inbox: SessionInbox,
        session: DkgSessionId,
        key: DistKeyShare,
        ciphertexts: Vec<Ciphertext>,
        points: Vec<ProjectivePoint>,
        xc: Option<ProjectivePoint>,
    ) -> Result<Vec<DecryptReply>, ProtocolError> {
        let me = self.index();
        let n = self.roster_keys.len();
        let threshold = key.threshold();
        let mut quorum = Quorum::new(n, threshold);
        let mut collected: Vec<Vec<(u32, ProjectivePoint)>> = vec![Vec::new(); points.len()];

        quorum.accept(me);
        for (slot, u) in collected.iter_mut().zip(&points) {
            slot.push((me, blinded_base(u, xc.as_ref()) * key.secret()));
        }

        info!(
            target: "tdh",
            %session,
            ciphertexts = points.len(),
            recipient = xc.is_some(),
            threshold,
            "decryption started"
        );
        let request = Message::DecryptRequest(DecryptRequest {
            session,
            points: points.iter().map(encode_point).collect(),
            xc: xc.as_ref().map(encode_point),
        });
        for (to, e) in self.transport.broadcast_to_children(request.seal(instance, me, me)).await {
            debug!(target: "tdh", to, error = %e, "participant unreachable");
            quorum.fail(to);
        }

        loop {
            match quorum.progress() {
                Progress::Reached => break,
                Progress::Lost => return Err(quorum.insufficient()),
                Progress::Pending => {}
            }
            let (from, message) = inbox.recv().await.ok_or(ProtocolError::Aborted)?;
            let reply = match message {
                Message::DecryptShares(reply) => reply,
                other => {
                    debug!(target: "tdh", from, kind = other.kind(), "ignoring reply");
                    continue;
                }
            };
            if quorum.has_responded(from) {
                continue;
            }
            match check_shares(from, &key, &points, xc.as_ref(), reply) {
                Ok(values) => {
                    quorum.accept(from);
                    for (slot, v) in collected.iter_mut().zip(values) {
                        slot.push((from, v));
                    }
                }
                Err(reason) => {
                    warn!(target: "tdh", %session, from, %reason, "discarding decryption shares");
                    quorum.fail(from);
                }
            }
        }

        let x = encode_point(&key.public_key());
        ciphertexts
            .iter()
            .zip(&collected)
            .map(|(ct, shares)| -> Result<DecryptReply, ProtocolError> {
                let xhat_enc = combine_shares(shares, threshold)?;
                Ok(DecryptReply {
                    c: ct.c.clone(),
                    x: x.clone(),
                    xhat_enc: encode_point(&xhat_enc),
                })
            })
            .collect()
    }

    pub(crate) async fn on_decrypt_request(&self, envelope: &Envelope, request: DecryptRequest) {
        let shares = match self.decryption_shares(&request) {
            Ok(shares) => Some(shares),
            Err(e) => {
                warn!(target: "tdh", session = %request.session, error = %e, "refusing to decrypt");
                None
            }
        };
        self.reply(envelope, Message::DecryptShares(DecryptShares { shares }))
            .await;
    }

    fn decryption_shares(&self, request: &DecryptRequest) -> Result<Vec<ProvedShare>, ProtocolError> {
        let key = self.load_share(&request.session)?;
        let xc = request.xc.as_deref().map(decode_point).transpose()?;
        request
            .points
            .iter()
            .map(|p| -> Result<ProvedShare, ProtocolError> {
                let u = decode_point(p)?;
                Ok(create_share(&key, &u, xc.as_ref())?)
            })
            .collect()
    }
}

/// Verifies one participant's shares, returning `V_i` per point.
fn check_shares(
    from: u32,
    key: &DistKeyShare,
    points: &[ProjectivePoint],
    xc: Option<&ProjectivePoint>,
    reply: DecryptShares,
) -> Result<Vec<ProjectivePoint>, String> {
    let shares = reply.shares.ok_or_else(|| "refused".to_string())?;
    if shares.len() != points.len() {
        return Err(format!("{} shares for {} points", shares.len(), points.len()));
    }
    shares
        .iter()
        .zip(points)
        .map(|(share, u)| {
            if share.index != from {
                return Err(format!("share claims index {}", share.index));
            }
            verify_share(share, key.public_poly(), u, xc).map_err(|e| e.to_string())
        })
        .collect()
}

// Path: crates/threshold/src/verify.rs
//! Unit-wide verification of an execution request.
//!
//! The coordinator checks the request itself before anyone else is asked.
//! It then broadcasts the request with the evidence it checked, and every
//! member runs the same dependency checks plus its own state hook. The round
//! succeeds at `threshold` acceptances, the coordinator included, and fails
//! as soon as more than `n - threshold` members rejected it or were
//! unreachable.

use crate::messages::{Message, VerifyReply, VerifyRequest};
use crate::node::{Node, SessionInbox};
use crate::quorum::{Progress, Quorum};
use cohort_api::transport::{Envelope, InstanceId};
use cohort_types::error::{ProtocolError, VerificationError};
use cohort_types::plan::{ExecutionRequest, VerificationData};
use std::sync::Arc;
use tracing::{debug, info, warn};

impl Node {
    /// Has the unit verify `request` against `data`.
    ///
    /// A request this node rejects itself fails with `Verification` without
    /// starting a round.
    pub async fn verify_request(
        self: &Arc<Self>,
        request: ExecutionRequest,
        data: VerificationData,
    ) -> Result<(), ProtocolError> {
        self.check_request(&request, &data)?;

        let node = Arc::clone(self);
        let verify = VerifyRequest { request, data };
        let outcome = self
            .run_session(self.config.verifier.timeout(), move |instance, inbox| async move {
                node.collect_verdicts(instance, inbox, verify).await
            })
            .await;
        match &outcome {
            Ok(()) => info!(target: "verifier", "execution request verified by the unit"),
            Err(e) => warn!(target: "verifier", error = %e, "unit verification failed"),
        }
        outcome
    }

    /// Dependency checks, then the state hook if one is installed.
    fn check_request(
        &self,
        request: &ExecutionRequest,
        data: &VerificationData,
    ) -> Result<(), VerificationError> {
        self.dependencies.verify(request, data)?;
        if let Some(hook) = self.update_verifier() {
            let plan = &request.plan;
            if !hook.verify_update(&plan.cid, &plan.state_root) {
                return Err(VerificationError::StateNotAccepted {
                    cid: hex::encode(&plan.cid),
                    root: hex::encode(&plan.state_root),
                });
            }
        }
        Ok(())
    }

    async fn collect_verdicts(
        self: Arc<Self>,
        instance: InstanceId,
        mut inbox: SessionInbox,
        verify: VerifyRequest,
    ) -> Result<(), ProtocolError> {
        let me = self.index();
        let n = self.roster_keys.len();
        let mut quorum = Quorum::new(n, self.roster.threshold as usize);
        quorum.accept(me);

        info!(
            target: "verifier",
            instance = %hex::encode(instance),
            index = verify.request.index,
            n,
            threshold = self.roster.threshold,
            "verification round started"
        );
        let envelope = Message::VerifyRequest(verify).seal(instance, me, me);
        for (to, e) in self.transport.broadcast_to_children(envelope).await {
            debug!(target: "verifier", to, error = %e, "participant unreachable");
            quorum.fail(to);
        }

        loop {
            match quorum.progress() {
                Progress::Reached => return Ok(()),
                Progress::Lost => return Err(quorum.insufficient()),
                Progress::Pending => {}
            }
            let (from, message) = inbox.recv().await.ok_or(ProtocolError::Aborted)?;
            match message {
                Message::VerifyReply(VerifyReply { verified: true }) => {
                    quorum.accept(from);
                }
                Message::VerifyReply(_) => {
                    info!(target: "verifier", from, "participant rejected the request");
                    quorum.fail(from);
                }
                other => debug!(target: "verifier", from, kind = other.kind(), "ignoring reply"),
            }
        }
    }

    pub(crate) async fn on_verify_request(&self, envelope: &Envelope, verify: VerifyRequest) {
        let verified = match self.check_request(&verify.request, &verify.data) {
            Ok(()) => true,
            Err(e) => {
                info!(
                    target: "verifier",
                    root = envelope.root,
                    index = verify.request.index,
                    error = %e,
                    "rejecting execution request"
                );
                false
            }
        };
        self.reply(envelope, Message::VerifyReply(VerifyReply { verified }))
            .await;
    }
}

// Path: crates/threshold/src/messages.rs
//! Protocol messages. Every message travels SCALE-encoded as an
//! `Envelope::payload`; the envelope's instance id ties replies to the session
//! that asked.

use cohort_api::transport::{Envelope, InstanceId};
use cohort_crypto::dkg::DealShare;
use cohort_crypto::tdh::ProvedShare;
use cohort_types::codec::{from_bytes_canonical, to_bytes_canonical};
use cohort_types::error::CodecError;
use cohort_types::plan::{ExecutionRequest, VerificationData};
use cohort_types::signing::SigningRequest;
use cohort_types::tdh::DkgSessionId;
use parity_scale_codec::{Decode, Encode};

/// A participant's answer to a signing request: one partial signature per
/// named message, in request order, or `None` for a refusal.
#[derive(Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct SignReply {
    pub partials: Option<Vec<Vec<u8>>>,
}

/// Opens a DKG session: every receiver deals to the whole roster.
#[derive(Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct DkgStart {
    pub session: DkgSessionId,
    pub threshold: u32,
}

/// One dealer's share for one node, sent to that node directly.
#[derive(Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct DkgDeal {
    pub session: DkgSessionId,
    pub share: DealShare,
}

/// Tells the coordinator whether the sender dealt.
#[derive(Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct DkgDealt {
    pub dealt: bool,
}

/// The qualified dealers whose shares every node must combine.
#[derive(Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct DkgQualify {
    pub session: DkgSessionId,
    pub threshold: u32,
    pub dealers: Vec<u32>,
}

/// The group key the sender derived and persisted, or `None` if it failed.
#[derive(Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct DkgAck {
    pub public_key: Option<Vec<u8>>,
}

/// Asks for decryption shares of every `U` in `points`, blinded by `xc` in
/// recipient mode.
#[derive(Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct DecryptRequest {
    pub session: DkgSessionId,
    pub points: Vec<Vec<u8>>,
    pub xc: Option<Vec<u8>>,
}

/// One proved share per requested point, or `None` for a refusal.
#[derive(Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct DecryptShares {
    pub shares: Option<Vec<ProvedShare>>,
}

/// An execution request every member checks against the same evidence.
#[derive(Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct VerifyRequest {
    pub request: ExecutionRequest,
    pub data: VerificationData,
}

#[derive(Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct VerifyReply {
    pub verified: bool,
}

#[derive(Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub enum Message {
    SignRequest(SigningRequest),
    SignReply(SignReply),
    DkgStart(DkgStart),
    DkgDeal(DkgDeal),
    DkgDealt(DkgDealt),
    DkgQualify(DkgQualify),
    DkgAck(DkgAck),
    DecryptRequest(DecryptRequest),
    DecryptShares(DecryptShares),
    VerifyRequest(VerifyRequest),
    VerifyReply(VerifyReply),
}

impl Message {
    /// Replies belong to a running session on the receiving node; everything
    /// else is handled by the receiver as a participant.
    pub fn is_reply(&self) -> bool {
        matches!(
            self,
            Message::SignReply(_)
                | Message::DkgDealt(_)
                | Message::DkgAck(_)
                | Message::DecryptShares(_)
                | Message::VerifyReply(_)
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Message::SignRequest(_) => "sign_request",
            Message::SignReply(_) => "sign_reply",
            Message::DkgStart(_) => "dkg_start",
            Message::DkgDeal(_) => "dkg_deal",
            Message::DkgDealt(_) => "dkg_dealt",
            Message::DkgQualify(_) => "dkg_qualify",
            Message::DkgAck(_) => "dkg_ack",
            Message::DecryptRequest(_) => "decrypt_request",
            Message::DecryptShares(_) => "decrypt_shares",
            Message::VerifyRequest(_) => "verify_request",
            Message::VerifyReply(_) => "verify_reply",
        }
    }

    pub fn seal(&self, instance: InstanceId, root: u32, from: u32) -> Envelope {
        Envelope {
            instance,
            root,
            from,
            payload: to_bytes_canonical(self),
        }
    }

    pub fn open(envelope: &Envelope) -> Result<Self, CodecError> {
        from_bytes_canonical(&envelope.payload)
    }
}

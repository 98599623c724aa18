// Path: crates/types/src/error/mod.rs
//! Error types for every layer of the workspace.

use thiserror::Error;

/// A trait for assigning a stable, machine-readable string code to an error.
pub trait ErrorCode {
    /// Returns the unique, stable string identifier for this error variant.
    fn code(&self) -> &'static str;
}

/// A canonical decode failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("canonical decode failed: {0}")]
pub struct CodecError(pub String);

impl ErrorCode for CodecError {
    fn code(&self) -> &'static str {
        "CODEC_DECODE_FAILED"
    }
}

/// Errors from cryptographic primitives.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// A byte string had the wrong length for the expected encoding.
    #[error("Invalid length: expected {expected}, got {got}")]
    InvalidLength {
        /// The expected length in bytes.
        expected: usize,
        /// The actual length in bytes.
        got: usize,
    },
    /// Bytes did not decode to a valid curve point.
    #[error("Invalid point: {0}")]
    InvalidPoint(String),
    /// Bytes did not decode to a canonical scalar.
    #[error("Invalid scalar: {0}")]
    InvalidScalar(String),
    /// A signature or proof did not verify.
    #[error("Verification failed")]
    VerificationFailed,
    /// Fewer valid signers or shares than the threshold requires.
    #[error("Threshold not met: need {needed}, have {got}")]
    ThresholdNotMet {
        /// Required count.
        needed: usize,
        /// Available count.
        got: usize,
    },
    /// A message is too long to be embedded into a single curve point.
    #[error("Message of {got} bytes exceeds the embeddable maximum of {max}")]
    MessageTooLong {
        /// Maximum embeddable length.
        max: usize,
        /// Supplied length.
        got: usize,
    },
    /// A generic failure inside a primitive.
    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl ErrorCode for CryptoError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidLength { .. } => "CRYPTO_INVALID_LENGTH",
            Self::InvalidPoint(_) => "CRYPTO_INVALID_POINT",
            Self::InvalidScalar(_) => "CRYPTO_INVALID_SCALAR",
            Self::VerificationFailed => "CRYPTO_VERIFICATION_FAILED",
            Self::ThresholdNotMet { .. } => "CRYPTO_THRESHOLD_NOT_MET",
            Self::MessageTooLong { .. } => "CRYPTO_MESSAGE_TOO_LONG",
            Self::OperationFailed(_) => "CRYPTO_OPERATION_FAILED",
        }
    }
}

/// Errors raised while verifying a ledger state proof.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProofError {
    /// The inclusion path does not hash to the root it claims.
    #[error("Inclusion proof does not hash to its claimed root")]
    InclusionMismatch,
    /// The proof root differs from the root it must anchor to.
    #[error("Root mismatch: expected {expected}, got {got}")]
    RootMismatch {
        /// Hex of the trusted root.
        expected: String,
        /// Hex of the proof's root.
        got: String,
    },
    /// The proof carries no forward links at all.
    #[error("State proof has no forward links")]
    MissingForwardLinks,
    /// A forward link is structurally unusable.
    #[error("Malformed forward link: {0}")]
    MalformedForwardLink(String),
    /// The quorum signature on a forward link did not verify.
    #[error("Forward link {index} has an invalid signature")]
    LinkSignature {
        /// Position of the link in the chain.
        index: usize,
    },
    /// A forward link does not start where the previous one ended.
    #[error("Forward link {index} does not extend the chain")]
    BrokenChain {
        /// Position of the link in the chain.
        index: usize,
    },
    /// The last link does not point at the supplied latest block.
    #[error("Latest block hash does not match the last forward link target")]
    LatestBlockMismatch,
    /// A cryptographic operation during verification failed.
    #[error("Crypto error during proof verification: {0}")]
    Crypto(String),
}

impl ErrorCode for ProofError {
    fn code(&self) -> &'static str {
        match self {
            Self::InclusionMismatch => "PROOF_INCLUSION_MISMATCH",
            Self::RootMismatch { .. } => "PROOF_ROOT_MISMATCH",
            Self::MissingForwardLinks => "PROOF_MISSING_FORWARD_LINKS",
            Self::MalformedForwardLink(_) => "PROOF_MALFORMED_FORWARD_LINK",
            Self::LinkSignature { .. } => "PROOF_LINK_SIGNATURE",
            Self::BrokenChain { .. } => "PROOF_BROKEN_CHAIN",
            Self::LatestBlockMismatch => "PROOF_LATEST_BLOCK_MISMATCH",
            Self::Crypto(_) => "PROOF_CRYPTO_ERROR",
        }
    }
}

impl From<CryptoError> for ProofError {
    fn from(e: CryptoError) -> Self {
        ProofError::Crypto(e.to_string())
    }
}

/// Errors returned by the dependency verifier. Every variant that concerns a
/// single declared input names it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    /// The request does not address the opcode it claims to.
    #[error("Identity mismatch on {field}: expected {expected}, got {got}")]
    IdentityMismatch {
        /// Which field disagreed (`unit`, `opcode`, `index`, `src_name`, ...).
        field: &'static str,
        /// The value the plan declares.
        expected: String,
        /// The value that was supplied.
        got: String,
    },
    /// A threshold signature did not satisfy its policy.
    #[error("Invalid signature on {subject}: {reason}")]
    SignatureInvalid {
        /// `execution plan` or the name of the input whose attestation failed.
        subject: String,
        /// Underlying failure.
        reason: String,
    },
    /// A ledger proof for an input failed.
    #[error("Invalid proof for input {input}: {source}")]
    ProofInvalid {
        /// The input name.
        input: String,
        /// The underlying proof failure.
        #[source]
        source: ProofError,
    },
    /// A declared input has no receipt, proof, digest or precommit.
    #[error("Missing dependency for input {input}: {detail}")]
    MissingDependency {
        /// The input name.
        input: String,
        /// What was missing.
        detail: String,
    },
    /// A digest does not match the value it must commit to.
    #[error("Hash mismatch for input {input}")]
    HashMismatch {
        /// The input name.
        input: String,
    },
    /// The request is structurally unusable.
    #[error("Malformed request: {0}")]
    MalformedRequest(String),
    /// The node's view of the contract does not accept the plan's state root.
    #[error("State {root} of contract {cid} not accepted")]
    StateNotAccepted {
        /// Hex contract id.
        cid: String,
        /// Hex state root the plan was built on.
        root: String,
    },
}

impl VerificationError {
    /// The input the error concerns, if any.
    pub fn input(&self) -> Option<&str> {
        match self {
            Self::ProofInvalid { input, .. }
            | Self::MissingDependency { input, .. }
            | Self::HashMismatch { input } => Some(input),
            Self::SignatureInvalid { subject, .. } => Some(subject),
            Self::IdentityMismatch { .. }
            | Self::MalformedRequest(_)
            | Self::StateNotAccepted { .. } => None,
        }
    }
}

impl ErrorCode for VerificationError {
    fn code(&self) -> &'static str {
        match self {
            Self::IdentityMismatch { .. } => "VERIFY_IDENTITY_MISMATCH",
            Self::SignatureInvalid { .. } => "VERIFY_SIGNATURE_INVALID",
            Self::ProofInvalid { .. } => "VERIFY_PROOF_INVALID",
            Self::MissingDependency { .. } => "VERIFY_MISSING_DEPENDENCY",
            Self::HashMismatch { .. } => "VERIFY_HASH_MISMATCH",
            Self::MalformedRequest(_) => "VERIFY_MALFORMED_REQUEST",
            Self::StateNotAccepted { .. } => "VERIFY_STATE_NOT_ACCEPTED",
        }
    }
}

/// Errors from the persistent session store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The database backend failed.
    #[error("Storage backend error: {0}")]
    Backend(String),
    /// A persisted record could not be decoded.
    #[error("Stored record is corrupt: {0}")]
    Decode(String),
    /// The requested key is not present.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl ErrorCode for StorageError {
    fn code(&self) -> &'static str {
        match self {
            Self::Backend(_) => "STORAGE_BACKEND_ERROR",
            Self::Decode(_) => "STORAGE_DECODE_ERROR",
            Self::NotFound(_) => "STORAGE_NOT_FOUND",
        }
    }
}

/// Errors from the tree transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// No node exists at the given roster index.
    #[error("Unknown peer index {0}")]
    UnknownPeer(u32),
    /// The peer's inbox is closed or the peer is unreachable.
    #[error("Peer {0} is unreachable")]
    Unreachable(u32),
    /// This node is not part of a tree rooted where the message claims.
    #[error("No parent for node {0}")]
    NoParent(u32),
}

impl ErrorCode for TransportError {
    fn code(&self) -> &'static str {
        match self {
            Self::UnknownPeer(_) => "TRANSPORT_UNKNOWN_PEER",
            Self::Unreachable(_) => "TRANSPORT_UNREACHABLE",
            Self::NoParent(_) => "TRANSPORT_NO_PARENT",
        }
    }
}

/// Errors from a protocol round (signing, DKG setup, decryption).
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The session deadline fired before it could complete.
    #[error("Protocol timed out")]
    ProtocolTimeout,
    /// Too many participants failed or refused.
    #[error("Insufficient quorum: {accepted} accepted, {failures} failed, threshold {threshold}")]
    InsufficientQuorum {
        /// Accepted participants, coordinator included.
        accepted: usize,
        /// Failed or refusing participants.
        failures: usize,
        /// Required threshold.
        threshold: usize,
    },
    /// No DKG session with this id exists on the node.
    #[error("Unknown DKG session {0}")]
    UnknownSession(String),
    /// A DKG session with this id has already been set up.
    #[error("DKG session {0} already exists")]
    SessionExists(String),
    /// A decryption share or DKG deal failed its proof.
    #[error("Malformed share: {0}")]
    MalformedShare(String),
    /// The caller supplied unusable input.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    /// The completion signal was dropped without a value.
    #[error("Protocol session aborted")]
    Aborted,
    /// A cryptographic primitive failed.
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),
    /// The session store failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    /// The transport failed.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
    /// A message did not decode.
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
    /// The coordinator's own check of an execution request failed.
    #[error("Verification failed: {0}")]
    Verification(#[from] VerificationError),
}

impl ErrorCode for ProtocolError {
    fn code(&self) -> &'static str {
        match self {
            Self::ProtocolTimeout => "PROTOCOL_TIMEOUT",
            Self::InsufficientQuorum { .. } => "PROTOCOL_INSUFFICIENT_QUORUM",
            Self::UnknownSession(_) => "PROTOCOL_UNKNOWN_SESSION",
            Self::SessionExists(_) => "PROTOCOL_SESSION_EXISTS",
            Self::MalformedShare(_) => "PROTOCOL_MALFORMED_SHARE",
            Self::InvalidRequest(_) => "PROTOCOL_INVALID_REQUEST",
            Self::Aborted => "PROTOCOL_ABORTED",
            Self::Crypto(_) => "PROTOCOL_CRYPTO_ERROR",
            Self::Storage(_) => "PROTOCOL_STORAGE_ERROR",
            Self::Transport(_) => "PROTOCOL_TRANSPORT_ERROR",
            Self::Codec(_) => "PROTOCOL_CODEC_ERROR",
            Self::Verification(_) => "PROTOCOL_VERIFICATION_FAILED",
        }
    }
}

/// Errors from loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// The TOML did not parse into the config schema.
    #[error("Failed to parse config: {0}")]
    Parse(String),
    /// A value is out of range.
    #[error("Invalid config: {0}")]
    Invalid(String),
}

impl ErrorCode for ConfigError {
    fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "CONFIG_IO",
            Self::Parse(_) => "CONFIG_PARSE",
            Self::Invalid(_) => "CONFIG_INVALID",
        }
    }
}

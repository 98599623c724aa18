// Path: crates/types/src/digest.rs
//! Canonical digests.
//!
//! Every participant must derive the same bytes for the same logical content,
//! so maps are walked in sorted key order and integers are fed as fixed-width
//! little-endian. All map-typed fields are `BTreeMap`, which iterates sorted.

use crate::error::CryptoError;
use crate::ledger::{Block, ForwardLink, ReadState};
use crate::plan::{ExecutionPlan, OpcodeReceipt};
use crate::{Digest, DIGEST_LEN};
use dcrypt::algorithms::hash::{HashFunction, Sha256 as DcryptSha256};
use dcrypt::algorithms::ByteSerializable;
use parity_scale_codec::Encode;

/// SHA-256 of `data`.
pub fn sha256<T: AsRef<[u8]>>(data: T) -> Result<Digest, CryptoError> {
    let digest = DcryptSha256::digest(data.as_ref())
        .map_err(|e| CryptoError::OperationFailed(format!("sha256 failed: {e}")))?
        .to_bytes();
    let len = digest.len();
    digest.try_into().map_err(|_| CryptoError::InvalidLength {
        expected: DIGEST_LEN,
        got: len,
    })
}

/// A running hash: bytes are appended and digested once on `finish`.
#[derive(Default)]
pub struct CanonicalHasher {
    buf: Vec<u8>,
}

impl CanonicalHasher {
    /// Creates an empty hasher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends raw bytes.
    pub fn write(&mut self, data: impl AsRef<[u8]>) -> &mut Self {
        self.buf.extend_from_slice(data.as_ref());
        self
    }

    /// Appends an integer as 8 little-endian bytes.
    pub fn write_u64(&mut self, v: u64) -> &mut Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    /// Digests everything written so far.
    pub fn finish(&self) -> Result<Digest, CryptoError> {
        sha256(&self.buf)
    }
}

impl ExecutionPlan {
    /// The plan id every signature and receipt refers to.
    ///
    /// Order: cid, state root, code hash, workflow name, txn name; then for
    /// each opcode its name, unit id and dependencies by sorted input name
    /// (name, source tag, source name, u64 index, value bytes); then each unit
    /// by sorted id (id, u64 threshold, every public key in roster order).
    pub fn hash(&self) -> Result<Digest, CryptoError> {
        let mut h = CanonicalHasher::new();
        h.write(&self.cid)
            .write(&self.state_root)
            .write(&self.code_hash)
            .write(self.workflow_name.as_bytes())
            .write(self.txn_name.as_bytes());

        for opcode in &self.txn.opcodes {
            h.write(opcode.name.as_bytes()).write(opcode.unit_id.as_bytes());
            for (input, dep) in &opcode.dependencies {
                h.write(input.as_bytes())
                    .write(dep.src_tag().as_bytes())
                    .write(dep.src_name().as_bytes())
                    .write_u64(u64::from(dep.src_index()))
                    .write(dep.value_bytes());
            }
        }

        for (unit_id, identity) in &self.unit_data {
            h.write(unit_id.as_bytes())
                .write_u64(u64::from(identity.threshold));
            for key in &identity.public_keys {
                h.write(key);
            }
        }
        h.finish()
    }
}

impl OpcodeReceipt {
    /// `H(plan_id || u64 op_index || name || digest)`; the value quorum-signed.
    pub fn hash(&self) -> Result<Digest, CryptoError> {
        CanonicalHasher::new()
            .write(self.plan_id)
            .write_u64(u64::from(self.op_index))
            .write(self.name.as_bytes())
            .write(&self.digest)
            .finish()
    }
}

impl ReadState {
    /// `H(root || key || value ...)` over keys in sorted order.
    pub fn hash(&self) -> Result<Digest, CryptoError> {
        let mut entries: Vec<_> = self.data.iter().collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        let mut h = CanonicalHasher::new();
        h.write(&self.root);
        for kv in entries {
            h.write(kv.key.as_bytes()).write(&kv.value);
        }
        h.finish()
    }
}

impl Block {
    /// The block id: SHA-256 of the SCALE-encoded header.
    pub fn hash(&self) -> Result<Digest, CryptoError> {
        sha256(self.encode())
    }
}

impl ForwardLink {
    /// The bytes the source roster signs: `H(from || to || roster?)`.
    pub fn message(&self) -> Result<Digest, CryptoError> {
        let mut h = CanonicalHasher::new();
        h.write(self.from).write(self.to);
        match &self.new_roster {
            Some(roster) => h.write([1u8]).write(roster.encode()),
            None => h.write([0u8]),
        };
        h.finish()
    }
}

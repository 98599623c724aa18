// Path: crates/crypto/src/sign/bls/mod.rs
//! BLS12-381 signature algorithm implementation using dcrypt.
//!
//! Minimal-signature-size BLS:
//! - Signatures in G1
//! - Public Keys in G2
//! - Messages hashed to G1 via hash-to-curve (SSWU)
//!
//! Signatures over the same message add up: the sum of `k` partial
//! signatures verifies against the sum of the `k` public keys.

use crate::error::CryptoError;
use cohort_api::crypto::{
    AggregateSignature, SerializableKey, Signature, SigningKey, SigningKeyPair, VerifyingKey,
};
use dcrypt::algorithms::ec::bls12_381::{
    pairing, Bls12_381Scalar as Scalar, G1Affine, G1Projective, G2Affine, G2Projective,
};
use rand::rngs::OsRng;
use rand::RngCore;

// Domain Separation Tag for Hashing
pub(crate) const BLS_DST: &[u8] = b"BLS_SIG_BLS12381G1_XMD:SHA-256_SSWU_RO_NUL_";
const KEYGEN_DST: &[u8] = b"COHORT-BLS-KEYGEN";

/// Length of a compressed G2 public key.
pub const PUBLIC_KEY_LEN: usize = 96;
/// Length of a compressed G1 signature.
pub const SIGNATURE_LEN: usize = 48;

#[derive(Clone)]
pub struct BlsKeyPair {
    public_key: BlsPublicKey,
    secret_key: BlsPrivateKey,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlsPublicKey(pub G2Affine);

#[derive(Clone)]
pub struct BlsPrivateKey(pub Scalar);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlsSignature(pub G1Affine);

impl BlsKeyPair {
    /// A fresh key pair from OS randomness.
    pub fn generate() -> Result<Self, CryptoError> {
        let mut seed = [0u8; 32];
        OsRng.fill_bytes(&mut seed);
        Self::from_seed(&seed)
    }

    /// A deterministic key pair: the secret is the seed hashed to the field.
    pub fn from_seed(seed: &[u8]) -> Result<Self, CryptoError> {
        let secret = Scalar::hash_to_field(seed, KEYGEN_DST)
            .map_err(|e| CryptoError::OperationFailed(format!("Keygen failed: {:?}", e)))?;
        Ok(Self::from_private_key(&BlsPrivateKey(secret)))
    }

    /// Rebuilds the pair from a loaded private key.
    pub fn from_private_key(private_key: &BlsPrivateKey) -> Self {
        let public = G2Affine::from(G2Projective::generator() * private_key.0);
        Self {
            public_key: BlsPublicKey(public),
            secret_key: private_key.clone(),
        }
    }
}

impl SigningKeyPair for BlsKeyPair {
    type PublicKey = BlsPublicKey;
    type PrivateKey = BlsPrivateKey;
    type Signature = BlsSignature;

    fn public_key(&self) -> Self::PublicKey {
        self.public_key.clone()
    }

    fn private_key(&self) -> Self::PrivateKey {
        self.secret_key.clone()
    }

    fn sign(&self, message: &[u8]) -> Result<Self::Signature, CryptoError> {
        self.secret_key.sign(message)
    }
}

/// `H(m)` on G1. The discrete log of `H(m)` must stay unknown, otherwise a
/// signature on one message can be rescaled into a signature on another.
fn message_point(message: &[u8]) -> Result<G1Affine, CryptoError> {
    let point = G1Projective::hash_to_curve(message, BLS_DST)
        .map_err(|e| CryptoError::OperationFailed(format!("Hash to curve failed: {:?}", e)))?;
    Ok(G1Affine::from(point))
}

impl BlsPublicKey {
    /// Sums public keys; `None` for an empty input.
    pub fn sum<'a>(keys: impl IntoIterator<Item = &'a BlsPublicKey>) -> Option<BlsPublicKey> {
        keys.into_iter()
            .map(|k| G2Projective::from(k.0))
            .reduce(|acc, k| acc + k)
            .map(|p| BlsPublicKey(G2Affine::from(p)))
    }
}

impl VerifyingKey for BlsPublicKey {
    type Signature = BlsSignature;

    fn verify(&self, message: &[u8], signature: &Self::Signature) -> Result<(), CryptoError> {
        let msg_point = message_point(message)?;

        // e(sig, g2) == e(H(m), pk)
        let lhs = pairing(&signature.0, &G2Affine::generator());
        let rhs = pairing(&msg_point, &self.0);

        if lhs == rhs {
            Ok(())
        } else {
            Err(CryptoError::VerificationFailed)
        }
    }
}

fn fixed<const N: usize>(bytes: &[u8]) -> Result<[u8; N], CryptoError> {
    bytes.try_into().map_err(|_| CryptoError::InvalidLength {
        expected: N,
        got: bytes.len(),
    })
}

impl SerializableKey for BlsPublicKey {
    fn to_bytes(&self) -> Vec<u8> {
        self.0.to_compressed().as_ref().to_vec()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; PUBLIC_KEY_LEN] = fixed(bytes)?;
        let point = G2Affine::from_compressed(&arr)
            .into_option()
            .ok_or_else(|| CryptoError::InvalidPoint("Invalid G2 point".into()))?;
        Ok(Self(point))
    }
}

impl SigningKey for BlsPrivateKey {
    type Signature = BlsSignature;

    fn sign(&self, message: &[u8]) -> Result<Self::Signature, CryptoError> {
        // Sig = sk * H(m)
        let msg_point = message_point(message)?;
        let sig_proj = G1Projective::from(msg_point) * self.0;
        Ok(BlsSignature(G1Affine::from(sig_proj)))
    }
}

impl SerializableKey for BlsPrivateKey {
    fn to_bytes(&self) -> Vec<u8> {
        self.0.to_bytes().to_vec()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; 32] = fixed(bytes)?;
        let scalar = Scalar::from_bytes(&arr)
            .into_option()
            .ok_or_else(|| CryptoError::InvalidScalar("Invalid BLS scalar".into()))?;
        Ok(Self(scalar))
    }
}

impl SerializableKey for BlsSignature {
    fn to_bytes(&self) -> Vec<u8> {
        self.0.to_compressed().as_ref().to_vec()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; SIGNATURE_LEN] = fixed(bytes)?;
        let point = G1Affine::from_compressed(&arr)
            .map_err(|_| CryptoError::InvalidPoint("Invalid G1 point".into()))?;
        Ok(Self(point))
    }
}

impl Signature for BlsSignature {}

impl AggregateSignature for BlsSignature {
    fn aggregate(&mut self, other: &Self) {
        let sum = G1Projective::from(self.0) + G1Projective::from(other.0);
        self.0 = G1Affine::from(sum);
    }
}

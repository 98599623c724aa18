// Path: crates/crypto/src/sign/threshold.rs
//! Threshold attestations: an aggregate BLS signature followed by the
//! participation mask, `sig || mask`.
//!
//! Verification uses a "at least `threshold` of this exact key list" policy.
//! The key list order must match the one the signers used.

use super::bls::{BlsPublicKey, BlsSignature, SIGNATURE_LEN};
use super::mask::{mask_len, ParticipationMask};
use crate::error::CryptoError;
use cohort_api::crypto::{AggregateSignature, SerializableKey, VerifyingKey};

/// A decoded `sig || mask` artifact.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ThresholdSignature {
    pub signature: BlsSignature,
    pub mask: ParticipationMask,
}

impl ThresholdSignature {
    /// Splits and decodes an artifact produced for a key set of size `n`.
    pub fn from_bytes(bytes: &[u8], n: usize) -> Result<Self, CryptoError> {
        let expected = SIGNATURE_LEN + mask_len(n);
        if bytes.len() != expected {
            return Err(CryptoError::InvalidLength {
                expected,
                got: bytes.len(),
            });
        }
        let (sig, mask) = bytes.split_at(SIGNATURE_LEN);
        Ok(Self {
            signature: BlsSignature::from_bytes(sig)?,
            mask: ParticipationMask::from_bytes(mask, n)?,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = self.signature.to_bytes();
        out.extend_from_slice(self.mask.as_bytes());
        out
    }

    /// Checks the policy and the pairing equation against `public_keys`.
    pub fn verify(
        &self,
        message: &[u8],
        public_keys: &[BlsPublicKey],
        threshold: usize,
    ) -> Result<(), CryptoError> {
        if self.mask.len() != public_keys.len() {
            return Err(CryptoError::InvalidLength {
                expected: public_keys.len(),
                got: self.mask.len(),
            });
        }
        let signers = self.mask.count();
        if signers < threshold {
            return Err(CryptoError::ThresholdNotMet {
                needed: threshold,
                got: signers,
            });
        }
        let participating = self.mask.indices().filter_map(|i| public_keys.get(i));
        let aggregate_key = BlsPublicKey::sum(participating).ok_or(
            CryptoError::ThresholdNotMet {
                needed: threshold.max(1),
                got: 0,
            },
        )?;
        aggregate_key.verify(message, &self.signature)
    }
}

/// Decodes a list of compressed public keys.
pub fn decode_public_keys(keys: &[Vec<u8>]) -> Result<Vec<BlsPublicKey>, CryptoError> {
    keys.iter().map(|k| BlsPublicKey::from_bytes(k)).collect()
}

/// Verifies a `sig || mask` artifact over `message` against at least
/// `threshold` of `public_keys`.
pub fn verify_threshold(
    message: &[u8],
    artifact: &[u8],
    public_keys: &[Vec<u8>],
    threshold: usize,
) -> Result<(), CryptoError> {
    let keys = decode_public_keys(public_keys)?;
    ThresholdSignature::from_bytes(artifact, keys.len())?.verify(message, &keys, threshold)
}

/// Sums partial signatures by signer index into an artifact over `n` keys.
pub fn aggregate_partials(
    n: usize,
    partials: impl IntoIterator<Item = (usize, BlsSignature)>,
) -> Result<ThresholdSignature, CryptoError> {
    let mut mask = ParticipationMask::new(n);
    let mut aggregate: Option<BlsSignature> = None;
    for (index, partial) in partials {
        if mask.is_set(index) {
            continue;
        }
        mask.set(index)?;
        match aggregate.as_mut() {
            Some(acc) => acc.aggregate(&partial),
            None => aggregate = Some(partial),
        }
    }
    let signature = aggregate.ok_or(CryptoError::ThresholdNotMet { needed: 1, got: 0 })?;
    Ok(ThresholdSignature { signature, mask })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sign::bls::BlsKeyPair;
    use cohort_api::crypto::SigningKeyPair;

    fn roster(n: u8) -> Vec<BlsKeyPair> {
        (0..n)
            .map(|i| BlsKeyPair::from_seed(&[i, 0xab]).unwrap())
            .collect()
    }

    fn keys(pairs: &[BlsKeyPair]) -> Vec<Vec<u8>> {
        pairs.iter().map(|p| p.public_key().to_bytes()).collect()
    }

    fn sign_by(pairs: &[BlsKeyPair], who: &[usize], msg: &[u8]) -> Vec<u8> {
        let partials = who.iter().map(|i| (*i, pairs[*i].sign(msg).unwrap()));
        aggregate_partials(pairs.len(), partials).unwrap().to_bytes()
    }

    #[test]
    fn test_threshold_met() {
        let pairs = roster(4);
        let artifact = sign_by(&pairs, &[0, 2, 3], b"plan");
        assert!(verify_threshold(b"plan", &artifact, &keys(&pairs), 3).is_ok());
    }

    #[test]
    fn test_threshold_not_met() {
        let pairs = roster(4);
        let artifact = sign_by(&pairs, &[1, 3], b"plan");
        assert!(matches!(
            verify_threshold(b"plan", &artifact, &keys(&pairs), 3),
            Err(CryptoError::ThresholdNotMet { needed: 3, got: 2 })
        ));
    }

    #[test]
    fn test_mask_lying_about_signers_fails() {
        let pairs = roster(4);
        let mut artifact = sign_by(&pairs, &[0, 1, 2], b"plan");
        // Claim signer 3 instead of signer 2.
        let last = artifact.len() - 1;
        artifact[last] = 0b0000_1011;
        assert!(matches!(
            verify_threshold(b"plan", &artifact, &keys(&pairs), 3),
            Err(CryptoError::VerificationFailed)
        ));
    }

    #[test]
    fn test_unrelated_key_set_fails() {
        let pairs = roster(4);
        let other: Vec<_> = (10..14u8)
            .map(|i| BlsKeyPair::from_seed(&[i]).unwrap())
            .collect();
        let artifact = sign_by(&pairs, &[0, 1, 2, 3], b"receipt");
        assert!(verify_threshold(b"receipt", &artifact, &keys(&other), 3).is_err());
    }

    #[test]
    fn test_rescaled_signature_does_not_carry_to_another_message() {
        use super::super::bls::BLS_DST;
        use dcrypt::algorithms::ec::bls12_381::{
            Bls12_381Scalar as Scalar, G1Affine, G1Projective,
        };

        let pairs = roster(4);
        let keys = keys(&pairs);
        let artifact = sign_by(&pairs, &[0, 1, 2], b"plan A");
        let sig = ThresholdSignature::from_bytes(&artifact, 4).unwrap();

        // k = h(B) / h(A) turned a signature on A into one on B when
        // messages were mapped to h(m)·G1.
        let h_a = Scalar::hash_to_field(b"plan A", BLS_DST).unwrap();
        let h_b = Scalar::hash_to_field(b"plan B", BLS_DST).unwrap();
        let k = h_b * h_a.invert().into_option().unwrap();
        let rescaled = ThresholdSignature {
            signature: BlsSignature(G1Affine::from(G1Projective::from(sig.signature.0) * k)),
            mask: sig.mask.clone(),
        };

        assert!(verify_threshold(b"plan A", &artifact, &keys, 3).is_ok());
        assert!(matches!(
            verify_threshold(b"plan B", &rescaled.to_bytes(), &keys, 3),
            Err(CryptoError::VerificationFailed)
        ));
        assert!(verify_threshold(b"plan A", &rescaled.to_bytes(), &keys, 3).is_err());
    }

    #[test]
    fn test_duplicate_partials_counted_once() {
        let pairs = roster(3);
        let sig = pairs[0].sign(b"m").unwrap();
        let agg = aggregate_partials(3, vec![(0, sig.clone()), (0, sig)]).unwrap();
        assert_eq!(agg.mask.count(), 1);
        assert!(agg
            .verify(b"m", &decode_public_keys(&keys(&pairs)).unwrap(), 1)
            .is_ok());
    }
}
